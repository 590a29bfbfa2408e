//! Error types surfaced by the geocoding client.

use thiserror::Error;

use crate::cache::StoreError;

/// Errors surfaced by the geocoding client.
#[derive(Debug, Error)]
pub enum GeocodeError {
  /// The upstream request failed: network error, timeout, non-2xx status,
  /// or an undecodable body. Diagnostics go to the log; the transport
  /// error type is not exposed to callers.
  #[error("upstream geocoding request failed")]
  Upstream,

  /// Input rejected before any network or cache call.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// The cache store failed on the awaited path.
  #[error("cache store error: {0}")]
  Cache(#[from] StoreError),

  /// Bad base URL, unreadable config file, or store construction failure.
  #[error("invalid configuration: {0}")]
  Config(String),
}
