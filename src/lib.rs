//! Cached client for the [Nominatim](https://nominatim.openstreetmap.org)
//! geocoding API.
//!
//! Wraps the public search, reverse-geocoding, lookup and status endpoints
//! behind a typed async client, with a read-through TTL cache in front of
//! the geocoding operations and a formatter that flattens a result's
//! address block into fixed fields.
//!
//! # Architecture
//!
//! [`NominatimClient`] is the raw request executor: one GET per operation,
//! every transport failure collapsed to [`GeocodeError::Upstream`].
//! [`CachedNominatimClient`] wraps it with the same API and a
//! [`cache::CacheLayer`] in front; the store behind the layer is an
//! injected [`cache::CacheStore`], so callers pick a backend in
//! [`Config`] and tests substitute a fake.
//!
//! # Example
//!
//! ```rust,ignore
//! use nominatim_client::{CachedNominatimClient, Config, Coordinates};
//!
//! let config = Config::load(None)?;
//! let client = CachedNominatimClient::new(&config)?;
//!
//! let places = client.search("Place de la Bastille, Paris").await?;
//! let place = client.reverse(&Coordinates { lat: 48.8530, lon: 2.3692 }).await?;
//! let address = client.format_location(&place);
//! ```

pub mod cache;
mod cached_client;
mod client;
mod config;
mod error;
mod format;
mod keys;
mod types;

pub use cached_client::CachedNominatimClient;
pub use client::NominatimClient;
pub use config::{CacheConfig, Config, StoreKind, DEFAULT_BASE_URL};
pub use error::GeocodeError;
pub use format::{format_location, FormattedAddress};
pub use keys::QueryKey;
pub use types::{Coordinates, HealthState, HealthStatus, OsmType, Place};
