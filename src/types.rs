//! Typed mirrors of the Nominatim API responses.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The three OpenStreetMap primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsmType {
  Node,
  Way,
  Relation,
}

/// A coordinate pair for reverse geocoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
  pub lat: f64,
  pub lon: f64,
}

/// One geocoding result.
///
/// `lat`/`lon` and the bounding box stay strings to preserve the decimal
/// precision upstream sends. The address, extratags and namedetails blocks
/// are open maps: their key sets are known but not exhaustive, and any
/// additional upstream component must survive deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
  pub place_id: u64,
  #[serde(default)]
  pub licence: String,
  pub osm_type: OsmType,
  pub osm_id: u64,
  pub lat: String,
  pub lon: String,
  pub class: String,
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default)]
  pub place_rank: Option<u32>,
  #[serde(default)]
  pub importance: Option<f64>,
  #[serde(default)]
  pub addresstype: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
  pub display_name: String,
  /// South, north, west, east latitude/longitude bounds as decimal strings.
  #[serde(default)]
  pub boundingbox: Vec<String>,
  /// Address components, present when `addressdetails=1` was requested.
  #[serde(default)]
  pub address: Option<HashMap<String, String>>,
  /// Free-form object tags, present when `extratags=1` was requested.
  #[serde(default)]
  pub extratags: Option<HashMap<String, String>>,
  /// Multilingual name variants, present when `namedetails=1` was requested.
  #[serde(default)]
  pub namedetails: Option<HashMap<String, String>>,
}

/// Upstream `/status` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
  pub status: HealthState,
  pub message: String,
  #[serde(default)]
  pub data_updated: Option<String>,
  #[serde(default)]
  pub software_version: Option<String>,
  #[serde(default)]
  pub database_version: Option<String>,
}

/// The status field comes back as a numeric code (0 = OK) or a plain
/// string, depending on the server version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HealthState {
  Code(i64),
  Text(String),
}

impl HealthState {
  /// True when upstream reports itself healthy.
  pub fn is_ok(&self) -> bool {
    match self {
      Self::Code(code) => *code == 0,
      Self::Text(text) => text.eq_ignore_ascii_case("ok"),
    }
  }
}
