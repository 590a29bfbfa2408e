//! Cache key construction for the geocoding operations.

/// Cache keys for the cached geocoding operations.
///
/// The rendered templates are the contract the cache store sees:
/// `search:<query>`, `reverse:<lat>:<lon>`, `lookup:<id1,id2,...>`.
/// The health check is never cached and has no key.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryKey {
  /// Free-text search
  Search { query: String },
  /// Reverse geocoding of a coordinate pair
  Reverse { lat: f64, lon: f64 },
  /// Lookup of specific OSM objects
  Lookup { osm_ids: Vec<String> },
}

impl QueryKey {
  /// Render the key exactly as the store sees it.
  pub fn cache_key(&self) -> String {
    match self {
      Self::Search { query } => format!("search:{}", query),
      Self::Reverse { lat, lon } => format!("reverse:{}:{}", lat, lon),
      Self::Lookup { osm_ids } => format!("lookup:{}", osm_ids.join(",")),
    }
  }
}
