//! Cached Nominatim client, the crate's main entry point.

use std::sync::Arc;

use crate::cache::{CacheLayer, CacheStore, MemoryStore, NoopStore, SqliteStore};
use crate::client::NominatimClient;
use crate::config::{Config, StoreKind};
use crate::error::GeocodeError;
use crate::format::{format_location, FormattedAddress};
use crate::keys::QueryKey;
use crate::types::{Coordinates, HealthStatus, Place};

/// Nominatim client with transparent read-through caching.
///
/// Wraps [`NominatimClient`] with the same API. The three geocoding
/// operations are cached under the [`QueryKey`] templates; the health
/// check never touches the cache.
#[derive(Clone)]
pub struct CachedNominatimClient {
  inner: NominatimClient,
  cache: CacheLayer,
}

impl CachedNominatimClient {
  /// Build the client with the cache store selected in the config.
  pub fn new(config: &Config) -> Result<Self, GeocodeError> {
    let store: Arc<dyn CacheStore> = match config.cache.store {
      StoreKind::Memory => Arc::new(MemoryStore::new()),
      StoreKind::Sqlite => Arc::new(SqliteStore::open(&config.cache.namespace)?),
      StoreKind::None => Arc::new(NoopStore),
    };

    Self::with_store(config, store)
  }

  /// Build the client around an injected cache store.
  pub fn with_store(config: &Config, store: Arc<dyn CacheStore>) -> Result<Self, GeocodeError> {
    let inner = NominatimClient::new(config)?;
    let cache = CacheLayer::new(store, &config.cache);

    Ok(Self { inner, cache })
  }

  /// Free-text search, most relevant result first (upstream ordering).
  pub async fn search(&self, query: &str) -> Result<Vec<Place>, GeocodeError> {
    let key = QueryKey::Search {
      query: query.to_string(),
    };

    let inner = self.inner.clone();
    let query = query.to_string();
    self
      .cache
      .cached(&key.cache_key(), None, move || async move {
        inner.search(&query).await
      })
      .await
  }

  /// Reverse geocode a coordinate pair to the place at that point.
  pub async fn reverse(&self, coordinates: &Coordinates) -> Result<Place, GeocodeError> {
    let key = QueryKey::Reverse {
      lat: coordinates.lat,
      lon: coordinates.lon,
    };

    let inner = self.inner.clone();
    let coordinates = *coordinates;
    self
      .cache
      .cached(&key.cache_key(), None, move || async move {
        inner.reverse(&coordinates).await
      })
      .await
  }

  /// Look up specific OSM objects by prefixed id (`N…`, `W…`, `R…`).
  ///
  /// An empty id list is rejected before the cache or the network is
  /// touched.
  pub async fn lookup(&self, osm_ids: &[String]) -> Result<Vec<Place>, GeocodeError> {
    if osm_ids.is_empty() {
      return Err(GeocodeError::InvalidInput(
        "osm_ids must not be empty".to_string(),
      ));
    }

    let key = QueryKey::Lookup {
      osm_ids: osm_ids.to_vec(),
    };

    let inner = self.inner.clone();
    let osm_ids = osm_ids.to_vec();
    self
      .cache
      .cached(&key.cache_key(), None, move || async move {
        inner.lookup(&osm_ids).await
      })
      .await
  }

  /// Upstream service status. Never cached.
  pub async fn health_check(&self) -> Result<HealthStatus, GeocodeError> {
    self.inner.health_check().await
  }

  /// Flatten a place's address block into fixed fields. Pure; no I/O.
  pub fn format_location(&self, place: &Place) -> FormattedAddress {
    format_location(place)
  }
}
