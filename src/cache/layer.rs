//! Read-through cache layer that fronts the network fetch.

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::store::{CacheStore, Hit};
use crate::config::CacheConfig;
use crate::error::GeocodeError;

/// Read-through wrapper around a [`CacheStore`].
///
/// Looks a key up in the store and only invokes the fetcher on a miss.
/// Freshness is the store's job: entries expire there, never here, so a
/// hit is returned without re-validation. Concurrent misses on one key are
/// not deduplicated; each call fetches and the last write wins.
#[derive(Clone)]
pub struct CacheLayer {
  store: Arc<dyn CacheStore>,
  default_ttl: Duration,
  refresh_threshold: Duration,
  non_blocking: bool,
}

impl CacheLayer {
  /// Create a layer over `store`, taking TTL and write behavior from the
  /// cache configuration.
  pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
    Self {
      store,
      default_ttl: config.ttl(),
      refresh_threshold: config.refresh_threshold(),
      non_blocking: config.non_blocking,
    }
  }

  /// Return the cached value under `key`, or fetch, store and return it.
  ///
  /// `ttl` overrides the configured default for this entry. A hit close
  /// to expiry (within the refresh threshold) is returned immediately and
  /// refreshed in the background; a corrupt cached body counts as a miss
  /// and is overwritten.
  pub async fn cached<T, F, Fut>(
    &self,
    key: &str,
    ttl: Option<Duration>,
    fetcher: F,
  ) -> Result<T, GeocodeError>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, GeocodeError>> + Send + 'static,
  {
    let ttl = ttl.unwrap_or(self.default_ttl);

    if let Some(hit) = self.store.get(key).await? {
      match serde_json::from_str::<T>(&hit.value) {
        Ok(value) => {
          debug!(key, "cache hit");
          if self.expiring_soon(&hit) {
            self.spawn_refresh(key.to_string(), ttl, fetcher);
          }
          return Ok(value);
        }
        Err(e) => {
          warn!(key, error = %e, "discarding corrupt cache entry");
        }
      }
    }

    debug!(key, "cache miss");
    let value = fetcher().await?;

    match serde_json::to_string(&value) {
      Ok(body) => self.write(key.to_string(), body, ttl).await?,
      Err(e) => warn!(key, error = %e, "failed to encode value for cache"),
    }

    Ok(value)
  }

  /// True when the hit's remaining lifetime is inside the refresh window.
  fn expiring_soon(&self, hit: &Hit) -> bool {
    let threshold = chrono::Duration::milliseconds(self.refresh_threshold.as_millis() as i64);
    match hit.expires_at {
      Some(expires_at) => expires_at - Utc::now() < threshold,
      None => false,
    }
  }

  async fn write(&self, key: String, body: String, ttl: Duration) -> Result<(), GeocodeError> {
    if self.non_blocking {
      let store = Arc::clone(&self.store);
      tokio::spawn(async move {
        if let Err(e) = store.set(&key, body, ttl).await {
          warn!(key = %key, error = %e, "background cache write failed");
        }
      });
      Ok(())
    } else {
      self.store.set(&key, body, ttl).await?;
      Ok(())
    }
  }

  /// Re-fetch an entry nearing expiry and overwrite it, off the hot path.
  /// Failures are logged, never surfaced: the caller already has a value.
  fn spawn_refresh<T, F, Fut>(&self, key: String, ttl: Duration, fetcher: F)
  where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, GeocodeError>> + Send + 'static,
  {
    debug!(key = %key, "refreshing cache entry nearing expiry");
    let store = Arc::clone(&self.store);

    tokio::spawn(async move {
      match fetcher().await {
        Ok(value) => match serde_json::to_string(&value) {
          Ok(body) => {
            if let Err(e) = store.set(&key, body, ttl).await {
              warn!(key = %key, error = %e, "cache refresh write failed");
            }
          }
          Err(e) => warn!(key = %key, error = %e, "failed to encode refreshed value"),
        },
        Err(e) => debug!(key = %key, error = %e, "cache refresh fetch failed"),
      }
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::store::{MemoryStore, NoopStore, StoreError};
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn layer_with(config: CacheConfig) -> (CacheLayer, Arc<MemoryStore>) {
    let _ = tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .try_init();
    let store = Arc::new(MemoryStore::new());
    (CacheLayer::new(store.clone(), &config), store)
  }

  fn counting_fetcher(
    calls: &Arc<AtomicUsize>,
    value: u32,
  ) -> impl FnOnce() -> std::future::Ready<Result<u32, GeocodeError>> {
    let calls = Arc::clone(calls);
    move || {
      calls.fetch_add(1, Ordering::SeqCst);
      std::future::ready(Ok(value))
    }
  }

  #[tokio::test]
  async fn test_miss_fetches_and_second_call_hits() {
    let (layer, _store) = layer_with(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let first: u32 = layer
      .cached("search:rennes", None, counting_fetcher(&calls, 7))
      .await
      .unwrap();
    let second: u32 = layer
      .cached("search:rennes", None, counting_fetcher(&calls, 8))
      .await
      .unwrap();

    assert_eq!(first, 7);
    assert_eq!(second, 7, "second call must be served from cache");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_distinct_keys_fetch_independently() {
    let (layer, _store) = layer_with(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let _: u32 = layer
      .cached("search:a", None, counting_fetcher(&calls, 1))
      .await
      .unwrap();
    let _: u32 = layer
      .cached("search:b", None, counting_fetcher(&calls, 2))
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_zero_ttl_override_refetches() {
    let (layer, _store) = layer_with(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let _: u32 = layer
      .cached("search:x", Some(Duration::ZERO), counting_fetcher(&calls, 1))
      .await
      .unwrap();
    let _: u32 = layer
      .cached("search:x", Some(Duration::ZERO), counting_fetcher(&calls, 2))
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_fetcher_error_propagates_and_nothing_is_stored() {
    let (layer, store) = layer_with(CacheConfig::default());

    let result: Result<u32, _> = layer
      .cached("search:down", None, || {
        std::future::ready(Err(GeocodeError::Upstream))
      })
      .await;

    assert!(matches!(result, Err(GeocodeError::Upstream)));
    assert!(store.get("search:down").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_corrupt_entry_counts_as_miss_and_is_overwritten() {
    let (layer, store) = layer_with(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));

    store
      .set("search:x", "not json".to_string(), Duration::from_secs(3600))
      .await
      .unwrap();

    let value: u32 = layer
      .cached("search:x", None, counting_fetcher(&calls, 9))
      .await
      .unwrap();

    assert_eq!(value, 9);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.get("search:x").await.unwrap().unwrap().value, "9");
  }

  #[tokio::test]
  async fn test_noop_store_fetches_every_time() {
    let layer = CacheLayer::new(Arc::new(NoopStore), &CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let _: u32 = layer
      .cached("search:x", None, counting_fetcher(&calls, 1))
      .await
      .unwrap();
    let _: u32 = layer
      .cached("search:x", None, counting_fetcher(&calls, 2))
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_non_blocking_write_lands() {
    let (layer, _store) = layer_with(CacheConfig {
      non_blocking: true,
      ..CacheConfig::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));

    let _: u32 = layer
      .cached("search:x", None, counting_fetcher(&calls, 1))
      .await
      .unwrap();

    // Give the spawned write a moment to land
    tokio::time::sleep(Duration::from_millis(20)).await;

    let _: u32 = layer
      .cached("search:x", None, counting_fetcher(&calls, 2))
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_hit_inside_refresh_window_refreshes_in_background() {
    // 10s TTL with a 60s refresh window: every hit is near expiry
    let (layer, store) = layer_with(CacheConfig {
      ttl_ms: 10_000,
      refresh_threshold_ms: 60_000,
      ..CacheConfig::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));

    let _: u32 = layer
      .cached("search:x", None, counting_fetcher(&calls, 1))
      .await
      .unwrap();
    let hit: u32 = layer
      .cached("search:x", None, counting_fetcher(&calls, 2))
      .await
      .unwrap();

    // The hit still serves the cached value
    assert_eq!(hit, 1);

    tokio::time::sleep(Duration::from_millis(20)).await;

    // The background refresh fetched and overwrote the entry
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.get("search:x").await.unwrap().unwrap().value, "2");
  }

  #[tokio::test]
  async fn test_store_failure_surfaces_as_cache_error() {
    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
      async fn get(&self, _key: &str) -> Result<Option<Hit>, StoreError> {
        Err(StoreError::Database("disk on fire".to_string()))
      }

      async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Database("disk on fire".to_string()))
      }
    }

    let layer = CacheLayer::new(Arc::new(FailingStore), &CacheConfig::default());

    let result: Result<u32, _> = layer
      .cached("search:x", None, || std::future::ready(Ok(1)))
      .await;

    assert!(matches!(result, Err(GeocodeError::Cache(_))));
  }
}
