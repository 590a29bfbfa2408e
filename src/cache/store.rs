//! Cache store trait and backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by cache store backends.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("cache store I/O failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("cache database failed: {0}")]
  Database(String),

  #[error("cache store lock poisoned")]
  Poisoned,
}

/// A value returned from a store lookup: the body plus when it lapses.
#[derive(Debug, Clone)]
pub struct Hit {
  /// The stored serialized body.
  pub value: String,
  /// Absolute expiry, when the backend tracks one.
  pub expires_at: Option<DateTime<Utc>>,
}

/// A pluggable cache backend.
///
/// Stores opaque serialized bodies under string keys. Each backend
/// enforces its own expiry: `get` must never return an expired entry.
#[async_trait]
pub trait CacheStore: Send + Sync {
  /// Fetch the entry stored under `key`, if present and unexpired.
  async fn get(&self, key: &str) -> Result<Option<Hit>, StoreError>;

  /// Store `value` under `key` for `ttl`, overwriting any previous entry.
  async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;
}

fn expiry(ttl: Duration) -> DateTime<Utc> {
  Utc::now() + chrono::Duration::milliseconds(ttl.as_millis() as i64)
}

// ============================================================================
// In-memory store
// ============================================================================

struct Entry {
  value: String,
  expires_at: DateTime<Utc>,
}

/// Process-local in-memory store. The default backend.
///
/// Expired entries are dropped lazily, on the read that finds them.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl CacheStore for MemoryStore {
  async fn get(&self, key: &str) -> Result<Option<Hit>, StoreError> {
    let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;

    let expired = match entries.get(key) {
      Some(entry) if entry.expires_at > Utc::now() => {
        return Ok(Some(Hit {
          value: entry.value.clone(),
          expires_at: Some(entry.expires_at),
        }));
      }
      Some(_) => true,
      None => false,
    };

    if expired {
      entries.remove(key);
    }
    Ok(None)
  }

  async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
    let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
    entries.insert(
      key.to_string(),
      Entry {
        value,
        expires_at: expiry(ttl),
      },
    );
    Ok(())
  }
}

// ============================================================================
// No-op store
// ============================================================================

/// Store that never caches anything: every get misses, every set discards.
/// Used when caching is disabled without touching call sites.
pub struct NoopStore;

#[async_trait]
impl CacheStore for NoopStore {
  async fn get(&self, _key: &str) -> Result<Option<Hit>, StoreError> {
    Ok(None)
  }

  async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), StoreError> {
    Ok(())
  }
}

// ============================================================================
// SQLite store
// ============================================================================

/// Schema for the cache table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at TEXT NOT NULL
);
"#;

/// SQLite-backed store for a cache that survives restarts.
///
/// Expired rows are deleted on the read that finds them.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open the store at the default location for `namespace`
  /// (`<data_dir>/<namespace>/cache.db`).
  pub fn open(namespace: &str) -> Result<Self, StoreError> {
    let path = Self::default_path(namespace)?;
    Self::open_at(&path)
  }

  /// Open the store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path).map_err(db_err)?;
    conn.execute_batch(CACHE_SCHEMA).map_err(db_err)?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn default_path(namespace: &str) -> Result<PathBuf, StoreError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| StoreError::Database("could not determine data directory".to_string()))?;

    Ok(data_dir.join(namespace).join("cache.db"))
  }
}

fn db_err(e: rusqlite::Error) -> StoreError {
  StoreError::Database(e.to_string())
}

#[async_trait]
impl CacheStore for SqliteStore {
  async fn get(&self, key: &str) -> Result<Option<Hit>, StoreError> {
    let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;

    let row: Option<(String, String)> = conn
      .query_row(
        "SELECT value, expires_at FROM cache WHERE key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .ok();

    let (value, expires_at) = match row {
      Some(r) => r,
      None => return Ok(None),
    };

    let expires_at = DateTime::parse_from_rfc3339(&expires_at)
      .map_err(|e| StoreError::Database(format!("bad expiry timestamp '{}': {}", expires_at, e)))?
      .with_timezone(&Utc);

    if expires_at <= Utc::now() {
      conn
        .execute("DELETE FROM cache WHERE key = ?", params![key])
        .map_err(db_err)?;
      return Ok(None);
    }

    Ok(Some(Hit {
      value,
      expires_at: Some(expires_at),
    }))
  }

  async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
    let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache (key, value, expires_at) VALUES (?, ?, ?)",
        params![key, value, expiry(ttl).to_rfc3339()],
      )
      .map_err(db_err)?;

    Ok(())
  }
}
