//! Cache storage trait and its SQLite, in-memory and no-op implementations.

use chrono::{DateTime, TimeZone, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// A single cached value as stored.
#[derive(Debug, Clone)]
pub struct CachedEntry {
  /// Serialized JSON payload
  pub data: Vec<u8>,
  /// When the entry was written
  pub cached_at: DateTime<Utc>,
  /// When the entry stops being served
  pub expires_at: DateTime<Utc>,
}

impl CachedEntry {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }
}

/// Trait for cache storage backends.
///
/// Backends only move bytes; expiry is decided by the caller against its own clock.
pub trait CacheStorage: Send + Sync {
  /// Get the entry stored under `key`, expired or not.
  fn get(&self, key: &str) -> Result<Option<CachedEntry>>;

  /// Store (or replace) the entry under `key`.
  fn put(&self, key: &str, entry: &CachedEntry) -> Result<()>;

  /// Delete entries that expired before `now`. Returns how many were removed.
  fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;

  /// Whether the backend is currently usable.
  fn ping(&self) -> bool;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Result<Option<CachedEntry>> {
    Ok(None) // Always miss
  }

  fn put(&self, _key: &str, _entry: &CachedEntry) -> Result<()> {
    Ok(()) // Discard
  }

  fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize> {
    Ok(0)
  }

  fn ping(&self) -> bool {
    true
  }
}

/// In-process storage, lost on restart.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, CachedEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<CachedEntry>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  fn put(&self, key: &str, entry: &CachedEntry) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(key.to_string(), entry.clone());
    Ok(())
  }

  fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    Ok(before - entries.len())
  }

  fn ping(&self) -> bool {
    self.entries.lock().is_ok()
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the cache database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a private in-memory cache database.
  #[allow(dead_code)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables. Timestamps are unix milliseconds.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    cached_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at);
"#;

impl CacheStorage for SqliteStorage {
  fn get(&self, key: &str) -> Result<Option<CachedEntry>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(Vec<u8>, i64, i64)> = conn
      .query_row(
        "SELECT data, cached_at, expires_at FROM cache_entries WHERE key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry {}: {}", key, e))?;

    match row {
      Some((data, cached_at, expires_at)) => Ok(Some(CachedEntry {
        data,
        cached_at: from_millis(cached_at)?,
        expires_at: from_millis(expires_at)?,
      })),
      None => Ok(None),
    }
  }

  fn put(&self, key: &str, entry: &CachedEntry) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache_entries (key, data, cached_at, expires_at)
         VALUES (?, ?, ?, ?)",
        params![
          key,
          entry.data,
          entry.cached_at.timestamp_millis(),
          entry.expires_at.timestamp_millis()
        ],
      )
      .map_err(|e| eyre!("Failed to store cache entry {}: {}", key, e))?;

    Ok(())
  }

  fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM cache_entries WHERE expires_at <= ?",
        params![now.timestamp_millis()],
      )
      .map_err(|e| eyre!("Failed to purge expired cache entries: {}", e))
  }

  fn ping(&self) -> bool {
    match self.conn.lock() {
      Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
      Err(_) => false,
    }
  }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
  Utc
    .timestamp_millis_opt(ms)
    .single()
    .ok_or_else(|| eyre!("Invalid cache timestamp {}", ms))
}
