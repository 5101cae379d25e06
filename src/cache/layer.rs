//! Cache layer that orchestrates cache-aside lookups against an upstream fetcher.

use chrono::{DateTime, Duration, Utc};
use color_eyre::eyre::eyre;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{CacheBackend, CacheConfig};

use super::storage::{CacheStorage, CachedEntry, MemoryStorage, NoopStorage, SqliteStorage};
use super::traits::{CacheResult, Cacheable, QueryKey};

/// Source of "now" for expiry decisions.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Cache layer that manages caching logic and upstream fetching.
///
/// Entries are served until their TTL elapses and are never invalidated early.
/// The store failing is not fatal: lookups fall through to the fetcher.
pub struct CacheLayer {
  storage: Arc<dyn CacheStorage>,
  /// How long an entry is served after being written
  ttl: Duration,
  clock: Clock,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
    Self {
      storage,
      ttl: Duration::hours(1),
      clock: Arc::new(Utc::now),
    }
  }

  /// Open the configured backend. Fails if the SQLite store can't be opened.
  pub fn from_config(config: &CacheConfig) -> color_eyre::Result<Self> {
    let storage: Arc<dyn CacheStorage> = match config.backend {
      CacheBackend::Sqlite => Arc::new(SqliteStorage::open(&config.resolved_path()?)?),
      CacheBackend::Memory => Arc::new(MemoryStorage::new()),
      CacheBackend::None => Arc::new(NoopStorage),
    };
    Ok(Self::new(storage).with_ttl(config.ttl()))
  }

  /// Set the time-to-live for cached entries.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Replace the wall clock.
  #[allow(dead_code)]
  pub fn with_clock(mut self, clock: Clock) -> Self {
    self.clock = clock;
    self
  }

  pub fn storage(&self) -> &Arc<dyn CacheStorage> {
    &self.storage
  }

  /// Fetch a list with cache-aside strategy.
  ///
  /// 1. Check cache - if present and unexpired, return it without calling `fetcher`
  /// 2. Otherwise call `fetcher`
  /// 3. On success, store the list for one TTL and return it
  /// 4. On failure, return the fetcher's error untouched; nothing is stored
  ///
  /// Errors from the store itself are logged and bypassed.
  pub async fn fetch_list<K, T, E, F, Fut>(
    &self,
    key: &K,
    fetcher: F,
  ) -> Result<CacheResult<Vec<T>>, E>
  where
    K: QueryKey,
    T: Cacheable,
    E: Display,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
  {
    let cache_key = key.cache_key();
    let now = (self.clock)();
    let mut store_available = true;

    // Check cache first
    match self.storage.get(&cache_key) {
      Ok(Some(cached)) if !cached.is_expired(now) => {
        match serde_json::from_slice::<Vec<T>>(&cached.data) {
          Ok(data) => {
            debug!(key = %cache_key, entity = T::entity_type(), "cache hit");
            return Ok(CacheResult::from_cache(data, cached.cached_at));
          }
          Err(e) => {
            warn!(key = %cache_key, error = %e, "discarding undecodable cache entry");
          }
        }
      }
      Ok(Some(_)) => debug!(key = %cache_key, "cache entry expired"),
      Ok(None) => debug!(key = %cache_key, "cache miss"),
      Err(e) => {
        warn!(key = %cache_key, error = %e, "cache unavailable, bypassing");
        store_available = false;
      }
    }

    let data = fetcher().await.map_err(|e| {
      debug!(key = %cache_key, error = %e, "fetch for {} failed", key.description());
      e
    })?;

    if !store_available {
      return Ok(CacheResult::bypassed(data));
    }

    match self.store(&cache_key, &data, now) {
      Ok(()) => Ok(CacheResult::from_network(data)),
      Err(e) => {
        warn!(key = %cache_key, error = %e, "failed to write cache entry");
        Ok(CacheResult::bypassed(data))
      }
    }
  }

  fn store<T: Cacheable>(
    &self,
    cache_key: &str,
    data: &[T],
    now: DateTime<Utc>,
  ) -> color_eyre::Result<()> {
    let expires_at = now
      .checked_add_signed(self.ttl)
      .ok_or_else(|| eyre!("ttl of {}s overflows the expiry time", self.ttl.num_seconds()))?;
    let entry = CachedEntry {
      data: serde_json::to_vec(data)?,
      cached_at: now,
      expires_at,
    };
    self.storage.put(cache_key, &entry)
  }

  /// Delete expired entries from the store.
  pub fn purge_expired(&self) -> color_eyre::Result<usize> {
    self.storage.purge_expired((self.clock)())
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      ttl: self.ttl,
      clock: Arc::clone(&self.clock),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSource, MemoryStorage};
  use color_eyre::eyre::eyre;
  use serde::{Deserialize, Serialize};
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Item(u32);

  impl Cacheable for Item {
    fn entity_type() -> &'static str {
      "item"
    }
  }

  struct Key(&'static str);

  impl QueryKey for Key {
    fn cache_key(&self) -> String {
      self.0.to_string()
    }

    fn description(&self) -> String {
      self.0.to_string()
    }
  }

  /// A store whose every operation fails.
  struct BrokenStorage;

  impl CacheStorage for BrokenStorage {
    fn get(&self, _key: &str) -> color_eyre::Result<Option<CachedEntry>> {
      Err(eyre!("connection refused"))
    }

    fn put(&self, _key: &str, _entry: &CachedEntry) -> color_eyre::Result<()> {
      Err(eyre!("connection refused"))
    }

    fn purge_expired(&self, _now: DateTime<Utc>) -> color_eyre::Result<usize> {
      Err(eyre!("connection refused"))
    }

    fn ping(&self) -> bool {
      false
    }
  }

  fn manual_clock(start: DateTime<Utc>) -> (Arc<Mutex<DateTime<Utc>>>, Clock) {
    let now = Arc::new(Mutex::new(start));
    let handle = Arc::clone(&now);
    (now, Arc::new(move || *handle.lock().unwrap()))
  }

  async fn counted(calls: &AtomicUsize, items: Vec<Item>) -> Result<Vec<Item>, String> {
    calls.fetch_add(1, Ordering::SeqCst);
    Ok(items)
  }

  #[tokio::test]
  async fn test_miss_then_hit() {
    let layer = CacheLayer::new(Arc::new(MemoryStorage::new()));
    let calls = AtomicUsize::new(0);

    let first = layer
      .fetch_list(&Key("k"), || counted(&calls, vec![Item(1)]))
      .await
      .unwrap();
    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(first.data, vec![Item(1)]);

    let second = layer
      .fetch_list(&Key("k"), || counted(&calls, vec![Item(2)]))
      .await
      .unwrap();
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, vec![Item(1)]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_ttl_expiry() {
    let start = Utc::now();
    let (now, clock) = manual_clock(start);
    let layer = CacheLayer::new(Arc::new(MemoryStorage::new())).with_clock(clock);
    let calls = AtomicUsize::new(0);

    layer
      .fetch_list(&Key("k"), || counted(&calls, vec![Item(1)]))
      .await
      .unwrap();

    // Just before the hour: still served from cache
    *now.lock().unwrap() = start + Duration::hours(1) - Duration::milliseconds(1);
    let cached = layer
      .fetch_list(&Key("k"), || counted(&calls, vec![Item(2)]))
      .await
      .unwrap();
    assert_eq!(cached.data, vec![Item(1)]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // At exactly one hour the entry is expired
    *now.lock().unwrap() = start + Duration::hours(1);
    let refreshed = layer
      .fetch_list(&Key("k"), || counted(&calls, vec![Item(2)]))
      .await
      .unwrap();
    assert_eq!(refreshed.source, CacheSource::Network);
    assert_eq!(refreshed.data, vec![Item(2)]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_failure_is_not_cached() {
    let layer = CacheLayer::new(Arc::new(MemoryStorage::new()));

    let failed: Result<CacheResult<Vec<Item>>, String> = layer
      .fetch_list(&Key("k"), || async { Err("503".to_string()) })
      .await;
    assert_eq!(failed.unwrap_err(), "503");

    let calls = AtomicUsize::new(0);
    let next = layer
      .fetch_list(&Key("k"), || counted(&calls, vec![Item(7)]))
      .await
      .unwrap();
    assert_eq!(next.source, CacheSource::Network);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_empty_success_is_cached() {
    let layer = CacheLayer::new(Arc::new(MemoryStorage::new()));
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
      let result = layer
        .fetch_list(&Key("k"), || counted(&calls, Vec::new()))
        .await
        .unwrap();
      assert!(result.data.is_empty());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_store_unavailable_fails_open() {
    let layer = CacheLayer::new(Arc::new(BrokenStorage));
    let calls = AtomicUsize::new(0);

    let result = layer
      .fetch_list(&Key("k"), || counted(&calls, vec![Item(3)]))
      .await
      .unwrap();
    assert_eq!(result.source, CacheSource::Bypass);
    assert_eq!(result.data, vec![Item(3)]);
  }

  #[tokio::test]
  async fn test_overflowing_expiry_is_served_uncached() {
    let storage = Arc::new(MemoryStorage::new());
    let layer = CacheLayer::new(storage.clone()).with_ttl(Duration::milliseconds(i64::MAX));
    let calls = AtomicUsize::new(0);

    let result = layer
      .fetch_list(&Key("k"), || counted(&calls, vec![Item(4)]))
      .await
      .unwrap();
    assert_eq!(result.source, CacheSource::Bypass);
    assert_eq!(result.data, vec![Item(4)]);
    assert!(storage.get("k").unwrap().is_none());
  }

  #[test]
  fn test_from_config_opens_only_the_cache_file() {
    let dir = std::env::temp_dir().join(format!("sword-proxy-layer-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("cache.db");
    let config = CacheConfig {
      path: Some(path.clone()),
      ttl_secs: 60,
      ..CacheConfig::default()
    };

    let layer = CacheLayer::from_config(&config).unwrap();
    assert_eq!(layer.ttl, Duration::seconds(60));
    assert_eq!(layer.purge_expired().unwrap(), 0);
    assert!(path.exists());
    assert!(!dir.join("mirror.db").exists());

    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn test_from_config_reports_unopenable_store() {
    // A regular file where the parent directory should be
    let file = std::env::temp_dir().join(format!("sword-proxy-blocker-{}", std::process::id()));
    std::fs::write(&file, b"").unwrap();
    let config = CacheConfig {
      path: Some(file.join("cache.db")),
      ..CacheConfig::default()
    };
    assert!(CacheLayer::from_config(&config).is_err());

    std::fs::remove_file(&file).unwrap();
  }

  #[tokio::test]
  async fn test_undecodable_entry_is_a_miss() {
    let storage = Arc::new(MemoryStorage::new());
    let now = Utc::now();
    storage
      .put(
        "k",
        &CachedEntry {
          data: b"not json".to_vec(),
          cached_at: now,
          expires_at: now + Duration::hours(1),
        },
      )
      .unwrap();

    let layer = CacheLayer::new(storage);
    let calls = AtomicUsize::new(0);
    let result = layer
      .fetch_list(&Key("k"), || counted(&calls, vec![Item(4)]))
      .await
      .unwrap();
    assert_eq!(result.data, vec![Item(4)]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_concurrent_misses_both_fetch() {
    let storage = Arc::new(MemoryStorage::new());
    let layer = CacheLayer::new(storage.clone());
    let calls = &AtomicUsize::new(0);
    let barrier = &tokio::sync::Barrier::new(2);

    let fetch = move || async move {
      calls.fetch_add(1, Ordering::SeqCst);
      // Hold both fetchers until each has missed
      barrier.wait().await;
      Ok::<_, String>(vec![Item(9)])
    };

    let (a, b) = tokio::join!(
      layer.fetch_list(&Key("k"), fetch),
      layer.fetch_list(&Key("k"), fetch)
    );

    assert_eq!(a.unwrap().data, vec![Item(9)]);
    assert_eq!(b.unwrap().data, vec![Item(9)]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let stored = storage.get("k").unwrap().unwrap();
    let cached: Vec<Item> = serde_json::from_slice(&stored.data).unwrap();
    assert_eq!(cached, vec![Item(9)]);
  }
}
