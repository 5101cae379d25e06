//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for payloads that can be cached.
///
/// Cached values are stored as serialized JSON, so anything that round-trips
/// through serde qualifies.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Entity type name for logging (e.g., "book", "verse")
  fn entity_type() -> &'static str;
}

/// Trait for values that identify a cache slot.
pub trait QueryKey {
  /// The exact key written to the cache store.
  ///
  /// Must be deterministic: equal inputs always produce equal keys.
  fn cache_key(&self) -> String;

  /// Human-readable description for logs.
  fn description(&self) -> String;
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh upstream data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  /// Create a new cache result for data fetched while the store was unreachable.
  pub fn bypassed(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Bypass,
      cached_at: None,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched upstream and written to the cache
  Network,
  /// Served from an unexpired cache entry
  Cache,
  /// Cache store unavailable, fetched upstream without caching
  Bypass,
}
