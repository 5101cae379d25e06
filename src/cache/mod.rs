//! Generic cache-aside layer.
//!
//! This module knows nothing about scripture or the engine. It provides:
//! - A byte-oriented `CacheStorage` trait with SQLite, in-memory and no-op backends
//! - `CacheLayer`, which serves unexpired entries and otherwise calls a fetcher
//!   and stores its result for a fixed TTL
//! - Fail-open behaviour when the store itself is unreachable

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
#[allow(unused_imports)]
pub use layer::Clock;
#[allow(unused_imports)]
pub use storage::CachedEntry;
pub use storage::{CacheStorage, MemoryStorage, NoopStorage, SqliteStorage};
pub use traits::{CacheResult, CacheSource, Cacheable, QueryKey};
