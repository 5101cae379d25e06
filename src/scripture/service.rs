//! Scripture service: directory lookups in front of cached engine listings.

use color_eyre::Result;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{CacheLayer, Cacheable, NoopStorage};
use crate::config::Config;
use crate::db::{BookRecord, ChapterRecord, Database, ResourceDirectory, VerseRecord};
use crate::engine::{
  EngineBook, EngineChapter, EngineClient, EngineResponse, EngineVerse, EngineVersion,
};

use super::keys::ResourceKey;
use super::outcome::{Outcome, Resource};

/// Reachability of each backing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
  pub sword_engine: bool,
  pub cache: bool,
  pub database: bool,
}

impl HealthStatus {
  pub fn all_healthy(&self) -> bool {
    self.sword_engine && self.cache && self.database
  }
}

/// Scripture access with transparent caching of engine listings.
///
/// Listings never fail because of the engine: an unreachable or erroring
/// engine yields an empty list. Identifiers that don't resolve in the mirror
/// yield `Outcome::NotFound` before the cache or engine is touched.
#[derive(Clone)]
pub struct ScriptureService {
  engine: EngineClient,
  cache: CacheLayer,
  directory: ResourceDirectory,
}

impl ScriptureService {
  pub fn new(engine: EngineClient, cache: CacheLayer, directory: ResourceDirectory) -> Self {
    Self {
      engine,
      cache,
      directory,
    }
  }

  /// Build the service from configuration.
  pub fn from_config(config: &Config) -> Result<Self> {
    let engine = EngineClient::new(&config.engine)?;
    let cache = open_cache(config);
    let directory = ResourceDirectory::new(Database::open(&config.database.resolved_path()?)?);

    Ok(Self::new(engine, cache, directory))
  }

  pub fn engine(&self) -> &EngineClient {
    &self.engine
  }

  pub fn directory(&self) -> &ResourceDirectory {
    &self.directory
  }

  /// All books, cached.
  pub async fn books(&self) -> Vec<EngineBook> {
    self.resolve_books().await
  }

  /// Chapters of the book with this abbreviation, cached.
  pub async fn chapters(&self, abbreviation: &str) -> Result<Outcome<Vec<EngineChapter>>> {
    let Some(book_id) = self.directory.resolve_book_id(abbreviation)? else {
      debug!(abbreviation, "book not found");
      return Ok(Outcome::NotFound(Resource::Book));
    };

    Ok(Outcome::Found(self.resolve_chapters(book_id).await))
  }

  /// Verses of one chapter, cached.
  pub async fn verses(
    &self,
    abbreviation: &str,
    chapter_number: i64,
  ) -> Result<Outcome<Vec<EngineVerse>>> {
    let Some(book_id) = self.directory.resolve_book_id(abbreviation)? else {
      debug!(abbreviation, "book not found");
      return Ok(Outcome::NotFound(Resource::Book));
    };
    let Some(chapter_id) = self.directory.resolve_chapter_id(book_id, chapter_number)? else {
      debug!(abbreviation, chapter_number, "chapter not found");
      return Ok(Outcome::NotFound(Resource::Chapter));
    };

    Ok(Outcome::Found(self.resolve_verses(book_id, chapter_id).await))
  }

  pub fn book(&self, abbreviation: &str) -> Result<Outcome<BookRecord>> {
    Ok(match self.directory.find_book(abbreviation)? {
      Some(book) => Outcome::Found(book),
      None => Outcome::NotFound(Resource::Book),
    })
  }

  pub fn chapter(&self, abbreviation: &str, number: i64) -> Result<Outcome<ChapterRecord>> {
    let Some(book_id) = self.directory.resolve_book_id(abbreviation)? else {
      return Ok(Outcome::NotFound(Resource::Book));
    };
    Ok(match self.directory.find_chapter(book_id, number)? {
      Some(chapter) => Outcome::Found(chapter),
      None => Outcome::NotFound(Resource::Chapter),
    })
  }

  pub fn verse(
    &self,
    abbreviation: &str,
    chapter_number: i64,
    verse_number: i64,
  ) -> Result<Outcome<VerseRecord>> {
    let Some(book_id) = self.directory.resolve_book_id(abbreviation)? else {
      return Ok(Outcome::NotFound(Resource::Book));
    };
    let Some(chapter_id) = self.directory.resolve_chapter_id(book_id, chapter_number)? else {
      return Ok(Outcome::NotFound(Resource::Chapter));
    };
    Ok(match self.directory.find_verse(chapter_id, verse_number)? {
      Some(verse) => Outcome::Found(verse),
      None => Outcome::NotFound(Resource::Verse),
    })
  }

  /// Installed text modules (not cached).
  pub async fn versions(&self) -> Vec<EngineVersion> {
    self.engine.list_versions().await
  }

  /// Full-text search (not cached).
  pub async fn search(&self, query: &str) -> Outcome<Value> {
    match self.engine.search(query).await {
      EngineResponse::Success(body) => Outcome::Found(body),
      EngineResponse::Failure(reason) => {
        warn!(query, error = %reason, "search failed");
        Outcome::Upstream(reason)
      }
    }
  }

  pub async fn health(&self) -> HealthStatus {
    HealthStatus {
      sword_engine: self.engine.health_check().await,
      cache: self.cache.storage().ping(),
      database: self.directory.ping(),
    }
  }

  pub async fn resolve_books(&self) -> Vec<EngineBook> {
    self
      .resolve(ResourceKey::Books, || self.engine.fetch_books())
      .await
  }

  pub async fn resolve_chapters(&self, book_id: i64) -> Vec<EngineChapter> {
    self
      .resolve(ResourceKey::Chapters { book_id }, || {
        self.engine.fetch_chapters(book_id)
      })
      .await
  }

  pub async fn resolve_verses(&self, book_id: i64, chapter_id: i64) -> Vec<EngineVerse> {
    self
      .resolve(
        ResourceKey::Verses {
          book_id,
          chapter_id,
        },
        || self.engine.fetch_verses(book_id, chapter_id),
      )
      .await
  }

  /// Cache-aside lookup shared by every listing. Upstream failures degrade to
  /// an empty list and are not cached.
  async fn resolve<T, F, Fut>(&self, key: ResourceKey, fetch: F) -> Vec<T>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = EngineResponse<Vec<T>>>,
  {
    match self
      .cache
      .fetch_list(&key, move || async move { fetch().await.into_result() })
      .await
    {
      Ok(result) => {
        debug!(key = ?key, source = ?result.source, count = result.data.len(), "resolved");
        result.data
      }
      // The engine client has already logged the failure
      Err(_) => Vec::new(),
    }
  }
}

/// Open the configured cache. A store that can't be opened is replaced by
/// `NoopStorage` so requests still reach the engine.
fn open_cache(config: &Config) -> CacheLayer {
  CacheLayer::from_config(&config.cache).unwrap_or_else(|e| {
    warn!(error = %e, "cache store unavailable, caching disabled");
    CacheLayer::new(Arc::new(NoopStorage)).with_ttl(config.cache.ttl())
  })
}
