//! Response envelopes of the engine's list endpoints.
//!
//! Each list endpoint wraps its array in a single named field. A missing field
//! decodes as an empty list.

use serde::{de::DeserializeOwned, Deserialize};

use super::types::{EngineBook, EngineChapter, EngineVerse, EngineVersion};

/// A JSON object carrying one named array.
pub trait ListEnvelope: DeserializeOwned {
  type Item;

  /// Name of the array field, for logs
  const FIELD: &'static str;

  fn into_items(self) -> Vec<Self::Item>;
}

#[derive(Debug, Deserialize)]
pub struct BooksResponse {
  #[serde(default)]
  pub books: Vec<EngineBook>,
}

#[derive(Debug, Deserialize)]
pub struct ChaptersResponse {
  #[serde(default)]
  pub chapters: Vec<EngineChapter>,
}

#[derive(Debug, Deserialize)]
pub struct VersesResponse {
  #[serde(default)]
  pub verses: Vec<EngineVerse>,
}

#[derive(Debug, Deserialize)]
pub struct VersionsResponse {
  #[serde(default)]
  pub versions: Vec<EngineVersion>,
}

impl ListEnvelope for BooksResponse {
  type Item = EngineBook;
  const FIELD: &'static str = "books";

  fn into_items(self) -> Vec<EngineBook> {
    self.books
  }
}

impl ListEnvelope for ChaptersResponse {
  type Item = EngineChapter;
  const FIELD: &'static str = "chapters";

  fn into_items(self) -> Vec<EngineChapter> {
    self.chapters
  }
}

impl ListEnvelope for VersesResponse {
  type Item = EngineVerse;
  const FIELD: &'static str = "verses";

  fn into_items(self) -> Vec<EngineVerse> {
    self.verses
  }
}

impl ListEnvelope for VersionsResponse {
  type Item = EngineVersion;
  const FIELD: &'static str = "versions";

  fn into_items(self) -> Vec<EngineVersion> {
    self.versions
  }
}
