//! Cache keys for engine listings.

use crate::cache::QueryKey;

const BOOKS_PREFIX: &str = "sword_engine_books";
const CHAPTERS_PREFIX: &str = "sword_engine_chapters";
const VERSES_PREFIX: &str = "sword_engine_verses";
const SEPARATOR: &str = "_";

/// One cache slot per listing, keyed by the ancestors' mirror ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceKey {
  /// All books
  Books,
  /// Chapters of one book
  Chapters { book_id: i64 },
  /// Verses of one chapter
  Verses { book_id: i64, chapter_id: i64 },
}

impl ResourceKey {
  fn prefix(&self) -> &'static str {
    match self {
      Self::Books => BOOKS_PREFIX,
      Self::Chapters { .. } => CHAPTERS_PREFIX,
      Self::Verses { .. } => VERSES_PREFIX,
    }
  }

  /// Ancestor ids, outermost first.
  fn parts(&self) -> Vec<i64> {
    match self {
      Self::Books => Vec::new(),
      Self::Chapters { book_id } => vec![*book_id],
      Self::Verses {
        book_id,
        chapter_id,
      } => vec![*book_id, *chapter_id],
    }
  }
}

impl QueryKey for ResourceKey {
  fn cache_key(&self) -> String {
    let mut key = self.prefix().to_string();
    for part in self.parts() {
      key.push_str(SEPARATOR);
      key.push_str(&part.to_string());
    }
    key
  }

  fn description(&self) -> String {
    match self {
      Self::Books => "all books".to_string(),
      Self::Chapters { book_id } => format!("chapters of book {}", book_id),
      Self::Verses {
        book_id,
        chapter_id,
      } => format!("verses of book {} chapter {}", book_id, chapter_id),
    }
  }
}
