//! Seed the local mirror from the engine.
//!
//! Unlike the request path this is not fail-soft: an engine failure aborts the
//! import so a half-empty mirror isn't mistaken for a complete one. Items
//! lacking the fields a mirror row needs are skipped with a warning.

use color_eyre::{eyre::eyre, Result};
use tracing::{info, warn};

use crate::db::{NewBook, ResourceDirectory};
use crate::engine::EngineClient;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
  pub books: usize,
  pub chapters: usize,
  pub verses: usize,
}

/// Copy books and chapters (and verses when `with_verses`) into the mirror.
///
/// Rows that already exist are kept; the engine is addressed with the
/// mirror's ids, the same ids the request path uses.
pub async fn import(
  engine: &EngineClient,
  directory: &ResourceDirectory,
  with_verses: bool,
) -> Result<ImportSummary> {
  let mut summary = ImportSummary::default();

  let books = engine
    .fetch_books()
    .await
    .into_result()
    .map_err(|e| eyre!("Failed to fetch books: {}", e))?;

  for book in books {
    let (Some(name), Some(abbreviation), Some(number)) =
      (book.name(), book.abbreviation(), book.number())
    else {
      warn!(book = ?book, "skipping book without name, abbreviation or number");
      continue;
    };
    let book_id = directory.ensure_book(&NewBook {
      name: name.to_string(),
      abbreviation: abbreviation.to_string(),
      number,
    })?;
    summary.books += 1;

    let chapters = engine
      .fetch_chapters(book_id)
      .await
      .into_result()
      .map_err(|e| eyre!("Failed to fetch chapters of {}: {}", abbreviation, e))?;

    for chapter in chapters {
      let Some(chapter_number) = chapter.number() else {
        warn!(book = abbreviation, chapter = ?chapter, "skipping chapter without number");
        continue;
      };
      let chapter_id = directory.ensure_chapter(book_id, chapter_number)?;
      summary.chapters += 1;

      if !with_verses {
        continue;
      }

      let verses = engine
        .fetch_verses(book_id, chapter_id)
        .await
        .into_result()
        .map_err(|e| {
          eyre!(
            "Failed to fetch verses of {} {}: {}",
            abbreviation,
            chapter_number,
            e
          )
        })?;

      for verse in verses {
        let (Some(verse_number), Some(text)) = (verse.number(), verse.text()) else {
          warn!(book = abbreviation, chapter = chapter_number, "skipping incomplete verse");
          continue;
        };
        directory.ensure_verse(chapter_id, verse_number, text)?;
        summary.verses += 1;
      }
    }

    info!(book = %abbreviation, "imported");
  }

  Ok(summary)
}
