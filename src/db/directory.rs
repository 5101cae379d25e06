//! Resource directory: resolves human-facing identifiers to mirror ids.
//!
//! Every lookup returns `Ok(None)` when nothing matches. A missing row is
//! never created on demand.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Report, Result};
use rusqlite::{params, ErrorCode, OptionalExtension, Row};
use std::sync::Arc;

use super::records::{
  require_positive, require_present, BookRecord, ChapterRecord, NewBook, ValidationError,
  VerseRecord,
};
use super::Database;

#[derive(Clone)]
pub struct ResourceDirectory {
  db: Arc<Database>,
}

impl ResourceDirectory {
  pub fn new(db: Database) -> Self {
    Self { db: Arc::new(db) }
  }

  pub fn ping(&self) -> bool {
    self.db.ping()
  }

  pub fn resolve_book_id(&self, abbreviation: &str) -> Result<Option<i64>> {
    let conn = self.db.conn()?;
    conn
      .query_row(
        "SELECT id FROM books WHERE abbreviation = ?",
        params![abbreviation],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up book {}: {}", abbreviation, e))
  }

  pub fn resolve_chapter_id(&self, book_id: i64, number: i64) -> Result<Option<i64>> {
    let conn = self.db.conn()?;
    conn
      .query_row(
        "SELECT id FROM chapters WHERE book_id = ? AND number = ?",
        params![book_id, number],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up chapter {} of book {}: {}", number, book_id, e))
  }

  pub fn find_book(&self, abbreviation: &str) -> Result<Option<BookRecord>> {
    let conn = self.db.conn()?;
    conn
      .query_row(
        "SELECT id, name, abbreviation, number, created_at, updated_at
         FROM books WHERE abbreviation = ?",
        params![abbreviation],
        |row| {
          Ok(BookRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            abbreviation: row.get(2)?,
            number: row.get(3)?,
            created_at: timestamp(row, 4)?,
            updated_at: timestamp(row, 5)?,
          })
        },
      )
      .optional()
      .map_err(|e| eyre!("Failed to load book {}: {}", abbreviation, e))
  }

  pub fn find_chapter(&self, book_id: i64, number: i64) -> Result<Option<ChapterRecord>> {
    let conn = self.db.conn()?;
    conn
      .query_row(
        "SELECT id, book_id, number, created_at, updated_at
         FROM chapters WHERE book_id = ? AND number = ?",
        params![book_id, number],
        |row| {
          Ok(ChapterRecord {
            id: row.get(0)?,
            book_id: row.get(1)?,
            number: row.get(2)?,
            created_at: timestamp(row, 3)?,
            updated_at: timestamp(row, 4)?,
          })
        },
      )
      .optional()
      .map_err(|e| eyre!("Failed to load chapter {} of book {}: {}", number, book_id, e))
  }

  pub fn find_verse(&self, chapter_id: i64, number: i64) -> Result<Option<VerseRecord>> {
    let conn = self.db.conn()?;
    conn
      .query_row(
        "SELECT id, chapter_id, number, text, created_at, updated_at
         FROM verses WHERE chapter_id = ? AND number = ?",
        params![chapter_id, number],
        |row| {
          Ok(VerseRecord {
            id: row.get(0)?,
            chapter_id: row.get(1)?,
            number: row.get(2)?,
            text: row.get(3)?,
            created_at: timestamp(row, 4)?,
            updated_at: timestamp(row, 5)?,
          })
        },
      )
      .optional()
      .map_err(|e| eyre!("Failed to load verse {} of chapter {}: {}", number, chapter_id, e))
  }

  /// Insert a book. Validation failures are `ValidationError`s inside the report.
  pub fn insert_book(&self, book: &NewBook) -> Result<i64> {
    book.validate()?;
    let now = Utc::now().to_rfc3339();
    let conn = self.db.conn()?;
    conn
      .execute(
        "INSERT INTO books (name, abbreviation, number, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
        params![book.name, book.abbreviation, book.number, now, now],
      )
      .map_err(|e| constraint_error(e, "book"))?;
    Ok(conn.last_insert_rowid())
  }

  pub fn insert_chapter(&self, book_id: i64, number: i64) -> Result<i64> {
    require_positive("number", number)?;
    let now = Utc::now().to_rfc3339();
    let conn = self.db.conn()?;
    conn
      .execute(
        "INSERT INTO chapters (book_id, number, created_at, updated_at) VALUES (?, ?, ?, ?)",
        params![book_id, number, now, now],
      )
      .map_err(|e| constraint_error(e, "book"))?;
    Ok(conn.last_insert_rowid())
  }

  pub fn insert_verse(&self, chapter_id: i64, number: i64, text: &str) -> Result<i64> {
    require_positive("number", number)?;
    require_present("text", text)?;
    let now = Utc::now().to_rfc3339();
    let conn = self.db.conn()?;
    conn
      .execute(
        "INSERT INTO verses (chapter_id, number, text, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
        params![chapter_id, number, text, now, now],
      )
      .map_err(|e| constraint_error(e, "chapter"))?;
    Ok(conn.last_insert_rowid())
  }

  /// Return the id of the book with this abbreviation, inserting it first if absent.
  pub fn ensure_book(&self, book: &NewBook) -> Result<i64> {
    match self.resolve_book_id(&book.abbreviation)? {
      Some(id) => Ok(id),
      None => self.insert_book(book),
    }
  }

  pub fn ensure_chapter(&self, book_id: i64, number: i64) -> Result<i64> {
    match self.resolve_chapter_id(book_id, number)? {
      Some(id) => Ok(id),
      None => self.insert_chapter(book_id, number),
    }
  }

  pub fn ensure_verse(&self, chapter_id: i64, number: i64, text: &str) -> Result<i64> {
    match self.find_verse(chapter_id, number)? {
      Some(verse) => Ok(verse.id),
      None => self.insert_verse(chapter_id, number, text),
    }
  }

  /// Delete a book together with its chapters and their verses.
  #[allow(dead_code)]
  pub fn delete_book(&self, book_id: i64) -> Result<bool> {
    let conn = self.db.conn()?;
    let deleted = conn
      .execute("DELETE FROM books WHERE id = ?", params![book_id])
      .map_err(|e| eyre!("Failed to delete book {}: {}", book_id, e))?;
    Ok(deleted > 0)
  }
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
  let raw: String = row.get(idx)?;
  DateTime::parse_from_rfc3339(&raw)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| {
      rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Turn constraint violations into `ValidationError`s; anything else stays a plain report.
fn constraint_error(err: rusqlite::Error, parent: &'static str) -> Report {
  if let rusqlite::Error::SqliteFailure(ref failure, ref message) = err {
    if failure.code == ErrorCode::ConstraintViolation {
      if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
        return ValidationError::MissingParent(parent).into();
      }
      let field = match message.as_deref() {
        Some(m) if m.contains("abbreviation") => "abbreviation",
        _ => "number",
      };
      return ValidationError::Duplicate(field).into();
    }
  }
  eyre!("Failed to insert row: {}", err)
}
