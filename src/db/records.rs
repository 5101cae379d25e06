//! Rows of the local mirror and the rules a row must satisfy before insert.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookRecord {
  pub id: i64,
  pub name: String,
  pub abbreviation: String,
  pub number: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterRecord {
  pub id: i64,
  pub book_id: i64,
  pub number: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerseRecord {
  pub id: i64,
  pub chapter_id: i64,
  pub number: i64,
  pub text: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A book to insert into the mirror.
#[derive(Debug, Clone)]
pub struct NewBook {
  pub name: String,
  pub abbreviation: String,
  pub number: i64,
}

impl NewBook {
  pub fn validate(&self) -> Result<(), ValidationError> {
    require_present("name", &self.name)?;
    require_present("abbreviation", &self.abbreviation)?;
    require_positive("number", self.number)
  }
}

/// Why a row was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
  /// Field is empty or whitespace
  Blank(&'static str),
  /// Field must be an integer greater than zero
  NotPositive(&'static str),
  /// Another row already has this value
  Duplicate(&'static str),
  /// The referenced parent row does not exist
  MissingParent(&'static str),
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Blank(field) => write!(f, "{} can't be blank", field),
      Self::NotPositive(field) => write!(f, "{} must be greater than 0", field),
      Self::Duplicate(field) => write!(f, "{} has already been taken", field),
      Self::MissingParent(parent) => write!(f, "{} must exist", parent),
    }
  }
}

impl std::error::Error for ValidationError {}

pub fn require_present(field: &'static str, value: &str) -> Result<(), ValidationError> {
  if value.trim().is_empty() {
    Err(ValidationError::Blank(field))
  } else {
    Ok(())
  }
}

pub fn require_positive(field: &'static str, value: i64) -> Result<(), ValidationError> {
  if value > 0 {
    Ok(())
  } else {
    Err(ValidationError::NotPositive(field))
  }
}
