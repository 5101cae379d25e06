//! Payloads returned by the engine, as cached and served.
//!
//! Each item wraps the JSON element exactly as the engine sent it. Nothing is
//! required of its shape; the accessors read the fields the mirror cares
//! about and return `None` when one is missing or of another type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::Cacheable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineBook(Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineChapter(Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineVerse(Value);

/// An installed text module (translation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineVersion(Value);

fn str_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
  value.get(field).and_then(Value::as_str)
}

fn int_field(value: &Value, field: &str) -> Option<i64> {
  value.get(field).and_then(Value::as_i64)
}

impl EngineBook {
  pub fn name(&self) -> Option<&str> {
    str_field(&self.0, "name")
  }

  pub fn abbreviation(&self) -> Option<&str> {
    str_field(&self.0, "abbreviation")
  }

  pub fn number(&self) -> Option<i64> {
    int_field(&self.0, "number")
  }

  /// "OT" or "NT"
  #[allow(dead_code)]
  pub fn testament(&self) -> Option<&str> {
    str_field(&self.0, "testament")
  }
}

impl EngineChapter {
  pub fn number(&self) -> Option<i64> {
    int_field(&self.0, "number")
  }
}

impl EngineVerse {
  pub fn number(&self) -> Option<i64> {
    int_field(&self.0, "number")
  }

  pub fn text(&self) -> Option<&str> {
    str_field(&self.0, "text")
  }
}

impl From<Value> for EngineBook {
  fn from(value: Value) -> Self {
    Self(value)
  }
}

impl From<Value> for EngineChapter {
  fn from(value: Value) -> Self {
    Self(value)
  }
}

impl From<Value> for EngineVerse {
  fn from(value: Value) -> Self {
    Self(value)
  }
}

impl Cacheable for EngineBook {
  fn entity_type() -> &'static str {
    "book"
  }
}

impl Cacheable for EngineChapter {
  fn entity_type() -> &'static str {
    "chapter"
  }
}

impl Cacheable for EngineVerse {
  fn entity_type() -> &'static str {
    "verse"
  }
}
