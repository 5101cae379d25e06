use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::scripture::Outcome;

use super::error::ApiError;
use super::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
  query: Option<String>,
}

/// Path segments that aren't positive-looking integers can't match any row.
fn parse_number(raw: &str) -> Option<i64> {
  raw.parse().ok()
}

/// Unwrap a directory outcome, reporting any miss with `message`.
fn found<T>(outcome: Outcome<T>, message: &'static str) -> Result<T, ApiError> {
  match outcome {
    Outcome::Found(data) => Ok(data),
    Outcome::NotFound(_) => Err(ApiError::not_found(message)),
    Outcome::Upstream(reason) => Err(ApiError::BadGateway(reason.to_string())),
  }
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
  let status = state.scripture.health().await;
  let code = if status.all_healthy() {
    StatusCode::OK
  } else {
    StatusCode::SERVICE_UNAVAILABLE
  };
  (code, Json(json!({ "status": status })))
}

pub async fn list_versions(State(state): State<AppState>) -> Json<Value> {
  Json(json!({ "versions": state.scripture.versions().await }))
}

pub async fn list_books(State(state): State<AppState>) -> Json<Value> {
  Json(json!({ "books": state.scripture.books().await }))
}

pub async fn show_book(
  State(state): State<AppState>,
  Path(book): Path<String>,
) -> Result<Json<Value>, ApiError> {
  let book = found(state.scripture.book(&book)?, "Book not found")?;
  Ok(Json(json!({ "book": book })))
}

pub async fn list_chapters(
  State(state): State<AppState>,
  Path(book): Path<String>,
) -> Result<Json<Value>, ApiError> {
  let chapters = found(state.scripture.chapters(&book).await?, "Book not found")?;
  Ok(Json(json!({ "chapters": chapters })))
}

pub async fn show_chapter(
  State(state): State<AppState>,
  Path((book, chapter)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
  const MESSAGE: &str = "Chapter not found";
  let number = parse_number(&chapter).ok_or(ApiError::not_found(MESSAGE))?;
  let chapter = found(state.scripture.chapter(&book, number)?, MESSAGE)?;
  Ok(Json(json!({ "chapter": chapter })))
}

pub async fn list_verses(
  State(state): State<AppState>,
  Path((book, chapter)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
  const MESSAGE: &str = "Book or chapter not found";
  let number = parse_number(&chapter).ok_or(ApiError::not_found(MESSAGE))?;
  let verses = found(state.scripture.verses(&book, number).await?, MESSAGE)?;
  Ok(Json(json!({ "verses": verses })))
}

pub async fn show_verse(
  State(state): State<AppState>,
  Path((book, chapter, verse)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
  const MESSAGE: &str = "Verse not found";
  let chapter = parse_number(&chapter).ok_or(ApiError::not_found(MESSAGE))?;
  let verse = parse_number(&verse).ok_or(ApiError::not_found(MESSAGE))?;
  let verse = found(state.scripture.verse(&book, chapter, verse)?, MESSAGE)?;
  Ok(Json(json!({ "verse": verse })))
}

pub async fn search(
  State(state): State<AppState>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
  let query = params
    .query
    .filter(|q| !q.trim().is_empty())
    .ok_or(ApiError::BadRequest("Query parameter is required"))?;
  let results = found(state.scripture.search(&query).await, "Not found")?;
  Ok(Json(results))
}

pub async fn not_found() -> ApiError {
  ApiError::not_found("Not found")
}
