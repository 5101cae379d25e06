use crate::config::EngineConfig;
use crate::engine::api_types::{
  BooksResponse, ChaptersResponse, ListEnvelope, VersesResponse, VersionsResponse,
};
use crate::engine::response::{EngineResponse, FailureReason};
use crate::engine::types::{EngineBook, EngineChapter, EngineVerse, EngineVersion};
use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

/// HTTP client for the SWORD engine.
///
/// `fetch_*` methods report failures as `EngineResponse::Failure`, already
/// logged. Callers that serve listings degrade a failure to an empty list
/// (see `ScriptureService`); `list_versions` does so directly.
#[derive(Clone)]
pub struct EngineClient {
  http: reqwest::Client,
  base_url: Url,
}

impl EngineClient {
  pub fn new(config: &EngineConfig) -> Result<Self> {
    let base_url = Url::parse(&config.base_url())
      .map_err(|e| eyre!("Invalid engine URL {}: {}", config.base_url(), e))?;

    let http = reqwest::Client::builder()
      .timeout(config.timeout())
      .build()
      .map_err(|e| eyre!("Failed to create engine client: {}", e))?;

    debug!(base_url = %base_url, "engine client initialized");
    Ok(Self { http, base_url })
  }

  /// Probe `/health`. Only a 200 counts as healthy.
  pub async fn health_check(&self) -> bool {
    let url = match self.url("/health") {
      Ok(url) => url,
      Err(_) => return false,
    };
    match self.http.get(url).send().await {
      Ok(response) => response.status() == StatusCode::OK,
      Err(e) => {
        debug!(error = %e, "engine health check failed");
        false
      }
    }
  }

  pub async fn fetch_books(&self) -> EngineResponse<Vec<EngineBook>> {
    self.get_list::<BooksResponse>("/books").await
  }

  pub async fn fetch_chapters(&self, book_id: i64) -> EngineResponse<Vec<EngineChapter>> {
    self
      .get_list::<ChaptersResponse>(&format!("/books/{}/chapters", book_id))
      .await
  }

  pub async fn fetch_verses(
    &self,
    book_id: i64,
    chapter_id: i64,
  ) -> EngineResponse<Vec<EngineVerse>> {
    self
      .get_list::<VersesResponse>(&format!(
        "/books/{}/chapters/{}/verses",
        book_id, chapter_id
      ))
      .await
  }

  pub async fn fetch_versions(&self) -> EngineResponse<Vec<EngineVersion>> {
    self.get_list::<VersionsResponse>("/versions").await
  }

  pub async fn list_versions(&self) -> Vec<EngineVersion> {
    or_empty(self.fetch_versions().await)
  }

  /// Full-text search; the body is passed through untouched.
  pub async fn search(&self, query: &str) -> EngineResponse<Value> {
    let mut url = match self.url("/search") {
      Ok(url) => url,
      Err(reason) => return EngineResponse::Failure(reason),
    };
    url.query_pairs_mut().append_pair("query", query);

    self.get(url).await.and_then_decode(|body| {
      serde_json::from_slice(&body).map_err(|e| FailureReason::Decode(e.to_string()))
    })
  }

  async fn get_list<E: ListEnvelope>(&self, path: &str) -> EngineResponse<Vec<E::Item>> {
    let url = match self.url(path) {
      Ok(url) => url,
      Err(reason) => return EngineResponse::Failure(reason),
    };

    let response = self.get(url).await.and_then_decode(|body| {
      serde_json::from_slice::<E>(&body)
        .map(E::into_items)
        .map_err(|e| FailureReason::Decode(e.to_string()))
    });

    match &response {
      EngineResponse::Success(items) => {
        debug!(path, field = E::FIELD, count = items.len(), "engine list fetched")
      }
      EngineResponse::Failure(reason) => {
        error!(path, field = E::FIELD, "Failed to get {}: {}", E::FIELD, reason)
      }
    }
    response
  }

  /// Issue a single GET. Transport errors and non-2xx statuses both become failures.
  async fn get(&self, url: Url) -> EngineResponse<Vec<u8>> {
    debug!(url = %url, "engine request");

    let response = match self.http.get(url.clone()).send().await {
      Ok(response) => response,
      Err(e) => return EngineResponse::Failure(FailureReason::Transport(e.to_string())),
    };

    let status = response.status();
    debug!(url = %url, status = status.as_u16(), "engine response");

    let body = match response.bytes().await {
      Ok(body) => body.to_vec(),
      Err(e) => return EngineResponse::Failure(FailureReason::Transport(e.to_string())),
    };

    if status.is_success() {
      EngineResponse::Success(body)
    } else {
      EngineResponse::Failure(FailureReason::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(&body).into_owned(),
      })
    }
  }

  fn url(&self, path: &str) -> std::result::Result<Url, FailureReason> {
    self
      .base_url
      .join(path)
      .map_err(|e| FailureReason::Transport(format!("invalid path {}: {}", path, e)))
  }
}

fn or_empty<T>(response: EngineResponse<Vec<T>>) -> Vec<T> {
  match response {
    EngineResponse::Success(items) => items,
    EngineResponse::Failure(_) => Vec::new(),
  }
}

impl EngineResponse<Vec<u8>> {
  fn and_then_decode<U, F>(self, decode: F) -> EngineResponse<U>
  where
    F: FnOnce(Vec<u8>) -> std::result::Result<U, FailureReason>,
  {
    match self {
      EngineResponse::Success(body) => decode(body).into(),
      EngineResponse::Failure(reason) => EngineResponse::Failure(reason),
    }
  }
}
