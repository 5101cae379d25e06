//! JSON API over the scripture service.

mod error;
mod handlers;
mod middleware;

use axum::{middleware as axum_middleware, routing::get, Router};

use crate::scripture::ScriptureService;

#[derive(Clone)]
pub struct AppState {
  pub scripture: ScriptureService,
}

pub fn build_router(state: AppState) -> Router {
  let api = Router::new()
    .route("/health", get(handlers::health))
    .route("/versions", get(handlers::list_versions))
    .route("/search", get(handlers::search))
    .route("/books", get(handlers::list_books))
    .route("/books/{book}", get(handlers::show_book))
    .route("/books/{book}/chapters", get(handlers::list_chapters))
    .route("/books/{book}/chapters/{chapter}", get(handlers::show_chapter))
    .route(
      "/books/{book}/chapters/{chapter}/verses",
      get(handlers::list_verses),
    )
    .route(
      "/books/{book}/chapters/{chapter}/verses/{verse}",
      get(handlers::show_verse),
    );

  Router::new()
    .nest("/api/v1", api)
    .fallback(handlers::not_found)
    .with_state(state)
    .layer(axum_middleware::from_fn(middleware::log_requests))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheLayer, MemoryStorage};
  use crate::db::{Database, NewBook, ResourceDirectory};
  use crate::engine::testing::{spawn_engine, unreachable_engine};
  use crate::engine::EngineClient;
  use crate::config::EngineConfig;
  use axum::body::Body;
  use axum::http::{Request, StatusCode};
  use http_body_util::BodyExt;
  use serde_json::{json, Value};
  use std::sync::Arc;
  use tower::ServiceExt;

  fn directory() -> ResourceDirectory {
    let directory = ResourceDirectory::new(Database::open_in_memory().unwrap());
    let book_id = directory
      .insert_book(&NewBook {
        name: "Genesis".to_string(),
        abbreviation: "Gen".to_string(),
        number: 1,
      })
      .unwrap();
    let chapter_id = directory.insert_chapter(book_id, 1).unwrap();
    directory.insert_verse(chapter_id, 1, "In the beginning").unwrap();
    directory
  }

  fn router_for(config: &EngineConfig) -> Router {
    let scripture = ScriptureService::new(
      EngineClient::new(config).unwrap(),
      CacheLayer::new(Arc::new(MemoryStorage::new())),
      directory(),
    );
    build_router(AppState { scripture })
  }

  async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    let response = router
      .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
      .await
      .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  fn engine() -> axum::Router {
    axum::Router::new()
      .route("/health", axum::routing::get(|| async { "ok" }))
      .route(
        "/books",
        axum::routing::get(|| async {
          axum::Json(
            json!({"books": [{"name": "Genesis", "abbreviation": "Gen", "number": 1}]}),
          )
        }),
      )
      .route(
        "/books/{book}/chapters/{chapter}/verses",
        axum::routing::get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
      )
  }

  #[tokio::test]
  async fn test_list_books() {
    let router = router_for(&spawn_engine(engine()).await);
    let (status, body) = get_json(router, "/api/v1/books").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      body,
      json!({"books": [{"name": "Genesis", "abbreviation": "Gen", "number": 1}]})
    );
  }

  #[tokio::test]
  async fn test_chapters_of_unknown_book() {
    let router = router_for(&spawn_engine(engine()).await);
    let (status, body) = get_json(router, "/api/v1/books/XXX/chapters").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Book not found"}));
  }

  #[tokio::test]
  async fn test_verses_degrade_to_empty() {
    let router = router_for(&spawn_engine(engine()).await);
    let (status, body) = get_json(router, "/api/v1/books/Gen/chapters/1/verses").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"verses": []}));
  }

  #[tokio::test]
  async fn test_verses_of_unknown_chapter() {
    let router = router_for(&spawn_engine(engine()).await);
    let (status, body) = get_json(router, "/api/v1/books/Gen/chapters/abc/verses").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Book or chapter not found"}));
  }

  #[tokio::test]
  async fn test_show_routes() {
    let config = spawn_engine(engine()).await;

    let (status, body) = get_json(router_for(&config), "/api/v1/books/Gen").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["abbreviation"], "Gen");

    let (status, body) = get_json(router_for(&config), "/api/v1/books/Gen/chapters/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chapter"]["number"], 1);

    let (status, body) =
      get_json(router_for(&config), "/api/v1/books/Gen/chapters/1/verses/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verse"]["text"], "In the beginning");

    let (status, body) =
      get_json(router_for(&config), "/api/v1/books/Gen/chapters/1/verses/2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Verse not found"}));

    let (status, body) = get_json(router_for(&config), "/api/v1/books/Gen/chapters/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Chapter not found"}));
  }

  #[tokio::test]
  async fn test_health_reports_engine_down() {
    let router = router_for(&unreachable_engine().await);
    let (status, body) = get_json(router, "/api/v1/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
      body,
      json!({"status": {"sword_engine": false, "cache": true, "database": true}})
    );
  }

  #[tokio::test]
  async fn test_health_ok() {
    let router = router_for(&spawn_engine(engine()).await);
    let (status, _) = get_json(router, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
  }

  #[tokio::test]
  async fn test_search_requires_query() {
    let router = router_for(&spawn_engine(engine()).await);
    let (status, body) = get_json(router, "/api/v1/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Query parameter is required"}));
  }

  #[tokio::test]
  async fn test_unknown_route() {
    let router = router_for(&spawn_engine(engine()).await);
    let (status, body) = get_json(router, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Not found"}));
  }
}
