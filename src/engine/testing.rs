//! Stand-in engine servers for tests.

use axum::Router;
use tokio::net::TcpListener;

use crate::config::EngineConfig;

/// Serve `router` on an ephemeral local port and return a config pointing at it.
pub async fn spawn_engine(router: Router) -> EngineConfig {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let port = listener.local_addr().unwrap().port();

  tokio::spawn(async move {
    axum::serve(listener, router).await.unwrap();
  });

  EngineConfig {
    host: "127.0.0.1".to_string(),
    port,
    timeout_secs: 5,
  }
}

/// A config pointing at a port nothing listens on.
pub async fn unreachable_engine() -> EngineConfig {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let port = listener.local_addr().unwrap().port();
  drop(listener);

  EngineConfig {
    host: "127.0.0.1".to_string(),
    port,
    timeout_secs: 1,
  }
}
