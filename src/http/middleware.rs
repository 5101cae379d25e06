use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{error, info, warn};

/// Log one line per request with its status and latency.
pub async fn log_requests(request: Request<Body>, next: Next) -> Response {
  let method = request.method().clone();
  let uri = request.uri().clone();
  let start = Instant::now();

  let response = next.run(request).await;
  let status = response.status();
  let elapsed_ms = start.elapsed().as_millis() as u64;

  if status.is_server_error() {
    error!(
      target: "sword_proxy::http::response",
      status = status.as_u16(),
      method = %method,
      path = %uri.path(),
      query = uri.query().unwrap_or(""),
      elapsed_ms,
      "request failed"
    );
  } else if status.is_client_error() {
    warn!(
      target: "sword_proxy::http::response",
      status = status.as_u16(),
      method = %method,
      path = %uri.path(),
      elapsed_ms,
      "request rejected"
    );
  } else {
    info!(
      target: "sword_proxy::http::response",
      status = status.as_u16(),
      method = %method,
      path = %uri.path(),
      elapsed_ms,
      "request served"
    );
  }

  response
}
