use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use color_eyre::Report;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
  pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
  NotFound(&'static str),
  BadRequest(&'static str),
  /// The engine failed on a call we can't degrade
  BadGateway(String),
  Internal(Report),
}

impl ApiError {
  pub fn not_found(message: &'static str) -> Self {
    Self::NotFound(message)
  }

  fn status(&self) -> StatusCode {
    match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<Report> for ApiError {
  fn from(report: Report) -> Self {
    Self::Internal(report)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match self {
      Self::NotFound(message) | Self::BadRequest(message) => message.to_string(),
      Self::BadGateway(detail) => detail,
      Self::Internal(report) => {
        error!(target: "sword_proxy::http", error = ?report, "request failed");
        "Internal server error".to_string()
      }
    };
    (status, Json(ApiErrorBody { error: message })).into_response()
  }
}
