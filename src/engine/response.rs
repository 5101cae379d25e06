use std::fmt;

/// Outcome of a single engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineResponse<T> {
  Success(T),
  Failure(FailureReason),
}

/// Why an engine call produced no usable body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
  /// Connection refused, DNS failure, timeout, ...
  Transport(String),
  /// Engine answered with a non-2xx status
  Status { status: u16, body: String },
  /// 2xx with a body we could not decode
  Decode(String),
}

impl fmt::Display for FailureReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Transport(msg) => write!(f, "engine unreachable: {}", msg),
      Self::Status { status, body } => write!(f, "engine returned {}: {}", status, body),
      Self::Decode(msg) => write!(f, "invalid engine response: {}", msg),
    }
  }
}

impl std::error::Error for FailureReason {}

impl<T> EngineResponse<T> {
  pub fn into_result(self) -> Result<T, FailureReason> {
    match self {
      Self::Success(data) => Ok(data),
      Self::Failure(reason) => Err(reason),
    }
  }

  #[allow(dead_code)]
  pub fn is_success(&self) -> bool {
    matches!(self, Self::Success(_))
  }
}

impl<T> From<Result<T, FailureReason>> for EngineResponse<T> {
  fn from(result: Result<T, FailureReason>) -> Self {
    match result {
      Ok(data) => Self::Success(data),
      Err(reason) => Self::Failure(reason),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display() {
    let reason = FailureReason::Status {
      status: 503,
      body: "down".to_string(),
    };
    assert_eq!(reason.to_string(), "engine returned 503: down");
  }

  #[test]
  fn test_into_result() {
    let ok: EngineResponse<u8> = EngineResponse::Success(1);
    assert_eq!(ok.into_result(), Ok(1));

    let failed: EngineResponse<u8> =
      EngineResponse::Failure(FailureReason::Transport("refused".to_string()));
    assert!(failed.into_result().is_err());
  }
}
