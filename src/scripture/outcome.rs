use crate::engine::FailureReason;

/// Which level of the hierarchy was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
  Book,
  Chapter,
  Verse,
}

/// Result of a request that may name something that doesn't exist.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
  Found(T),
  /// An identifier did not resolve in the local mirror
  NotFound(Resource),
  /// The engine could not answer
  Upstream(FailureReason),
}

impl<T> Outcome<T> {
  #[allow(dead_code)]
  pub fn found(self) -> Option<T> {
    match self {
      Self::Found(data) => Some(data),
      _ => None,
    }
  }
}
