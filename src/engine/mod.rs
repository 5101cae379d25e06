pub mod api_types;
pub mod client;
pub mod response;
#[cfg(test)]
pub mod testing;
pub mod types;

pub use client::EngineClient;
pub use response::{EngineResponse, FailureReason};
pub use types::{EngineBook, EngineChapter, EngineVerse, EngineVersion};
