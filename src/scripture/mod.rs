//! Scripture access built from the engine client, the cache layer and the
//! resource directory.

mod keys;
mod outcome;
mod service;

#[allow(unused_imports)]
pub use keys::ResourceKey;
pub use outcome::{Outcome, Resource};
pub use service::{HealthStatus, ScriptureService};
