//! Fan-out of entry pipelines over the whole feed.

mod runner;
mod types;

pub use runner::{Orchestrator, DESCRIPTION_MARKER};
pub use types::RunOutcome;
