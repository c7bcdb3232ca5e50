//! Error types for caption extraction.

use thiserror::Error;

/// Errors raised while running the caption extractor.
///
/// A nonzero exit status of the extractor is deliberately *not* an
/// error; whatever output was captured is accepted as-is.
#[derive(Debug, Error)]
pub enum SubtitleError {
    /// The extractor process could not be spawned.
    #[error("failed to spawn caption extractor: {source}")]
    Spawn { source: std::io::Error },

    /// Reading the extractor's output pipe failed.
    #[error("failed reading caption output: {source}")]
    Read { source: std::io::Error },

    /// Waiting for the extractor to terminate failed.
    #[error("failed waiting for caption extractor: {source}")]
    Wait { source: std::io::Error },
}
