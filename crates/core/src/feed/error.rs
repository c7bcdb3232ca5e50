//! Error types for feed parsing and serialization.

use thiserror::Error;

/// Errors raised while parsing or re-emitting the feed document.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The input was not well-formed XML.
    #[error("feed XML is malformed: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An entry lacks a field the pipeline needs.
    #[error("feed entry {index} has no {field}")]
    MissingField { index: usize, field: &'static str },

    /// Re-serializing the feed failed.
    #[error("feed serialization failed: {reason}")]
    Serialize { reason: String },
}
