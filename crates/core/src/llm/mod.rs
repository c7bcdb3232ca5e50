//! Decoding of the chat endpoint's structured response.

mod response;

pub use response::{extract_answer, ResponseParseError};
