//! The YouTube RSS (Atom) feed document and its entries.

mod document;
mod error;

pub use document::{FeedDocument, FeedEntry};
pub use error::FeedError;
