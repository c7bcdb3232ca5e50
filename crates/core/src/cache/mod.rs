//! Write-once keyed text stores for summaries and subtitles.

mod hashed_file;
mod memory;
mod store;

pub use hashed_file::HashedFileCache;
pub use memory::MemoryCache;
pub use store::{physical_key, Cache, CacheError};
