//! The cache contract and physical key derivation.

use std::hash::Hasher;
use std::path::PathBuf;

use async_trait::async_trait;
use twox_hash::XxHash64;

/// Errors raised by cache implementations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache root folder could not be created or accessed.
    #[error("failed to prepare cache folder {path}: {source}")]
    Folder {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A record with this physical key already holds a value.
    ///
    /// A genuine hash collision and an accidental rewrite of the same
    /// identity are indistinguishable here; both refuse the write.
    #[error("refusing to overwrite cache record {key}")]
    WriteConflict { key: String },

    /// Reading or writing a record failed.
    #[error("cache I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A write-once keyed text store.
///
/// Keys are opaque identity strings (video links); implementations store
/// records under the derived [`physical_key`]. Once a physical key holds
/// a value, a second `set` always fails with
/// [`CacheError::WriteConflict`], whatever the new value is.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
}

/// Derives the record name for an identity: the 64-bit xxHash of the
/// identity bytes, rendered as lowercase hex.
pub fn physical_key(identity: &str) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(identity.as_bytes());
    format!("{:x}", hasher.finish())
}
