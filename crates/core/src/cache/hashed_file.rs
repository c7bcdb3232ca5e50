//! Filesystem-backed cache: one file per record, named by physical key.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::store::{physical_key, Cache, CacheError};

/// A cache rooted at a folder, with one file per record.
///
/// The file name is the physical key of the record's identity; the file
/// content is the value followed by a trailing newline. The folder is
/// created (recursively) at construction.
#[derive(Debug)]
pub struct HashedFileCache {
    folder: PathBuf,
}

impl HashedFileCache {
    pub fn new(folder: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let folder = folder.into();
        std::fs::create_dir_all(&folder).map_err(|source| CacheError::Folder {
            path: folder.clone(),
            source,
        })?;
        Ok(Self { folder })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.folder.join(physical_key(key))
    }
}

#[async_trait]
impl Cache for HashedFileCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.record_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let value = content.strip_suffix('\n').unwrap_or(&content);
                Ok(Some(value.to_string()))
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let path = self.record_path(key);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => {
                return Err(CacheError::WriteConflict {
                    key: physical_key(key),
                });
            }
            Ok(false) => {}
            Err(source) => return Err(CacheError::Io { path, source }),
        }
        tokio::fs::write(&path, format!("{value}\n"))
            .await
            .map_err(|source| CacheError::Io { path, source })
    }
}
