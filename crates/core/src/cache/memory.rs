//! In-memory cache, mostly for tests and dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{physical_key, Cache, CacheError};

/// A map-backed cache honoring the same write-once contract as the
/// file-backed one.
#[derive(Debug, Default)]
pub struct MemoryCache {
    records: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.records.read().await.get(&physical_key(key)).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let physical = physical_key(key);
        let mut records = self.records.write().await;
        if records.contains_key(&physical) {
            return Err(CacheError::WriteConflict { key: physical });
        }
        records.insert(physical, value.to_string());
        Ok(())
    }
}
