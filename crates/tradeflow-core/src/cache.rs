//! Product cache capability and its in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::CacheError;

/// Key-value store mapping product ids to product names.
///
/// Implementations are shared read-only across concurrently processed
/// batches, so every method takes `&self`.
#[async_trait]
pub trait ProductCache: Send + Sync {
    /// Look up all keys in one round trip.
    ///
    /// On success the result has exactly one entry per key, in request order,
    /// with `None` for keys that have no value.
    async fn batch_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError>;

    /// Store all entries in one round trip. Later entries win for repeated keys.
    async fn batch_set(&self, entries: &[(String, String)]) -> Result<(), CacheError>;
}

/// Thread-safe in-memory product cache.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryProductCache {
    inner: Arc<tokio::sync::RwLock<HashMap<String, String>>>,
}

impl MemoryProductCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-populated with the given entries.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(map)),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let map = self.inner.read().await;
        map.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[async_trait]
impl ProductCache for MemoryProductCache {
    async fn batch_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        let map = self.inner.read().await;
        Ok(keys.iter().map(|key| map.get(key).cloned()).collect())
    }

    async fn batch_set(&self, entries: &[(String, String)]) -> Result<(), CacheError> {
        let mut map = self.inner.write().await;
        for (key, value) in entries {
            map.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}
