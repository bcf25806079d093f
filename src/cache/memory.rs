use super::{CachePlugin, CacheResult, CacheValue, error::CacheError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory cache plugin
///
/// `MemoryCache` keeps values in a `HashMap` wrapped in `Arc<RwLock<_>>`.
/// Cloning a `MemoryCache` yields another handle to the same storage, which is
/// how tests and callers inspect what the engine wrote through.
///
/// ## Performance Characteristics
///
/// - **Reads**: Concurrent reads with shared locks
/// - **Writes**: Exclusive writes with write locks
/// - **Memory**: Grows without bound, nothing is evicted
#[derive(Default, Clone)]
pub struct MemoryCache {
    data: Arc<RwLock<HashMap<String, CacheValue>>>,
}

impl MemoryCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> CacheResult<usize> {
        let data = self
            .data
            .read()
            .map_err(|_| CacheError::lock_error("Failed to acquire read lock on cache"))?;
        Ok(data.len())
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> CacheResult<bool> {
        self.len().map(|len| len == 0)
    }

    /// All cached keys, in no particular order
    pub fn keys(&self) -> CacheResult<Vec<String>> {
        let data = self
            .data
            .read()
            .map_err(|_| CacheError::lock_error("Failed to acquire read lock on cache"))?;
        Ok(data.keys().cloned().collect())
    }

    /// Remove every entry
    pub fn clear(&self) -> CacheResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|_| CacheError::lock_error("Failed to acquire write lock on cache"))?;
        data.clear();
        Ok(())
    }
}

#[async_trait]
impl CachePlugin for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheValue>> {
        let data = self
            .data
            .read()
            .map_err(|_| CacheError::lock_error("Failed to acquire read lock on cache"))?;
        Ok(data.get(key).cloned())
    }

    async fn set(&self, key: &str, value: CacheValue) -> CacheResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|_| CacheError::lock_error("Failed to acquire write lock on cache"))?;
        data.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|_| CacheError::lock_error("Failed to acquire write lock on cache"))?;
        data.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachePluginExt;

    #[tokio::test]
    async fn test_new_cache_is_empty() {
        let cache = MemoryCache::new();
        assert_eq!(cache.len().unwrap(), 0);
        assert!(cache.is_empty().unwrap());
        assert!(cache.get("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_overwrites_existing_value() {
        let cache = MemoryCache::new();

        cache.set_as("user:1", "initial".to_string()).await.unwrap();
        cache.set_as("user:1", "updated".to_string()).await.unwrap();

        assert_eq!(
            cache.get_as::<String>("user:1").await.unwrap().as_deref(),
            Some("updated")
        );
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_existing_and_missing_keys() {
        let cache = MemoryCache::new();
        cache.set_as("user:1", 1i32).await.unwrap();

        cache.delete("user:1").await.unwrap();
        assert!(cache.get("user:1").await.unwrap().is_none());

        // Deleting an absent key is not an error
        cache.delete("user:1").await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let cache1 = MemoryCache::new();
        let cache2 = cache1.clone();

        cache1.set_as("shared", 42u8).await.unwrap();
        assert_eq!(cache2.get_as::<u8>("shared").await.unwrap(), Some(42));

        cache2.clear().unwrap();
        assert!(cache1.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_keys_lists_all_entries() {
        let cache = MemoryCache::new();
        cache.set_as("a", 1i32).await.unwrap();
        cache.set_as("b", 2i32).await.unwrap();

        let mut keys = cache.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_writers_for_distinct_keys() {
        let cache = MemoryCache::new();
        let mut handles = Vec::new();

        for task_id in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    cache
                        .set_as(&format!("key_{task_id}_{i}"), i)
                        .await
                        .unwrap();
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.len().unwrap(), 200);
        assert_eq!(cache.get_as::<i32>("key_3_7").await.unwrap(), Some(7));
    }
}
