use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::{ports::Cache, CacheKey, PipelineError};

/// In-process cache for tests and single-process deployments. Entries expire
/// lazily on access; capacity is unbounded, matching the TTL-only contract.
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, PipelineError> {
        let storage_key = key.storage_key();

        let expired = {
            let entries = self
                .entries
                .read()
                .map_err(|e| PipelineError::internal(e.to_string()))?;
            match entries.get(&storage_key) {
                Some((value, expires_at)) if Instant::now() < *expires_at => {
                    return Ok(Some(value.clone()));
                }
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            let mut entries = self
                .entries
                .write()
                .map_err(|e| PipelineError::internal(e.to_string()))?;
            entries.remove(&storage_key);
        }

        Ok(None)
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Duration,
    ) -> Result<(), PipelineError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| PipelineError::internal(e.to_string()))?;

        if ttl.is_zero() {
            // Already expired on arrival: equivalent to never storing it.
            entries.remove(&key.storage_key());
            return Ok(());
        }

        entries.insert(
            key.storage_key(),
            (value.to_string(), Instant::now() + ttl),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = InMemoryCache::new();
        let key = CacheKey::retrieval("What is the PTO policy?", 3);

        cache
            .set(&key, "cached value", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            cache.get(&key).await.unwrap().as_deref(),
            Some("cached value")
        );
    }

    #[tokio::test]
    async fn test_zero_ttl_is_absent() {
        let cache = InMemoryCache::new();
        let key = CacheKey::completion("query", "context");

        cache.set(&key, "value", Duration::ZERO).await.unwrap();

        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_evicts_live_entry() {
        let cache = InMemoryCache::new();
        let key = CacheKey::completion("query", "context");

        cache
            .set(&key, "stale", Duration::from_secs(60))
            .await
            .unwrap();
        cache.set(&key, "rebuilt", Duration::ZERO).await.unwrap();

        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = InMemoryCache::new();
        let key = CacheKey::completion("query", "context");

        cache
            .set(&key, "value", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;

        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let cache = InMemoryCache::new();
        let key = CacheKey::retrieval("query", 3);

        cache
            .set(&key, "old", Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set(&key, "new", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let cache = InMemoryCache::new();
        let key = CacheKey::retrieval("never stored", 3);

        assert!(cache.get(&key).await.unwrap().is_none());
    }
}
