use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{errors::PipelineError, CacheKey};

/// Key/value store with TTL expiry, fronting expensive calls.
///
/// Callers treat writes as fire-and-forget: a failed `set` is logged and
/// swallowed at the call site, never failing the surrounding request. A TTL
/// of zero means the entry is already expired and must be absent on the next
/// `get`. No eviction beyond TTL expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, PipelineError>;
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), PipelineError>;
}
