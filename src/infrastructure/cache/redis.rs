use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Pool};

use crate::domain::{ports::Cache, CacheKey, PipelineError};

/// Redis-backed cache shared across processes. TTLs map to SETEX; a zero
/// TTL deletes the key instead, since SETEX rejects 0 and the entry must
/// read as absent afterwards even if an older value was live.
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, PipelineError> {
        self.pool
            .get()
            .await
            .map_err(|e| PipelineError::internal(format!("redis pool: {e}")))
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, PipelineError> {
        let mut conn = self.conn().await?;
        conn.get(key.storage_key())
            .await
            .map_err(|e| PipelineError::internal(format!("redis get: {e}")))
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Duration,
    ) -> Result<(), PipelineError> {
        let mut conn = self.conn().await?;

        if ttl.is_zero() {
            return conn
                .del::<_, ()>(key.storage_key())
                .await
                .map_err(|e| PipelineError::internal(format!("redis del: {e}")));
        }

        conn.set_ex::<_, _, ()>(key.storage_key(), value, ttl.as_secs())
            .await
            .map_err(|e| PipelineError::internal(format!("redis set: {e}")))
    }
}
