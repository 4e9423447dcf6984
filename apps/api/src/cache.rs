//! Tag-keyed response cache.
//!
//! Cached collections are stored as JSON under tag keys (`global:job`,
//! `user:<id>-saved_job`). Writers revalidate by deleting the tag key. The
//! cache is an optimisation only: every failure falls through to the source.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::StoreError;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Key for data shared by every user.
pub fn global_tag(tag: &str) -> String {
    format!("global:{tag}")
}

/// Key for data owned by one user.
pub fn user_tag(user_id: Uuid, tag: &str) -> String {
    format!("user:{user_id}-{tag}")
}

#[async_trait]
pub trait TagCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Drops the tag so the next read goes to the source.
    async fn revalidate(&self, key: &str) -> Result<(), CacheError>;
}

pub struct RedisTagCache {
    client: redis::Client,
}

impl RedisTagCache {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TagCache for RedisTagCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.get(key).await?)
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn revalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}

/// Reads `key` from the cache, or runs `load` and stores its result.
pub async fn cached_json<T, F, Fut>(
    cache: &dyn TagCache,
    key: &str,
    ttl: Duration,
    load: F,
) -> Result<T, StoreError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("Cache hit for {key}");
                return Ok(value);
            }
            Err(e) => warn!("Discarding undecodable cache entry {key}: {e}"),
        },
        Ok(None) => debug!("Cache miss for {key}"),
        Err(e) => warn!("Cache read for {key} failed, using source: {e}"),
    }

    let value = load().await?;

    match serde_json::to_string(&value) {
        Ok(raw) => {
            if let Err(e) = cache.put(key, &raw, ttl).await {
                warn!("Cache write for {key} failed: {e}");
            }
        }
        Err(e) => warn!("Could not encode {key} for caching: {e}"),
    }
    Ok(value)
}

/// Revalidates `key`, logging instead of failing the caller's write.
pub async fn revalidate_tag(cache: &dyn TagCache, key: &str) {
    match cache.revalidate(key).await {
        Ok(()) => debug!("Revalidated {key}"),
        Err(e) => warn!("Could not revalidate {key}: {e}"),
    }
}
