//! # Response Cache
//!
//! A small key-value cache for storefront reads. Values are JSON strings.
//!
//! ```text
//! GET /api/front/products ──► get_or_insert_json("front:products:...")
//!                               ├── hit  ──► deserialize, return
//!                               └── miss ──► load from SQLite, set(ttl), return
//!
//! product / discount / category write ──► delete_prefix("front:")
//! ```
//!
//! Cache failures never fail a request; they are logged and the value is
//! loaded from the database.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::ApiResult;

/// Prefix shared by every storefront key.
pub const FRONT_PREFIX: &str = "front:";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// A key-value store with per-entry TTLs.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = CacheResult<Option<String>>> + Send;

    fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = CacheResult<()>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = CacheResult<()>> + Send;

    /// Deletes every key starting with `prefix`.
    fn delete_prefix(&self, prefix: &str) -> impl Future<Output = CacheResult<()>> + Send;
}

// =============================================================================
// In-process backend
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, (String, Instant)>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache::default()
    }
}

impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<()> {
        self.entries
            .write()
            .await
            .retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}

// =============================================================================
// Redis backend
// =============================================================================

#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(RedisCache { connection })
    }
}

impl Cache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let keys: Vec<String> = conn.keys(format!("{prefix}*")).await?;
        if !keys.is_empty() {
            let _: () = conn.del(keys).await?;
        }
        Ok(())
    }
}

// =============================================================================
// AppCache
// =============================================================================

/// The backend chosen at startup.
#[derive(Clone)]
pub enum AppCache {
    Memory(MemoryCache),
    Redis(RedisCache),
}

impl Cache for AppCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match self {
            AppCache::Memory(cache) => cache.get(key).await,
            AppCache::Redis(cache) => cache.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        match self {
            AppCache::Memory(cache) => cache.set(key, value, ttl).await,
            AppCache::Redis(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        match self {
            AppCache::Memory(cache) => cache.delete(key).await,
            AppCache::Redis(cache) => cache.delete(key).await,
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<()> {
        match self {
            AppCache::Memory(cache) => cache.delete_prefix(prefix).await,
            AppCache::Redis(cache) => cache.delete_prefix(prefix).await,
        }
    }
}

impl AppCache {
    /// Drops every cached storefront response.
    pub async fn invalidate_front(&self) {
        if let Err(e) = self.delete_prefix(FRONT_PREFIX).await {
            warn!(error = %e, "Failed to invalidate storefront cache");
        }
    }
}

/// Returns the cached value for `key`, or loads, stores and returns it.
pub async fn get_or_insert_json<C, T, F, Fut>(
    cache: &C,
    key: &str,
    ttl: Duration,
    load: F,
) -> ApiResult<T>
where
    C: Cache,
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "Cache hit");
                return Ok(value);
            }
            Err(e) => warn!(key, error = %e, "Discarding unreadable cache entry"),
        },
        Ok(None) => {}
        Err(e) => warn!(key, error = %e, "Cache read failed"),
    }

    let value = load().await?;

    match serde_json::to_string(&value) {
        Ok(raw) => {
            if let Err(e) = cache.set(key, raw, ttl).await {
                warn!(key, error = %e, "Cache write failed");
            }
        }
        Err(e) => warn!(key, error = %e, "Failed to serialize cache entry"),
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_ttl_and_prefix() {
        let cache = MemoryCache::new();
        cache.set("front:a", "1".to_string(), Duration::from_secs(60)).await.unwrap();
        cache.set("front:b", "2".to_string(), Duration::from_secs(60)).await.unwrap();
        cache.set("other", "3".to_string(), Duration::from_secs(60)).await.unwrap();
        cache.set("gone", "4".to_string(), Duration::ZERO).await.unwrap();

        assert_eq!(cache.get("front:a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(cache.get("gone").await.unwrap(), None);

        cache.delete_prefix("front:").await.unwrap();
        assert_eq!(cache.get("front:b").await.unwrap(), None);
        assert_eq!(cache.get("other").await.unwrap().as_deref(), Some("3"));

        cache.delete("other").await.unwrap();
        assert_eq!(cache.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_or_insert_json_loads_once() {
        let cache = AppCache::Memory(MemoryCache::new());
        let ttl = Duration::from_secs(60);

        let first: Vec<i64> =
            get_or_insert_json(&cache, "front:k", ttl, || async { Ok(vec![1, 2]) })
                .await
                .unwrap();
        let second: Vec<i64> = get_or_insert_json(&cache, "front:k", ttl, || async {
            Err(crate::error::ApplicationError::internal("loader must not run on a hit"))
        })
        .await
        .unwrap();

        assert_eq!(first, second);

        cache.invalidate_front().await;
        assert_eq!(cache.get("front:k").await.unwrap(), None);
    }
}
