use redis::{Client, RedisError, aio::ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// JSON-valued Redis cache. Every caller treats it as optional: a miss or
/// an error falls through to the database.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self, RedisError> {
        let client = Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }

    /// Get a value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> redis::RedisResult<Option<T>> {
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.connection.clone())
            .await?;

        match value {
            Some(v) => {
                let deserialized = serde_json::from_str(&v).map_err(|e| {
                    RedisError::from((
                        redis::ErrorKind::TypeError,
                        "Deserialization error",
                        e.to_string(),
                    ))
                })?;
                Ok(Some(deserialized))
            }
            None => Ok(None),
        }
    }

    /// Set a value with a TTL
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> redis::RedisResult<()> {
        let serialized = serde_json::to_string(value).map_err(|e| {
            RedisError::from((
                redis::ErrorKind::TypeError,
                "Serialization error",
                e.to_string(),
            ))
        })?;

        redis::cmd("SET")
            .arg(key)
            .arg(serialized)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut self.connection.clone())
            .await
    }

    /// Delete a key from cache
    pub async fn delete(&self, key: &str) -> redis::RedisResult<()> {
        redis::cmd("DEL")
            .arg(key)
            .query_async(&mut self.connection.clone())
            .await
    }

    /// Delete a key, logging instead of failing. Used after writes; a stale
    /// entry still expires on its TTL.
    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.delete(key).await {
            debug!(key, error = %e, "cache invalidation failed");
        }
    }
}

/// Cache key generators
pub mod keys {
    use uuid::Uuid;

    /// Key for an authenticated user record
    pub fn user(id: Uuid) -> String {
        format!("user:{id}")
    }

    /// Key for a single gig
    pub fn gig(id: Uuid) -> String {
        format!("gig:{id}")
    }
}

/// Time-to-live per cached record kind.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtl {
    pub user: Duration,
    pub gig: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            user: Duration::from_secs(300),
            gig: Duration::from_secs(600),
        }
    }
}

/// Drop a gig record from the cache if caching is enabled.
pub async fn invalidate_gig(cache: Option<&CacheData>, gig_id: Uuid) {
    if let Some(cache) = cache {
        cache.invalidate(&keys::gig(gig_id)).await;
    }
}

/// Wrapper type for Actix-web app data
pub type CacheData = Arc<RedisCache>;
