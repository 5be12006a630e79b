//! Redis cache module
//!
//! Holds short-lived snapshots (merged feed lists) so that a failing upstream
//! can still be answered with the last good data. Keys are namespaced with a
//! configurable prefix.

use anyhow::Result;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use tracing::info;

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Prefix prepended to every key
    pub key_prefix: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    /// - `REDIS_KEY_PREFIX`: Key namespace (default: "portfolio")
    pub fn from_env() -> Result<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let key_prefix =
            std::env::var("REDIS_KEY_PREFIX").unwrap_or_else(|_| "portfolio".to_string());

        Ok(RedisConfig { url, key_prefix })
    }
}

/// Redis client handle
///
/// Opening the client does not connect; each operation acquires a multiplexed
/// connection, so an unreachable server surfaces as an error per call.
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
    key_prefix: String,
}

impl RedisPool {
    /// Initialize a new Redis client
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.clone())?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool {
            client,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }

    /// Set a key-value pair in Redis with optional TTL
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let key = self.key(key);

        if let Some(ttl) = ttl_seconds {
            let _: () = conn.set_ex(key, value, ttl).await?;
        } else {
            let _: () = conn.set(key, value).await?;
        }

        Ok(())
    }

    /// Get a value from Redis by key
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    /// Delete a key from Redis
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let _: u64 = conn.del(self.key(key)).await?;
        Ok(())
    }

    /// Store a value serialized as JSON
    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<u64>,
    ) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        self.set(key, &payload, ttl_seconds).await
    }

    /// Load a JSON value; a payload that no longer deserializes counts as a miss
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(payload) => match serde_json::from_str(&payload) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_prefixed() {
        let pool = RedisPool::new(&RedisConfig {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "portfolio".to_string(),
        })
        .unwrap();

        assert_eq!(pool.key("feed:tools"), "portfolio:feed:tools");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = RedisPool::new(&RedisConfig {
            url: "not a url".to_string(),
            key_prefix: "portfolio".to_string(),
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_errors() {
        let pool = RedisPool::new(&RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            key_prefix: "portfolio".to_string(),
        })
        .unwrap();

        assert!(pool.get("anything").await.is_err());
    }
}
