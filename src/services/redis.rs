//! Redis cache
//!
//! Thin JSON-over-Redis key/value cache with a shared key prefix and default TTL.
//! Used for lookups that are slow upstream and safe to serve stale.

use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use crate::config::settings::RedisConfig;
use crate::utils::errors::{Result, SportsHubError};

#[derive(Clone, Debug)]
pub struct RedisCache {
    client: Client,
    config: RedisConfig,
}

impl RedisCache {
    pub fn new(config: RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str()).map_err(SportsHubError::Redis)?;
        Ok(Self { client, config })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(SportsHubError::Redis)
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.prefix, key)
    }

    /// Store `value` as JSON, expiring after `ttl_seconds` or the configured default
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) -> Result<()> {
        let mut conn = self.connection().await?;
        let serialized = serde_json::to_string(value)?;
        let full_key = self.full_key(key);
        let ttl = ttl_seconds.unwrap_or(self.config.ttl_seconds);

        let _: () = conn.set_ex(&full_key, serialized, ttl).await?;
        debug!(key = %full_key, ttl = ttl, "Value cached");
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection().await?;
        let full_key = self.full_key(key);

        let cached: Option<String> = conn.get(&full_key).await?;
        match cached {
            Some(data) => {
                debug!(key = %full_key, "Cache hit");
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => {
                debug!(key = %full_key, "Cache miss");
                Ok(None)
            }
        }
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let deleted: i32 = conn.del(self.full_key(key)).await?;
        Ok(deleted > 0)
    }

    /// PING the server
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_prefixed() {
        let cache = RedisCache::new(RedisConfig {
            url: "redis://127.0.0.1:6379".to_string(),
            prefix: "sportshub:".to_string(),
            ttl_seconds: 60,
        })
        .unwrap();
        assert_eq!(cache.full_key("identity:123"), "sportshub:identity:123");
    }

    #[test]
    fn test_rejects_malformed_url() {
        let result = RedisCache::new(RedisConfig {
            url: "not a url".to_string(),
            prefix: String::new(),
            ttl_seconds: 60,
        });
        assert!(result.is_err());
    }
}
