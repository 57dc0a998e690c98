use redis::AsyncCommands;
use redis::Client;
use std::time::Duration;

use crate::db::session::{SessionKey, SessionStore};
use crate::error::AppResult;

/// Creates a Redis client for survey sessions
///
/// Connections are opened per operation through the multiplexed async API.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis-backed session store
///
/// Entries are written with `SET EX`, so Redis enforces the TTL and a
/// restarted process still sees unfinished surveys.
#[derive(Clone)]
pub struct RedisSessionStore {
    redis_client: Client,
}

impl RedisSessionStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, key: &SessionKey) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key.to_string()).await?;
        Ok(value)
    }

    async fn put(&self, key: &SessionKey, value: String, ttl: Duration) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        // SET EX rejects a zero expiry
        let ttl_secs = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key.to_string(), value, ttl_secs).await?;
        tracing::debug!(key = %key, ttl_secs, "Session entry stored");
        Ok(())
    }

    async fn remove(&self, key: &SessionKey) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(key.to_string()).await?;
        Ok(())
    }
}
