use std::{
    collections::HashMap,
    fmt::Display,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;

use crate::error::AppResult;

/// Keys of per-user session entries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// In-progress survey answers of a chat
    Survey(i64),
}

impl Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKey::Survey(chat_id) => write!(f, "survey:{}", chat_id),
        }
    }
}

/// Keyed store for short-lived session data
///
/// Values are opaque JSON strings; every entry expires after its TTL.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &SessionKey) -> AppResult<Option<String>>;

    async fn put(&self, key: &SessionKey, value: String, ttl: Duration) -> AppResult<()>;

    async fn remove(&self, key: &SessionKey) -> AppResult<()>;
}

/// Process-local session store used when no Redis URL is configured
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &SessionKey) -> AppResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        let key = key.to_string();

        match entries.get(&key) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(&key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &SessionKey, value: String, ttl: Duration) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }

    async fn remove(&self, key: &SessionKey) -> AppResult<()> {
        self.entries.lock().await.remove(&key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_display() {
        assert_eq!(SessionKey::Survey(42).to_string(), "survey:42");
    }

    #[tokio::test]
    async fn test_memory_store_round_trip_and_remove() {
        let store = MemorySessionStore::new();
        let key = SessionKey::Survey(1);

        assert_eq!(store.get(&key).await.unwrap(), None);

        store
            .put(&key, "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some("{}".to_string()));

        tokio_test::assert_ok!(store.remove(&key).await);
        assert_eq!(store.get(&key).await.unwrap(), None);

        // Removing an absent key is fine
        tokio_test::assert_ok!(store.remove(&key).await);
    }

    #[tokio::test]
    async fn test_memory_store_expires_entries() {
        let store = MemorySessionStore::new();
        let key = SessionKey::Survey(2);

        store
            .put(&key, "draft".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.get(&key).await.unwrap(), None);
    }
}
