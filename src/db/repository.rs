//! Storage seams used by the services.
//!
//! `PgStore` implements all four traits; tests substitute mocks.

use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{CatalogGame, GameCard, GameRef, RatedGame, SettingsUpdate, User, UserPreferences},
};

/// Users, their preferences, settings and activity bookkeeping
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_chat(&self, chat_id: i64) -> AppResult<Option<User>>;

    /// Returns the user for `chat_id`, creating it on first contact
    async fn upsert_user(&self, chat_id: i64) -> AppResult<User>;

    async fn save_preferences(&self, user_id: i64, preferences: &UserPreferences)
        -> AppResult<()>;

    async fn update_settings(&self, user_id: i64, update: &SettingsUpdate) -> AppResult<User>;

    async fn touch_activity(&self, user_id: i64, at: DateTime<Utc>) -> AppResult<()>;

    async fn set_dialog_state(&self, user_id: i64, state: &str) -> AppResult<()>;

    /// Users with notifications enabled who are idle in the main menu
    async fn notification_candidates(&self) -> AppResult<Vec<User>>;

    /// Users outside the main menu whose last activity predates `cutoff`
    async fn stale_sessions(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<User>>;

    /// Returns the user to the main menu unless they were active at or after `cutoff`.
    /// `false` when the user became active again in the meantime.
    async fn reset_stale_session(&self, user_id: i64, cutoff: DateTime<Utc>) -> AppResult<bool>;

    async fn mark_notified(&self, user_id: i64, at: DateTime<Utc>) -> AppResult<()>;
}

/// Per-user recommendation pool and viewed history
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PoolRepository: Send + Sync {
    /// Atomically drops the user's pool and fills it with up to `limit` fresh candidates
    async fn replace_pool(
        &self,
        user_id: i64,
        preferences: &UserPreferences,
        limit: i64,
    ) -> AppResult<Vec<i64>>;

    async fn pool_cards(&self, user_id: i64, limit: i64) -> AppResult<Vec<GameCard>>;

    async fn pool_size(&self, user_id: i64) -> AppResult<i64>;

    async fn mark_viewed(&self, user_id: i64, game_ids: &[i64]) -> AppResult<()>;

    async fn evict(&self, user_id: i64, game_ids: &[i64]) -> AppResult<u64>;

    async fn forget_viewed_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// Favorites, ratings and dismissals
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn add_favorite(&self, user_id: i64, game_id: i64) -> AppResult<bool>;
    async fn remove_favorite(&self, user_id: i64, game_id: i64) -> AppResult<bool>;
    async fn favorites(&self, user_id: i64) -> AppResult<Vec<GameRef>>;

    async fn upsert_rating(&self, user_id: i64, game_id: i64, rating: i16) -> AppResult<()>;
    async fn remove_rating(&self, user_id: i64, game_id: i64) -> AppResult<bool>;
    async fn ratings(&self, user_id: i64) -> AppResult<Vec<RatedGame>>;

    async fn add_dismissed(&self, user_id: i64, game_id: i64) -> AppResult<bool>;
    async fn remove_dismissed(&self, user_id: i64, game_id: i64) -> AppResult<bool>;
    async fn dismissed(&self, user_id: i64) -> AppResult<Vec<GameRef>>;
}

/// The local catalog mirror
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Inserts a game with its genres and links it to `platform`; existing rows are kept
    async fn upsert_game(&self, game: &CatalogGame, platform: &str) -> AppResult<()>;

    /// Deletes games whose title matches any `ILIKE` pattern or has no Latin/Cyrillic letter
    async fn purge_unwanted(&self, patterns: &[String]) -> AppResult<u64>;

    async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<GameRef>>;

    async fn game_card(&self, game_id: i64) -> AppResult<Option<GameCard>>;
}
