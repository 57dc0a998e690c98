use std::sync::Arc;

use crate::{
    db::LedgerRepository,
    error::{AppError, AppResult},
    models::{GameRef, RatedGame, User},
    services::recommendations::RecommendationPool,
};

/// Highest score a user can give a game
pub const MAX_RATING: i32 = 10;

/// Outcome of a rating submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingChange {
    Saved,
    Removed,
    /// A zero rating for a game the user never rated
    Unchanged,
}

/// Favorites, ratings and dismissals, kept consistent with the pool
#[derive(Clone)]
pub struct InteractionLedger {
    store: Arc<dyn LedgerRepository>,
    pool: RecommendationPool,
}

impl InteractionLedger {
    pub fn new(store: Arc<dyn LedgerRepository>, pool: RecommendationPool) -> Self {
        Self { store, pool }
    }

    /// Returns `false` when the game was already a favorite
    pub async fn add_favorite(&self, user: &User, game_id: i64) -> AppResult<bool> {
        let added = self.store.add_favorite(user.id, game_id).await?;
        self.pool.evict_from_pool(user.id, &[game_id]).await?;

        tracing::info!(user_id = user.id, game_id, added, "Favorite recorded");
        Ok(added)
    }

    pub async fn remove_favorite(&self, user: &User, game_id: i64) -> AppResult<bool> {
        self.store.remove_favorite(user.id, game_id).await
    }

    pub async fn favorites(&self, user: &User) -> AppResult<Vec<GameRef>> {
        self.store.favorites(user.id).await
    }

    /// Applies a score: `0` clears the rating, `1..=10` sets it
    pub async fn rate(&self, user: &User, game_id: i64, value: i32) -> AppResult<RatingChange> {
        match value {
            0 => {
                let removed = self.store.remove_rating(user.id, game_id).await?;
                Ok(if removed {
                    RatingChange::Removed
                } else {
                    RatingChange::Unchanged
                })
            }
            1..=MAX_RATING => {
                // bounded by the match arm
                let rating = value as i16;
                self.store.upsert_rating(user.id, game_id, rating).await?;
                self.pool.evict_from_pool(user.id, &[game_id]).await?;

                tracing::info!(user_id = user.id, game_id, rating, "Rating saved");
                Ok(RatingChange::Saved)
            }
            _ => Err(AppError::InvalidInput(format!(
                "Rating must be between 0 and {}, got {}",
                MAX_RATING, value
            ))),
        }
    }

    pub async fn ratings(&self, user: &User) -> AppResult<Vec<RatedGame>> {
        self.store.ratings(user.id).await
    }

    /// Marks a game as not interesting and regenerates the user's pool
    pub async fn dismiss(&self, user: &User, game_id: i64) -> AppResult<bool> {
        let added = self.store.add_dismissed(user.id, game_id).await?;
        self.pool.refill(user).await?;

        tracing::info!(user_id = user.id, game_id, added, "Game dismissed");
        Ok(added)
    }

    pub async fn remove_dismissed(&self, user: &User, game_id: i64) -> AppResult<bool> {
        self.store.remove_dismissed(user.id, game_id).await
    }

    pub async fn dismissed(&self, user: &User) -> AppResult<Vec<GameRef>> {
        self.store.dismissed(user.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{MockLedgerRepository, MockPoolRepository};

    fn ledger(store: MockLedgerRepository, pool: MockPoolRepository) -> InteractionLedger {
        InteractionLedger::new(
            Arc::new(store),
            RecommendationPool::new(Arc::new(pool), 20),
        )
    }

    #[tokio::test]
    async fn test_favorite_evicts_from_pool() {
        let user = User::fixture(1);
        let mut store = MockLedgerRepository::new();
        store
            .expect_add_favorite()
            .withf(|user_id, game_id| *user_id == 1 && *game_id == 42)
            .times(1)
            .returning(|_, _| Ok(true));
        let mut pool = MockPoolRepository::new();
        pool.expect_evict()
            .withf(|user_id, ids| *user_id == 1 && ids == [42])
            .times(1)
            .returning(|_, _| Ok(1));

        let added = ledger(store, pool).add_favorite(&user, 42).await.unwrap();
        assert!(added);
    }

    #[tokio::test]
    async fn test_repeated_favorite_reports_already_present() {
        let user = User::fixture(1);
        let mut store = MockLedgerRepository::new();
        store.expect_add_favorite().returning(|_, _| Ok(false));
        let mut pool = MockPoolRepository::new();
        pool.expect_evict().returning(|_, _| Ok(0));

        let added = ledger(store, pool).add_favorite(&user, 42).await.unwrap();
        assert!(!added);
    }

    #[tokio::test]
    async fn test_rate_zero_removes_rating() {
        let user = User::fixture(1);
        let mut store = MockLedgerRepository::new();
        store
            .expect_remove_rating()
            .times(1)
            .returning(|_, _| Ok(true));
        store.expect_upsert_rating().never();

        let change = ledger(store, MockPoolRepository::new())
            .rate(&user, 5, 0)
            .await
            .unwrap();
        assert_eq!(change, RatingChange::Removed);
    }

    #[tokio::test]
    async fn test_rate_zero_without_rating_is_unchanged() {
        let user = User::fixture(1);
        let mut store = MockLedgerRepository::new();
        store.expect_remove_rating().returning(|_, _| Ok(false));

        let change = ledger(store, MockPoolRepository::new())
            .rate(&user, 5, 0)
            .await
            .unwrap();
        assert_eq!(change, RatingChange::Unchanged);
    }

    #[tokio::test]
    async fn test_rate_in_range_upserts_and_evicts() {
        let user = User::fixture(1);
        let mut store = MockLedgerRepository::new();
        store
            .expect_upsert_rating()
            .withf(|user_id, game_id, rating| *user_id == 1 && *game_id == 5 && *rating == 8)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut pool = MockPoolRepository::new();
        pool.expect_evict().times(1).returning(|_, _| Ok(1));

        let change = ledger(store, pool).rate(&user, 5, 8).await.unwrap();
        assert_eq!(change, RatingChange::Saved);
    }

    #[tokio::test]
    async fn test_rate_out_of_range_is_rejected() {
        let user = User::fixture(1);
        let ledger = ledger(MockLedgerRepository::new(), MockPoolRepository::new());

        for value in [-1, 11, 100] {
            let result = ledger.rate(&user, 5, value).await;
            assert!(matches!(result, Err(AppError::InvalidInput(_))));
        }
    }

    #[tokio::test]
    async fn test_dismiss_refills_pool() {
        let user = User::fixture(1);
        let mut store = MockLedgerRepository::new();
        store
            .expect_add_dismissed()
            .times(1)
            .returning(|_, _| Ok(true));
        let mut pool = MockPoolRepository::new();
        pool.expect_replace_pool()
            .withf(|user_id, _, limit| *user_id == 1 && *limit == 20)
            .times(1)
            .returning(|_, _, _| Ok(vec![2, 3]));

        let added = ledger(store, pool).dismiss(&user, 9).await.unwrap();
        assert!(added);
    }

    #[tokio::test]
    async fn test_unknown_game_is_not_found() {
        let user = User::fixture(1);
        let mut store = MockLedgerRepository::new();
        store
            .expect_add_favorite()
            .returning(|_, game_id| Err(AppError::NotFound(format!("Game {}", game_id))));
        let mut pool = MockPoolRepository::new();
        pool.expect_evict().never();

        let result = ledger(store, pool).add_favorite(&user, 999).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
