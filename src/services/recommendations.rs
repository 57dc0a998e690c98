use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};

use crate::{
    db::PoolRepository,
    error::{AppError, AppResult},
    models::{GameCard, User},
    services::scheduler::Job,
};

/// Manages the per-user recommendation pool
///
/// The pool lifecycle is: `refill` generates up to `pool_size` unseen
/// candidates, `serve` reads a batch for display, and once the batch has been
/// shown it is moved to the viewed history (`mark_viewed`) and dropped from the
/// pool (`evict_from_pool`). `take` and `deliver` bundle those steps the way
/// the chat flow and the notifier use them.
#[derive(Clone)]
pub struct RecommendationPool {
    store: Arc<dyn PoolRepository>,
    pool_size: i64,
}

impl RecommendationPool {
    pub fn new(store: Arc<dyn PoolRepository>, pool_size: i64) -> Self {
        Self { store, pool_size }
    }

    /// Replaces the user's pool with a fresh random selection of candidates
    ///
    /// Candidates match the user's genres and platforms and are absent from the
    /// rated, favorite, dismissed, viewed and pooled sets. An exhausted catalog
    /// leaves the pool empty.
    #[tracing::instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn refill(&self, user: &User) -> AppResult<Vec<i64>> {
        let game_ids = self
            .store
            .replace_pool(user.id, &user.preferences, self.pool_size)
            .await?;

        if game_ids.is_empty() {
            tracing::info!("No recommendation candidates left for user");
        } else {
            tracing::info!(pool = game_ids.len(), "Recommendation pool refilled");
        }

        Ok(game_ids)
    }

    /// Reads up to `n` pooled games without changing the pool
    pub async fn serve(&self, user_id: i64, n: i64) -> AppResult<Vec<GameCard>> {
        if n < 1 {
            return Err(AppError::InvalidInput(
                "Number of recommendations must be at least 1".to_string(),
            ));
        }

        self.store.pool_cards(user_id, n).await
    }

    pub async fn mark_viewed(&self, user_id: i64, game_ids: &[i64]) -> AppResult<()> {
        self.store.mark_viewed(user_id, game_ids).await
    }

    pub async fn evict_from_pool(&self, user_id: i64, game_ids: &[i64]) -> AppResult<u64> {
        self.store.evict(user_id, game_ids).await
    }

    pub async fn size(&self, user_id: i64) -> AppResult<i64> {
        self.store.pool_size(user_id).await
    }

    /// Serves `n` games, refilling the pool first when it holds fewer than `n`
    pub async fn take(&self, user: &User, n: i64) -> AppResult<Vec<GameCard>> {
        let cards = self.serve(user.id, n).await?;
        if cards.len() as i64 >= n {
            return Ok(cards);
        }

        tracing::debug!(
            user_id = user.id,
            wanted = n,
            available = cards.len(),
            "Pool short, refilling"
        );
        self.refill(user).await?;
        self.serve(user.id, n).await
    }

    /// Records a shown batch: viewed history gains it, the pool loses it
    pub async fn commit(&self, user_id: i64, cards: &[GameCard]) -> AppResult<()> {
        if cards.is_empty() {
            return Ok(());
        }

        let game_ids: Vec<i64> = cards.iter().map(|c| c.id).collect();
        self.mark_viewed(user_id, &game_ids).await?;
        self.evict_from_pool(user_id, &game_ids).await?;
        Ok(())
    }

    /// Takes `n` games and commits them as shown
    pub async fn deliver(&self, user: &User, n: i64) -> AppResult<Vec<GameCard>> {
        let cards = self.take(user, n).await?;
        self.commit(user.id, &cards).await?;
        Ok(cards)
    }

    /// Forgets viewed history older than `cutoff` so those games can come back
    pub async fn forget_viewed_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let removed = self.store.forget_viewed_before(cutoff).await?;
        tracing::info!(removed, cutoff = %cutoff, "Viewed history expired");
        Ok(removed)
    }
}

/// Periodically forgets viewed history older than the retention window
pub struct ViewedExpiry {
    pool: RecommendationPool,
    interval: Duration,
    retention: Duration,
}

impl ViewedExpiry {
    pub fn new(pool: RecommendationPool, interval: Duration, retention: Duration) -> Self {
        Self {
            pool,
            interval,
            retention,
        }
    }
}

#[async_trait::async_trait]
impl Job for ViewedExpiry {
    fn name(&self) -> &'static str {
        "viewed_expiry"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> AppResult<()> {
        let retention = chrono::Duration::from_std(self.retention)
            .map_err(|e| AppError::Internal(format!("Viewed retention out of range: {}", e)))?;
        self.pool
            .forget_viewed_before(Utc::now() - retention)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::MockPoolRepository;

    fn card(id: i64) -> GameCard {
        GameCard {
            id,
            title: format!("Game {}", id),
            release_date: None,
            metascore: None,
            cover_url: None,
            genres: vec!["RPG".to_string()],
            platforms: vec!["PC".to_string()],
        }
    }

    fn pool_with(mock: MockPoolRepository) -> RecommendationPool {
        RecommendationPool::new(Arc::new(mock), 20)
    }

    #[tokio::test]
    async fn test_refill_uses_preferences_and_pool_size() {
        let user = User::fixture(1);
        let mut mock = MockPoolRepository::new();
        mock.expect_replace_pool()
            .withf(|user_id, prefs, limit| {
                *user_id == 1 && prefs.genres == vec!["RPG".to_string()] && *limit == 20
            })
            .times(1)
            .returning(|_, _, _| Ok((1..=20).collect()));

        let ids = pool_with(mock).refill(&user).await.unwrap();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn test_refill_with_exhausted_catalog_returns_empty() {
        let user = User::fixture(1);
        let mut mock = MockPoolRepository::new();
        mock.expect_replace_pool()
            .times(1)
            .returning(|_, _, _| Ok(vec![]));

        let ids = pool_with(mock).refill(&user).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_serve_rejects_non_positive_counts() {
        let pool = pool_with(MockPoolRepository::new());
        let result = pool.serve(1, 0).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_take_does_not_refill_when_pool_is_full_enough() {
        let user = User::fixture(1);
        let mut mock = MockPoolRepository::new();
        mock.expect_pool_cards()
            .times(1)
            .returning(|_, _| Ok(vec![card(1), card(2), card(3)]));
        mock.expect_replace_pool().never();

        let cards = pool_with(mock).take(&user, 3).await.unwrap();
        assert_eq!(cards.len(), 3);
    }

    #[tokio::test]
    async fn test_take_refills_and_rereads_when_short() {
        let user = User::fixture(1);
        let mut mock = MockPoolRepository::new();
        let mut reads = 0;
        mock.expect_pool_cards().times(2).returning(move |_, _| {
            reads += 1;
            if reads == 1 {
                Ok(vec![card(1)])
            } else {
                Ok(vec![card(4), card(5), card(6)])
            }
        });
        mock.expect_replace_pool()
            .times(1)
            .returning(|_, _, _| Ok(vec![4, 5, 6, 7]));

        let cards = pool_with(mock).take(&user, 3).await.unwrap();
        let ids: Vec<i64> = cards.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn test_deliver_moves_exactly_the_served_games() {
        let user = User::fixture(1);
        let mut mock = MockPoolRepository::new();
        mock.expect_pool_cards()
            .times(1)
            .returning(|_, _| Ok(vec![card(10), card(11), card(12)]));
        mock.expect_mark_viewed()
            .withf(|user_id, ids| *user_id == 1 && ids == [10, 11, 12])
            .times(1)
            .returning(|_, _| Ok(()));
        mock.expect_evict()
            .withf(|user_id, ids| *user_id == 1 && ids == [10, 11, 12])
            .times(1)
            .returning(|_, ids| Ok(ids.len() as u64));

        let cards = pool_with(mock).deliver(&user, 3).await.unwrap();
        assert_eq!(cards.len(), 3);
    }

    #[tokio::test]
    async fn test_deliver_with_empty_pool_commits_nothing() {
        let user = User::fixture(1);
        let mut mock = MockPoolRepository::new();
        mock.expect_pool_cards().times(2).returning(|_, _| Ok(vec![]));
        mock.expect_replace_pool()
            .times(1)
            .returning(|_, _, _| Ok(vec![]));
        mock.expect_mark_viewed().never();
        mock.expect_evict().never();

        let cards = pool_with(mock).deliver(&user, 3).await.unwrap();
        assert!(cards.is_empty());
    }

    #[tokio::test]
    async fn test_database_errors_propagate() {
        let user = User::fixture(1);
        let mut mock = MockPoolRepository::new();
        mock.expect_pool_cards()
            .returning(|_, _| Err(AppError::Database(sqlx::Error::PoolTimedOut)));

        let result = pool_with(mock).deliver(&user, 2).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_viewed_expiry_uses_retention_cutoff() {
        let mut mock = MockPoolRepository::new();
        mock.expect_forget_viewed_before()
            .withf(|cutoff| {
                let age = Utc::now() - *cutoff;
                let retention = chrono::Duration::days(3);
                age >= retention && age < retention + chrono::Duration::minutes(1)
            })
            .times(1)
            .returning(|_| Ok(12));

        let job = ViewedExpiry::new(
            pool_with(mock),
            Duration::from_secs(3600),
            Duration::from_secs(3 * 86_400),
        );
        job.run().await.unwrap();
        assert_eq!(job.name(), "viewed_expiry");
    }
}
