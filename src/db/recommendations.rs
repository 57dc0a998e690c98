use chrono::{DateTime, Utc};

use crate::{
    db::{
        postgres::{GAME_CARD_COLUMNS, GAME_CARD_JOINS},
        PgStore, PoolRepository,
    },
    error::{AppError, AppResult},
    models::{GameCard, UserPreferences},
};

/// Candidate selection for one user.
///
/// `$1` user id, `$2` lower-cased genre names, `$3` catalog platform names,
/// `$4` limit. An empty genre or platform list disables that filter.
const REFILL_POOL: &str = "\
    INSERT INTO recommendations (user_id, game_id) \
    SELECT $1, g.id FROM games g \
    WHERE NOT EXISTS (SELECT 1 FROM rated_games r WHERE r.user_id = $1 AND r.game_id = g.id) \
      AND NOT EXISTS (SELECT 1 FROM favorite_games f WHERE f.user_id = $1 AND f.game_id = g.id) \
      AND NOT EXISTS (SELECT 1 FROM not_interested_games n WHERE n.user_id = $1 AND n.game_id = g.id) \
      AND NOT EXISTS (SELECT 1 FROM viewed_games v WHERE v.user_id = $1 AND v.game_id = g.id) \
      AND NOT EXISTS (SELECT 1 FROM recommendations rec WHERE rec.user_id = $1 AND rec.game_id = g.id) \
      AND (cardinality($2::text[]) = 0 OR EXISTS ( \
            SELECT 1 FROM game_genres gg JOIN genres ge ON ge.id = gg.genre_id \
            WHERE gg.game_id = g.id AND lower(ge.name) = ANY($2))) \
      AND (cardinality($3::text[]) = 0 OR EXISTS ( \
            SELECT 1 FROM game_platforms gp JOIN platforms p ON p.id = gp.platform_id \
            WHERE gp.game_id = g.id AND p.name = ANY($3))) \
    ORDER BY random() \
    LIMIT $4 \
    ON CONFLICT (user_id, game_id) DO NOTHING \
    RETURNING game_id";

#[async_trait::async_trait]
impl PoolRepository for PgStore {
    async fn replace_pool(
        &self,
        user_id: i64,
        preferences: &UserPreferences,
        limit: i64,
    ) -> AppResult<Vec<i64>> {
        let genres: Vec<String> = preferences.genres.iter().map(|g| g.to_lowercase()).collect();
        let platforms = preferences.catalog_platforms();

        let mut tx = self.pool.begin().await?;

        let cleared = sqlx::query("DELETE FROM recommendations WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let game_ids: Vec<i64> = sqlx::query_scalar(REFILL_POOL)
            .bind(user_id)
            .bind(&genres)
            .bind(&platforms)
            .bind(limit)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            user_id,
            cleared,
            inserted = game_ids.len(),
            "Recommendation pool replaced"
        );

        Ok(game_ids)
    }

    async fn pool_cards(&self, user_id: i64, limit: i64) -> AppResult<Vec<GameCard>> {
        let query = format!(
            "SELECT {GAME_CARD_COLUMNS} \
             FROM recommendations r \
             JOIN games g ON g.id = r.game_id \
             {GAME_CARD_JOINS} \
             WHERE r.user_id = $1 \
             GROUP BY g.id, r.created_at \
             ORDER BY r.created_at, g.id \
             LIMIT $2"
        );
        let cards = sqlx::query_as::<_, GameCard>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(cards)
    }

    async fn pool_size(&self, user_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recommendations WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn mark_viewed(&self, user_id: i64, game_ids: &[i64]) -> AppResult<()> {
        if game_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO viewed_games (user_id, game_id, viewed_at) \
             SELECT $1, game_id, now() FROM unnest($2::bigint[]) AS t(game_id) \
             ON CONFLICT (user_id, game_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(game_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::missing_reference(e, format!("One of games {:?}", game_ids)))?;

        Ok(())
    }

    async fn evict(&self, user_id: i64, game_ids: &[i64]) -> AppResult<u64> {
        if game_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM recommendations WHERE user_id = $1 AND game_id = ANY($2)")
            .bind(user_id)
            .bind(game_ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn forget_viewed_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM viewed_games WHERE viewed_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
