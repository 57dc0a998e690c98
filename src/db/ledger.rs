use crate::{
    db::{LedgerRepository, PgStore},
    error::{AppError, AppResult},
    models::{GameRef, RatedGame},
};

/// Relation tables that store a plain (user, game) pair
#[derive(Debug, Clone, Copy)]
enum PairTable {
    Favorites,
    Dismissed,
}

impl PairTable {
    fn name(&self) -> &'static str {
        match self {
            PairTable::Favorites => "favorite_games",
            PairTable::Dismissed => "not_interested_games",
        }
    }
}

impl PgStore {
    async fn insert_pair(&self, table: PairTable, user_id: i64, game_id: i64) -> AppResult<bool> {
        let query = format!(
            "INSERT INTO {} (user_id, game_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, game_id) DO NOTHING",
            table.name()
        );
        let result = sqlx::query(&query)
            .bind(user_id)
            .bind(game_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::missing_reference(e, format!("Game {}", game_id)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_pair(&self, table: PairTable, user_id: i64, game_id: i64) -> AppResult<bool> {
        let query = format!(
            "DELETE FROM {} WHERE user_id = $1 AND game_id = $2",
            table.name()
        );
        let result = sqlx::query(&query)
            .bind(user_id)
            .bind(game_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_pairs(&self, table: PairTable, user_id: i64) -> AppResult<Vec<GameRef>> {
        let query = format!(
            "SELECT g.id, g.title FROM {} t \
             JOIN games g ON g.id = t.game_id \
             WHERE t.user_id = $1 \
             ORDER BY t.added_at, g.id",
            table.name()
        );
        let games = sqlx::query_as::<_, GameRef>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(games)
    }
}

#[async_trait::async_trait]
impl LedgerRepository for PgStore {
    async fn add_favorite(&self, user_id: i64, game_id: i64) -> AppResult<bool> {
        self.insert_pair(PairTable::Favorites, user_id, game_id).await
    }

    async fn remove_favorite(&self, user_id: i64, game_id: i64) -> AppResult<bool> {
        self.delete_pair(PairTable::Favorites, user_id, game_id).await
    }

    async fn favorites(&self, user_id: i64) -> AppResult<Vec<GameRef>> {
        self.list_pairs(PairTable::Favorites, user_id).await
    }

    async fn upsert_rating(&self, user_id: i64, game_id: i64, rating: i16) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO rated_games (user_id, game_id, rating) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, game_id) \
             DO UPDATE SET rating = EXCLUDED.rating, rated_at = now()",
        )
        .bind(user_id)
        .bind(game_id)
        .bind(rating)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::missing_reference(e, format!("Game {}", game_id)))?;

        Ok(())
    }

    async fn remove_rating(&self, user_id: i64, game_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM rated_games WHERE user_id = $1 AND game_id = $2")
            .bind(user_id)
            .bind(game_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn ratings(&self, user_id: i64) -> AppResult<Vec<RatedGame>> {
        let games = sqlx::query_as::<_, RatedGame>(
            "SELECT g.id, g.title, r.rating FROM rated_games r \
             JOIN games g ON g.id = r.game_id \
             WHERE r.user_id = $1 \
             ORDER BY r.rating DESC, g.title",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(games)
    }

    async fn add_dismissed(&self, user_id: i64, game_id: i64) -> AppResult<bool> {
        self.insert_pair(PairTable::Dismissed, user_id, game_id).await
    }

    async fn remove_dismissed(&self, user_id: i64, game_id: i64) -> AppResult<bool> {
        self.delete_pair(PairTable::Dismissed, user_id, game_id).await
    }

    async fn dismissed(&self, user_id: i64) -> AppResult<Vec<GameRef>> {
        self.list_pairs(PairTable::Dismissed, user_id).await
    }
}
