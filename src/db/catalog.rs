use crate::{
    db::{
        postgres::{GAME_CARD_COLUMNS, GAME_CARD_JOINS},
        CatalogRepository, PgStore,
    },
    error::AppResult,
    models::{CatalogGame, GameCard, GameRef},
};

#[async_trait::async_trait]
impl CatalogRepository for PgStore {
    async fn upsert_game(&self, game: &CatalogGame, platform: &str) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Titles are the dedup key; the first sighting wins
        sqlx::query(
            "INSERT INTO games (title, release_date, metascore, cover_url) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (title) DO NOTHING",
        )
        .bind(&game.title)
        .bind(game.release_date)
        .bind(game.metascore)
        .bind(game.cover_url.as_deref())
        .execute(&mut *tx)
        .await?;

        for genre in &game.genres {
            sqlx::query("INSERT INTO genres (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(genre)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                "INSERT INTO game_genres (game_id, genre_id) \
                 SELECT g.id, ge.id FROM games g, genres ge \
                 WHERE g.title = $1 AND ge.name = $2 \
                 ON CONFLICT DO NOTHING",
            )
            .bind(&game.title)
            .bind(genre)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("INSERT INTO platforms (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(platform)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO game_platforms (game_id, platform_id) \
             SELECT g.id, p.id FROM games g, platforms p \
             WHERE g.title = $1 AND p.name = $2 \
             ON CONFLICT DO NOTHING",
        )
        .bind(&game.title)
        .bind(platform)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn purge_unwanted(&self, patterns: &[String]) -> AppResult<u64> {
        // The letter class only matches Cyrillic on a UTF8 database
        let result = sqlx::query(
            "DELETE FROM games \
             WHERE title ILIKE ANY($1) \
                OR title !~* '[a-zа-яё]'",
        )
        .bind(patterns)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<GameRef>> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let games = sqlx::query_as::<_, GameRef>(
            "SELECT id, title FROM games \
             WHERE lower(title) LIKE $1 \
             ORDER BY title \
             LIMIT $2",
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(games)
    }

    async fn game_card(&self, game_id: i64) -> AppResult<Option<GameCard>> {
        let query = format!(
            "SELECT {GAME_CARD_COLUMNS} FROM games g {GAME_CARD_JOINS} \
             WHERE g.id = $1 \
             GROUP BY g.id"
        );
        let card = sqlx::query_as::<_, GameCard>(&query)
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(card)
    }
}

/// Escapes `LIKE` wildcards so user input only matches literally
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("half-life"), "half-life");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
    }
}
