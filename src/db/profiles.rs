use chrono::{DateTime, Utc};

use crate::{
    db::{PgStore, ProfileRepository},
    error::{AppError, AppResult},
    models::{Platform, SettingsUpdate, User, UserPreferences, IDLE_STATE},
};

const USER_COLUMNS: &str = "\
    id, telegram_id, platforms, genres, favorite_games, recommendation_count, \
    notification_frequency, notification_count, last_activity, last_notification, \
    current_state, created_at";

/// Raw `users` row before enum parsing
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    telegram_id: i64,
    platforms: Vec<String>,
    genres: Vec<String>,
    favorite_games: Option<String>,
    recommendation_count: i32,
    notification_frequency: String,
    notification_count: i32,
    last_activity: DateTime<Utc>,
    last_notification: Option<DateTime<Utc>>,
    current_state: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let platforms = row
            .platforms
            .iter()
            .filter_map(|name| match name.parse::<Platform>() {
                Ok(p) => Some(p),
                Err(_) => {
                    tracing::warn!(user_id = row.id, platform = %name, "Dropping unknown stored platform");
                    None
                }
            })
            .collect();

        let notification_frequency = row.notification_frequency.parse().map_err(|_| {
            AppError::Internal(format!(
                "Stored notification frequency '{}' for user {} is invalid",
                row.notification_frequency, row.id
            ))
        })?;

        Ok(User {
            id: row.id,
            telegram_id: row.telegram_id,
            preferences: UserPreferences {
                platforms,
                genres: row.genres,
                favorite_games: row.favorite_games,
            },
            recommendation_count: row.recommendation_count,
            notification_frequency,
            notification_count: row.notification_count,
            last_activity: row.last_activity,
            last_notification: row.last_notification,
            current_state: row.current_state,
            created_at: row.created_at,
        })
    }
}

fn into_users(rows: Vec<UserRow>) -> AppResult<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

#[async_trait::async_trait]
impl ProfileRepository for PgStore {
    async fn find_by_chat(&self, chat_id: i64) -> AppResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn upsert_user(&self, chat_id: i64) -> AppResult<User> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let query = format!(
            "INSERT INTO users (telegram_id) VALUES ($1) \
             ON CONFLICT (telegram_id) DO UPDATE SET telegram_id = EXCLUDED.telegram_id \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn save_preferences(
        &self,
        user_id: i64,
        preferences: &UserPreferences,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET platforms = $2, genres = $3, favorite_games = $4 WHERE id = $1",
        )
        .bind(user_id)
        .bind(preferences.catalog_platforms())
        .bind(&preferences.genres)
        .bind(preferences.favorite_games.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {}", user_id)));
        }
        Ok(())
    }

    async fn update_settings(&self, user_id: i64, update: &SettingsUpdate) -> AppResult<User> {
        let query = format!(
            "UPDATE users SET \
                recommendation_count = COALESCE($2, recommendation_count), \
                notification_frequency = COALESCE($3, notification_frequency), \
                notification_count = COALESCE($4, notification_count) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .bind(update.recommendation_count)
            .bind(update.notification_frequency.map(|f| f.as_str()))
            .bind(update.notification_count)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

        row.try_into()
    }

    async fn touch_activity(&self, user_id: i64, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_activity = $2 WHERE id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_dialog_state(&self, user_id: i64, state: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET current_state = $2 WHERE id = $1")
            .bind(user_id)
            .bind(state)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn notification_candidates(&self) -> AppResult<Vec<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE notification_frequency <> 'never' AND current_state = $1 \
             ORDER BY id"
        );
        let rows = sqlx::query_as::<_, UserRow>(&query)
            .bind(IDLE_STATE)
            .fetch_all(&self.pool)
            .await?;

        into_users(rows)
    }

    async fn stale_sessions(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE last_activity < $1 AND current_state <> $2 \
             ORDER BY id"
        );
        let rows = sqlx::query_as::<_, UserRow>(&query)
            .bind(cutoff)
            .bind(IDLE_STATE)
            .fetch_all(&self.pool)
            .await?;

        into_users(rows)
    }

    async fn reset_stale_session(&self, user_id: i64, cutoff: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET current_state = $3 \
             WHERE id = $1 AND last_activity < $2 AND current_state <> $3",
        )
        .bind(user_id)
        .bind(cutoff)
        .bind(IDLE_STATE)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_notified(&self, user_id: i64, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_notification = $2 WHERE id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
