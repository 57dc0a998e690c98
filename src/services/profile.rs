use chrono::Utc;
use std::sync::Arc;

use crate::{
    db::ProfileRepository,
    error::{AppError, AppResult},
    models::{SettingsUpdate, User},
};

/// Longest dialog-state label accepted from the chat layer
const MAX_STATE_LEN: usize = 64;

/// User lookup, settings and activity bookkeeping
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileRepository>) -> Self {
        Self { store }
    }

    /// First contact or `/start`: creates the user when needed and stamps activity
    pub async fn start(&self, chat_id: i64) -> AppResult<User> {
        let mut user = self.store.upsert_user(chat_id).await?;
        let now = Utc::now();
        self.store.touch_activity(user.id, now).await?;
        user.last_activity = now;

        tracing::info!(user_id = user.id, chat_id, "User started a session");
        Ok(user)
    }

    pub async fn get(&self, chat_id: i64) -> AppResult<User> {
        self.store
            .find_by_chat(chat_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with chat {}", chat_id)))
    }

    /// Looks the user up and records the interaction as activity
    pub async fn active(&self, chat_id: i64) -> AppResult<User> {
        let mut user = self.get(chat_id).await?;
        let now = Utc::now();
        self.store.touch_activity(user.id, now).await?;
        user.last_activity = now;
        Ok(user)
    }

    pub async fn update_settings(&self, user: &User, update: &SettingsUpdate) -> AppResult<User> {
        update.validate()?;
        let updated = self.store.update_settings(user.id, update).await?;

        tracing::info!(
            user_id = user.id,
            recommendation_count = updated.recommendation_count,
            notification_frequency = updated.notification_frequency.as_str(),
            notification_count = updated.notification_count,
            "Settings updated"
        );
        Ok(updated)
    }

    pub async fn set_dialog_state(&self, user: &User, state: &str) -> AppResult<()> {
        let state = state.trim();
        if state.is_empty() || state.len() > MAX_STATE_LEN {
            return Err(AppError::InvalidInput(format!(
                "Dialog state must be 1 to {} characters",
                MAX_STATE_LEN
            )));
        }

        self.store.set_dialog_state(user.id, state).await
    }
}
