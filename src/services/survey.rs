//! Preference survey.
//!
//! Answers accumulate in a session-store draft keyed by chat id and only
//! reach the profile when the survey is finished. An abandoned draft simply
//! expires.

use serde::Deserialize;
use std::{sync::Arc, time::Duration};

use crate::{
    db::{ProfileRepository, SessionKey, SessionStore},
    error::{AppError, AppResult},
    models::{Platform, User, UserPreferences, KNOWN_GENRES},
    services::recommendations::RecommendationPool,
};

/// Longest free-text "favorite games" answer kept
const MAX_FAVORITES_TEXT: usize = 500;

/// Partial survey answers; absent fields keep the draft's value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurveyPatch {
    pub platforms: Option<Vec<Platform>>,
    pub genres: Option<Vec<String>>,
    pub favorite_games: Option<String>,
}

#[derive(Clone)]
pub struct SurveyService {
    sessions: Arc<dyn SessionStore>,
    profiles: Arc<dyn ProfileRepository>,
    pool: RecommendationPool,
    ttl: Duration,
}

impl SurveyService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        profiles: Arc<dyn ProfileRepository>,
        pool: RecommendationPool,
        ttl: Duration,
    ) -> Self {
        Self {
            sessions,
            profiles,
            pool,
            ttl,
        }
    }

    /// Current draft; an edit with none in progress starts from the saved preferences
    pub async fn draft(&self, user: &User) -> AppResult<UserPreferences> {
        let chat_id = user.telegram_id;
        match self.sessions.get(&SessionKey::Survey(chat_id)).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::Internal(format!("Corrupt survey draft for chat {}: {}", chat_id, e))
            }),
            None => Ok(user.preferences.clone()),
        }
    }

    /// Merges `patch` into the draft and refreshes its TTL
    pub async fn update(&self, user: &User, patch: SurveyPatch) -> AppResult<UserPreferences> {
        let mut draft = self.draft(user).await?;

        if let Some(platforms) = patch.platforms {
            draft.platforms = dedup(platforms);
        }
        if let Some(genres) = patch.genres {
            draft.genres = genres
                .iter()
                .map(|g| canonical_genre(g))
                .collect::<AppResult<Vec<_>>>()
                .map(dedup)?;
        }
        if let Some(text) = patch.favorite_games {
            let text = text.trim();
            draft.favorite_games = if text.is_empty() {
                None
            } else {
                Some(text.chars().take(MAX_FAVORITES_TEXT).collect())
            };
        }

        let raw = serde_json::to_string(&draft)
            .map_err(|e| AppError::Internal(format!("Failed to encode survey draft: {}", e)))?;
        self.sessions
            .put(&SessionKey::Survey(user.telegram_id), raw, self.ttl)
            .await?;

        Ok(draft)
    }

    /// Saves the draft as the user's preferences and regenerates the pool
    pub async fn finish(&self, user: &User) -> AppResult<User> {
        let draft = self.draft(user).await?;
        if draft.platforms.is_empty() {
            return Err(AppError::InvalidInput(
                "Pick at least one platform before finishing the survey".to_string(),
            ));
        }
        if draft.genres.is_empty() {
            return Err(AppError::InvalidInput(
                "Pick at least one genre before finishing the survey".to_string(),
            ));
        }

        self.profiles.save_preferences(user.id, &draft).await?;
        self.discard(user.telegram_id).await?;

        let updated = User {
            preferences: draft,
            ..user.clone()
        };
        self.pool.refill(&updated).await?;

        tracing::info!(
            user_id = user.id,
            platforms = updated.preferences.platforms.len(),
            genres = updated.preferences.genres.len(),
            "Survey completed"
        );
        Ok(updated)
    }

    pub async fn discard(&self, chat_id: i64) -> AppResult<()> {
        self.sessions.remove(&SessionKey::Survey(chat_id)).await
    }
}

/// Maps a genre answer onto the survey's spelling
fn canonical_genre(input: &str) -> AppResult<String> {
    let needle = input.trim();
    KNOWN_GENRES
        .iter()
        .find(|g| g.eq_ignore_ascii_case(needle))
        .map(|g| g.to_string())
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown genre: {}", needle)))
}

fn dedup<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
