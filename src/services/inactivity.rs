use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};

use crate::{
    db::{ProfileRepository, SessionKey, SessionStore},
    error::{AppError, AppResult},
    models::User,
    services::{push::PushSender, scheduler::Job},
};

pub const TIMEOUT_NOTICE: &str =
    "You have been inactive for more than an hour, so we took you back to the main menu.";

/// Returns users stuck mid-dialog to the main menu
#[derive(Clone)]
pub struct InactivitySweeper {
    profiles: Arc<dyn ProfileRepository>,
    sessions: Arc<dyn SessionStore>,
    push: Arc<dyn PushSender>,
    check_interval: Duration,
    timeout: Duration,
}

impl InactivitySweeper {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        sessions: Arc<dyn SessionStore>,
        push: Arc<dyn PushSender>,
        check_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            profiles,
            sessions,
            push,
            check_interval,
            timeout,
        }
    }

    /// Resets every session idle since before `now - timeout`; returns how many were reset
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let timeout = chrono::Duration::from_std(self.timeout)
            .map_err(|e| AppError::Internal(format!("Inactivity timeout out of range: {}", e)))?;
        let cutoff = now - timeout;
        let stale = self.profiles.stale_sessions(cutoff).await?;

        let mut reset = 0;
        for user in stale {
            match self.reset(&user, cutoff).await {
                Ok(true) => reset += 1,
                Ok(false) => {
                    tracing::debug!(user_id = user.id, "User became active again, not reset")
                }
                Err(e) => {
                    tracing::error!(user_id = user.id, error = %e, "Failed to reset idle session")
                }
            }
        }

        if reset > 0 {
            tracing::info!(reset, "Idle sessions returned to main menu");
        }
        Ok(reset)
    }

    async fn reset(&self, user: &User, cutoff: DateTime<Utc>) -> AppResult<bool> {
        if !self.profiles.reset_stale_session(user.id, cutoff).await? {
            return Ok(false);
        }
        self.sessions
            .remove(&SessionKey::Survey(user.telegram_id))
            .await?;

        // Notice failures do not undo the reset
        if let Err(e) = self.push.send_text(user.telegram_id, TIMEOUT_NOTICE).await {
            tracing::warn!(user_id = user.id, error = %e, "Could not send inactivity notice");
        }
        Ok(true)
    }
}

#[async_trait::async_trait]
impl Job for InactivitySweeper {
    fn name(&self) -> &'static str {
        "inactivity_sweeper"
    }

    fn interval(&self) -> Duration {
        self.check_interval
    }

    async fn run(&self) -> AppResult<()> {
        self.sweep(Utc::now()).await.map(|_| ())
    }
}
