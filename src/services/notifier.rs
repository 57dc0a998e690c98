use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};

use crate::{
    db::ProfileRepository,
    error::AppResult,
    models::User,
    services::{
        catalog::CatalogService, push::PushSender, recommendations::RecommendationPool,
        scheduler::Job,
    },
};

/// Counters from one notification sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub candidates: usize,
    pub notified: usize,
    pub games_sent: usize,
    pub failed: usize,
}

/// Pushes scheduled recommendations to idle users whose frequency is due
#[derive(Clone)]
pub struct Notifier {
    profiles: Arc<dyn ProfileRepository>,
    pool: RecommendationPool,
    catalog: CatalogService,
    push: Arc<dyn PushSender>,
    interval: Duration,
}

impl Notifier {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        pool: RecommendationPool,
        catalog: CatalogService,
        push: Arc<dyn PushSender>,
        interval: Duration,
    ) -> Self {
        Self {
            profiles,
            pool,
            catalog,
            push,
            interval,
        }
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> AppResult<NotifyReport> {
        let users = self.profiles.notification_candidates().await?;
        let mut report = NotifyReport {
            candidates: users.len(),
            ..Default::default()
        };

        for user in users {
            if !user
                .notification_frequency
                .is_due(user.last_notification, now)
            {
                continue;
            }

            match self.notify(&user, now).await {
                Ok(sent) => {
                    report.notified += 1;
                    report.games_sent += sent;
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(user_id = user.id, error = %e, "Scheduled notification failed");
                }
            }
        }

        tracing::info!(
            candidates = report.candidates,
            notified = report.notified,
            games_sent = report.games_sent,
            failed = report.failed,
            "Notification sweep finished"
        );
        Ok(report)
    }

    /// Sends one user's batch and stamps the user once every push succeeded
    ///
    /// On a failed push the cards already sent are committed and the user is
    /// left unstamped, so the next sweep retries with the rest of the pool.
    async fn notify(&self, user: &User, now: DateTime<Utc>) -> AppResult<usize> {
        let cards = self
            .pool
            .take(user, i64::from(user.notification_count))
            .await?;

        for (sent, card) in cards.iter().enumerate() {
            let view = self.catalog.view(card.clone()).await;
            if let Err(e) = self.push.send_game(user.telegram_id, &view).await {
                self.pool.commit(user.id, &cards[..sent]).await?;
                return Err(e);
            }
        }

        self.pool.commit(user.id, &cards).await?;
        self.profiles.mark_notified(user.id, now).await?;

        tracing::debug!(user_id = user.id, games = cards.len(), "User notified");
        Ok(cards.len())
    }
}

#[async_trait::async_trait]
impl Job for Notifier {
    fn name(&self) -> &'static str {
        "notifier"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> AppResult<()> {
        self.run_once(Utc::now()).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::repository::{MockCatalogRepository, MockPoolRepository, MockProfileRepository},
        error::AppError,
        models::{GameCard, NotificationFrequency},
        services::{providers::MockCatalogProvider, push::MockPushSender},
    };
    use chrono::Duration as ChronoDuration;

    fn card(id: i64) -> GameCard {
        GameCard {
            id,
            title: format!("Game {}", id),
            release_date: None,
            metascore: None,
            cover_url: None,
            genres: vec![],
            platforms: vec![],
        }
    }

    fn details_provider() -> MockCatalogProvider {
        let mut provider = MockCatalogProvider::new();
        provider.expect_fetch_details().returning(|_| Ok(None));
        provider
    }

    fn notifier(
        profiles: MockProfileRepository,
        pool: MockPoolRepository,
        push: MockPushSender,
    ) -> Notifier {
        Notifier::new(
            Arc::new(profiles),
            RecommendationPool::new(Arc::new(pool), 20),
            CatalogService::new(
                Arc::new(MockCatalogRepository::new()),
                Arc::new(details_provider()),
            ),
            Arc::new(push),
            Duration::from_secs(3600),
        )
    }

    fn due_user(id: i64) -> User {
        let mut user = User::fixture(id);
        user.notification_frequency = NotificationFrequency::Daily;
        user.notification_count = 2;
        user.last_notification = Some(Utc::now() - ChronoDuration::days(2));
        user
    }

    #[tokio::test]
    async fn test_due_user_gets_batch_and_stamp() {
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_notification_candidates()
            .returning(|| Ok(vec![due_user(1)]));
        profiles
            .expect_mark_notified()
            .withf(|user_id, _| *user_id == 1)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut pool = MockPoolRepository::new();
        pool.expect_pool_cards()
            .withf(|_, limit| *limit == 2)
            .returning(|_, _| Ok(vec![card(7), card(8)]));
        pool.expect_mark_viewed()
            .withf(|_, ids| ids == [7, 8])
            .times(1)
            .returning(|_, _| Ok(()));
        pool.expect_evict().times(1).returning(|_, _| Ok(2));

        let mut push = MockPushSender::new();
        push.expect_send_game()
            .withf(|chat_id, _| *chat_id == 1001)
            .times(2)
            .returning(|_, _| Ok(()));

        let report = notifier(profiles, pool, push)
            .run_once(Utc::now())
            .await
            .unwrap();
        assert_eq!(report.notified, 1);
        assert_eq!(report.games_sent, 2);
    }

    #[tokio::test]
    async fn test_user_not_yet_due_is_skipped() {
        let mut user = due_user(1);
        user.last_notification = Some(Utc::now() - ChronoDuration::hours(3));

        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_notification_candidates()
            .returning(move || Ok(vec![user.clone()]));
        profiles.expect_mark_notified().never();
        let mut pool = MockPoolRepository::new();
        pool.expect_pool_cards().never();

        let report = notifier(profiles, pool, MockPushSender::new())
            .run_once(Utc::now())
            .await
            .unwrap();
        assert_eq!(report.candidates, 1);
        assert_eq!(report.notified, 0);
    }

    #[tokio::test]
    async fn test_empty_pool_still_stamps() {
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_notification_candidates()
            .returning(|| Ok(vec![due_user(1)]));
        profiles
            .expect_mark_notified()
            .times(1)
            .returning(|_, _| Ok(()));

        let mut pool = MockPoolRepository::new();
        pool.expect_pool_cards().returning(|_, _| Ok(vec![]));
        pool.expect_replace_pool().returning(|_, _, _| Ok(vec![]));
        pool.expect_mark_viewed().never();

        let mut push = MockPushSender::new();
        push.expect_send_game().never();

        let report = notifier(profiles, pool, push)
            .run_once(Utc::now())
            .await
            .unwrap();
        assert_eq!(report.notified, 1);
        assert_eq!(report.games_sent, 0);
    }

    #[tokio::test]
    async fn test_push_failure_skips_stamp_and_continues_sweep() {
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_notification_candidates()
            .returning(|| Ok(vec![due_user(1), due_user(2)]));
        profiles
            .expect_mark_notified()
            .withf(|user_id, _| *user_id == 2)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut pool = MockPoolRepository::new();
        pool.expect_pool_cards()
            .returning(|user_id, _| Ok(vec![card(user_id * 10), card(user_id * 10 + 1)]));
        pool.expect_mark_viewed()
            .withf(|user_id, _| *user_id == 2)
            .times(1)
            .returning(|_, _| Ok(()));
        pool.expect_evict()
            .withf(|user_id, _| *user_id == 2)
            .times(1)
            .returning(|_, _| Ok(2));

        let mut push = MockPushSender::new();
        push.expect_send_game().returning(|chat_id, _| {
            if chat_id == 1001 {
                Err(AppError::ExternalApi("blocked by user".to_string()))
            } else {
                Ok(())
            }
        });

        let report = notifier(profiles, pool, push)
            .run_once(Utc::now())
            .await
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.notified, 1);
    }

    #[tokio::test]
    async fn test_partial_batch_commits_only_sent_cards() {
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_notification_candidates()
            .returning(|| Ok(vec![due_user(3)]));
        profiles.expect_mark_notified().never();

        let mut pool = MockPoolRepository::new();
        pool.expect_pool_cards()
            .returning(|_, _| Ok(vec![card(30), card(31)]));
        pool.expect_mark_viewed()
            .withf(|user_id, ids| *user_id == 3 && ids == [30])
            .times(1)
            .returning(|_, _| Ok(()));
        pool.expect_evict()
            .withf(|_, ids| ids == [30])
            .times(1)
            .returning(|_, _| Ok(1));

        let mut push = MockPushSender::new();
        let mut calls = 0;
        push.expect_send_game().returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(())
            } else {
                Err(AppError::ExternalApi("Too Many Requests".to_string()))
            }
        });

        let report = notifier(profiles, pool, push)
            .run_once(Utc::now())
            .await
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.notified, 0);
    }
}
