//! Weekly catalog refresh.
//!
//! Pulls the last week's releases for every supported platform from the
//! catalog provider into the local mirror, then purges titles that must never
//! be recommended.

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    db::CatalogRepository,
    error::AppResult,
    models::{CatalogGame, Platform},
    services::{
        providers::{CatalogProvider, ReleaseQuery},
        scheduler::Job,
    },
};

/// Title fragments that exclude a game from the mirror
pub const DENYLIST: &[&str] = &["hentai", "sex", "porn", "fuck", "incest", "furry"];

const WINDOW_DAYS: i64 = 7;
const PAGE_SIZE: u32 = 40;
const MAX_PAGES: u32 = 50;

/// Counters from one sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub pages: u32,
    pub seen: u32,
    pub upserted: u32,
    pub skipped: u32,
    pub purged: u64,
    pub failed_platforms: Vec<String>,
}

#[derive(Clone)]
pub struct CatalogSync {
    catalog: Arc<dyn CatalogRepository>,
    provider: Arc<dyn CatalogProvider>,
    interval: std::time::Duration,
}

impl CatalogSync {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        provider: Arc<dyn CatalogProvider>,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            catalog,
            provider,
            interval,
        }
    }

    /// Mirrors releases from the week ending on `today`
    pub async fn sync(&self, today: NaiveDate) -> AppResult<SyncReport> {
        let from = today - Duration::days(WINDOW_DAYS);
        let mut report = SyncReport::default();

        for platform in Platform::ALL {
            tracing::info!(
                platform = platform.catalog_name(),
                from = %from,
                to = %today,
                "Syncing catalog releases"
            );

            if let Err(e) = self.sync_platform(platform, from, today, &mut report).await {
                tracing::error!(
                    platform = platform.catalog_name(),
                    provider = self.provider.name(),
                    error = %e,
                    "Platform sync failed, skipping"
                );
                report.failed_platforms.push(platform.catalog_name().to_string());
            }
        }

        report.purged = self.catalog.purge_unwanted(&denylist_patterns()).await?;

        tracing::info!(
            pages = report.pages,
            seen = report.seen,
            upserted = report.upserted,
            skipped = report.skipped,
            purged = report.purged,
            failed = report.failed_platforms.len(),
            "Catalog sync finished"
        );
        Ok(report)
    }

    async fn sync_platform(
        &self,
        platform: Platform,
        from: NaiveDate,
        to: NaiveDate,
        report: &mut SyncReport,
    ) -> AppResult<()> {
        for page in 1..=MAX_PAGES {
            let query = ReleaseQuery {
                platform,
                from,
                to,
                page,
                page_size: PAGE_SIZE,
            };
            let listing = self.provider.fetch_releases(&query).await?;
            report.pages += 1;

            if listing.results.is_empty() {
                break;
            }

            for raw in listing.results {
                report.seen += 1;
                let game = CatalogGame::from(raw);
                if !is_syncable(&game, from, to) {
                    report.skipped += 1;
                    continue;
                }

                self.catalog
                    .upsert_game(&game, platform.catalog_name())
                    .await?;
                report.upserted += 1;
            }

            if listing.next.is_none() {
                break;
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Job for CatalogSync {
    fn name(&self) -> &'static str {
        "catalog_sync"
    }

    fn interval(&self) -> std::time::Duration {
        self.interval
    }

    async fn run(&self) -> AppResult<()> {
        self.sync(Utc::now().date_naive()).await.map(|_| ())
    }
}

/// Whether a listed game belongs in the mirror
fn is_syncable(game: &CatalogGame, from: NaiveDate, to: NaiveDate) -> bool {
    let Some(released) = game.release_date else {
        return false;
    };
    !game.genres.is_empty()
        && (from..=to).contains(&released)
        && !is_unwanted_title(&game.title)
}

/// `ILIKE` patterns for the purge query
pub fn denylist_patterns() -> Vec<String> {
    DENYLIST.iter().map(|word| format!("%{}%", word)).collect()
}

/// Same rule as the purge query: a denylisted word, or no Latin/Cyrillic letter
pub fn is_unwanted_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    if DENYLIST.iter().any(|word| lower.contains(word)) {
        return true;
    }

    !lower
        .chars()
        .any(|c| c.is_ascii_lowercase() || ('а'..='я').contains(&c) || c == 'ё')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::repository::MockCatalogRepository,
        error::AppError,
        models::{RawgGame, RawgGamesPage, RawgNamed},
        services::providers::MockCatalogProvider,
    };

    const WEEK: std::time::Duration = std::time::Duration::from_secs(604_800);

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn raw(id: u64, name: &str, released: Option<&str>, genres: &[&str]) -> RawgGame {
        RawgGame {
            id,
            name: name.to_string(),
            released: released.map(String::from),
            metacritic: None,
            background_image: None,
            genres: genres
                .iter()
                .map(|g| RawgNamed {
                    name: g.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_unwanted_titles() {
        assert!(is_unwanted_title("Furry Tales"));
        assert!(is_unwanted_title("SEXY Beach"));
        assert!(is_unwanted_title("12345"));
        assert!(is_unwanted_title("東方"));
        assert!(!is_unwanted_title("Hades II"));
        assert!(!is_unwanted_title("Смута"));
        assert!(!is_unwanted_title("Ёлки"));
    }

    #[test]
    fn test_denylist_patterns() {
        let patterns = denylist_patterns();
        assert_eq!(patterns.len(), DENYLIST.len());
        assert!(patterns.contains(&"%hentai%".to_string()));
    }

    #[test]
    fn test_syncable_requires_date_genre_and_window() {
        let ok = CatalogGame::from(raw(1, "Hades", Some("2025-03-05"), &["Action"]));
        assert!(is_syncable(&ok, day(1), day(8)));

        let undated = CatalogGame::from(raw(2, "Hades", None, &["Action"]));
        assert!(!is_syncable(&undated, day(1), day(8)));

        let genreless = CatalogGame::from(raw(3, "Hades", Some("2025-03-05"), &[]));
        assert!(!is_syncable(&genreless, day(1), day(8)));

        let too_new = CatalogGame::from(raw(4, "Hades", Some("2025-03-09"), &["Action"]));
        assert!(!is_syncable(&too_new, day(1), day(8)));
    }

    #[tokio::test]
    async fn test_run_follows_pages_and_purges() {
        let mut provider = MockCatalogProvider::new();
        provider.expect_fetch_releases().returning(|query| {
            if query.platform != Platform::Pc {
                return Ok(RawgGamesPage {
                    next: None,
                    results: vec![],
                });
            }
            assert_eq!(query.page_size, PAGE_SIZE);
            assert_eq!(query.from, day(1));
            match query.page {
                1 => Ok(RawgGamesPage {
                    next: Some("page=2".to_string()),
                    results: vec![
                        raw(1, "Hades", Some("2025-03-05"), &["Action"]),
                        raw(2, "Undated", None, &["Action"]),
                    ],
                }),
                _ => Ok(RawgGamesPage {
                    next: None,
                    results: vec![raw(3, "Celeste", Some("2025-03-07"), &["Platformer"])],
                }),
            }
        });
        provider.expect_name().return_const("mock");

        let mut catalog = MockCatalogRepository::new();
        catalog
            .expect_upsert_game()
            .withf(|_, platform| platform == "PC")
            .times(2)
            .returning(|_, _| Ok(()));
        catalog
            .expect_purge_unwanted()
            .withf(|patterns| patterns.len() == DENYLIST.len())
            .times(1)
            .returning(|_| Ok(4));

        let sync = CatalogSync::new(Arc::new(catalog), Arc::new(provider), WEEK);
        let report = sync.sync(day(8)).await.unwrap();

        // PC takes two pages, the other seven platforms one empty page each
        assert_eq!(report.pages, 2 + 7);
        assert_eq!(report.seen, 3);
        assert_eq!(report.upserted, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.purged, 4);
        assert!(report.failed_platforms.is_empty());
    }

    #[tokio::test]
    async fn test_failed_platform_is_skipped() {
        let mut provider = MockCatalogProvider::new();
        provider.expect_fetch_releases().returning(|query| {
            if query.platform == Platform::Xbox360 {
                Err(AppError::ExternalApi("502".to_string()))
            } else {
                Ok(RawgGamesPage {
                    next: None,
                    results: vec![],
                })
            }
        });
        provider.expect_name().return_const("mock");

        let mut catalog = MockCatalogRepository::new();
        catalog.expect_purge_unwanted().returning(|_| Ok(0));

        let sync = CatalogSync::new(Arc::new(catalog), Arc::new(provider), WEEK);
        let report = sync.sync(day(8)).await.unwrap();
        assert_eq!(report.failed_platforms, vec!["XBOX 360".to_string()]);
    }

    #[tokio::test]
    async fn test_page_cap_stops_endless_listings() {
        let mut provider = MockCatalogProvider::new();
        provider.expect_fetch_releases().returning(|query| {
            if query.platform != Platform::Pc {
                return Ok(RawgGamesPage {
                    next: None,
                    results: vec![],
                });
            }
            Ok(RawgGamesPage {
                next: Some("more".to_string()),
                results: vec![raw(1, "Loop", None, &[])],
            })
        });

        let mut catalog = MockCatalogRepository::new();
        catalog.expect_upsert_game().never();
        catalog.expect_purge_unwanted().returning(|_| Ok(0));

        let sync = CatalogSync::new(Arc::new(catalog), Arc::new(provider), WEEK);
        let report = sync.sync(day(8)).await.unwrap();
        assert_eq!(report.pages, MAX_PAGES + 7);
    }
}
