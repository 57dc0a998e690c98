/// Game catalog provider abstraction
///
/// The catalog mirror is filled from an external provider (RAWG today). The
/// trait covers the two calls the service makes: paging through releases for
/// one platform and a date window, and looking up display details by title.
use chrono::NaiveDate;

use crate::{
    error::AppResult,
    models::{GameDetails, Platform, RawgGamesPage},
};

pub mod rawg;

pub use rawg::RawgProvider;

/// Filter for one page of a release listing
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseQuery {
    pub platform: Platform,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub page: u32,
    pub page_size: u32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch one page of games released on a platform inside a date window
    async fn fetch_releases(&self, query: &ReleaseQuery) -> AppResult<RawgGamesPage>;

    /// Look up developer, publisher and slug for a title
    ///
    /// Returns `None` when the provider knows no game by that name.
    async fn fetch_details(&self, title: &str) -> AppResult<Option<GameDetails>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
