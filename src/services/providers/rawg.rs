/// RAWG API provider
///
/// API Flow:
/// 1. Releases: /games?platforms={id}&dates={from},{to}&page={n} → paginated listing
/// 2. Details: /games?search={title} → RAWG id, then /games/{id} → developers, publishers, slug
use crate::{
    error::{AppError, AppResult},
    models::{GameDetails, RawgGameDetail, RawgGamesPage},
    services::providers::{CatalogProvider, ReleaseQuery},
};
use reqwest::{Client as HttpClient, Response};
use serde::Deserialize;

#[derive(Clone)]
pub struct RawgProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl RawgProvider {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Query parameters for a release listing request
    fn release_params(&self, query: &ReleaseQuery) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.api_key.clone()),
            ("platforms", query.platform.rawg_id().to_string()),
            (
                "dates",
                format!(
                    "{},{}",
                    query.from.format("%Y-%m-%d"),
                    query.to.format("%Y-%m-%d")
                ),
            ),
            ("page", query.page.to_string()),
            ("page_size", query.page_size.to_string()),
        ]
    }

    async fn check_status(response: Response) -> AppResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::ExternalApi(format!(
            "RAWG API returned status {}: {}",
            status, body
        )))
    }
}

#[async_trait::async_trait]
impl CatalogProvider for RawgProvider {
    #[tracing::instrument(skip(self, query), fields(platform = %query.platform, page = query.page))]
    async fn fetch_releases(&self, query: &ReleaseQuery) -> AppResult<RawgGamesPage> {
        let url = format!("{}/games", self.api_url);

        let response = self
            .http_client
            .get(&url)
            .query(&self.release_params(query))
            .send()
            .await?;

        // RAWG answers 404 for a page past the end of the listing
        if response.status() == reqwest::StatusCode::NOT_FOUND && query.page > 1 {
            return Ok(RawgGamesPage {
                next: None,
                results: Vec::new(),
            });
        }

        let page: RawgGamesPage = Self::check_status(response).await?.json().await?;

        tracing::debug!(
            results = page.results.len(),
            has_next = page.next.is_some(),
            provider = "rawg",
            "Release page fetched"
        );

        Ok(page)
    }

    async fn fetch_details(&self, title: &str) -> AppResult<Option<GameDetails>> {
        if title.trim().is_empty() {
            return Err(AppError::InvalidInput("Title cannot be empty".to_string()));
        }

        #[derive(Deserialize)]
        struct SearchHit {
            id: u64,
        }

        #[derive(Deserialize)]
        struct SearchResponse {
            #[serde(default)]
            results: Vec<SearchHit>,
        }

        let search_url = format!("{}/games", self.api_url);
        let response = self
            .http_client
            .get(&search_url)
            .query(&[("key", self.api_key.as_str()), ("search", title)])
            .send()
            .await?;

        let search: SearchResponse = Self::check_status(response).await?.json().await?;

        let Some(hit) = search.results.first() else {
            tracing::debug!(title = %title, provider = "rawg", "No catalog match for title");
            return Ok(None);
        };

        let detail_url = format!("{}/games/{}", self.api_url, hit.id);
        let response = self
            .http_client
            .get(&detail_url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let detail: RawgGameDetail = Self::check_status(response).await?.json().await?;

        Ok(Some(detail.into()))
    }

    fn name(&self) -> &'static str {
        "rawg"
    }
}
