use std::sync::Arc;

use crate::{
    db::CatalogRepository,
    error::{AppError, AppResult},
    models::{GameCard, GameRef, GameView},
    services::providers::CatalogProvider,
};

/// Upper bound on search results returned to the chat
pub const SEARCH_LIMIT: i64 = 50;

/// Read side of the catalog mirror: title search and game cards
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
    provider: Arc<dyn CatalogProvider>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, provider: Arc<dyn CatalogProvider>) -> Self {
        Self { catalog, provider }
    }

    pub async fn search(&self, query: &str) -> AppResult<Vec<GameRef>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Search query cannot be empty".to_string()));
        }

        self.catalog.search(query, SEARCH_LIMIT).await
    }

    pub async fn game(&self, game_id: i64) -> AppResult<GameView> {
        let card = self
            .catalog
            .game_card(game_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game {}", game_id)))?;

        Ok(self.view(card).await)
    }

    /// Attaches live provider details to a card
    ///
    /// A failed lookup yields a view without details.
    pub async fn view(&self, card: GameCard) -> GameView {
        let details = match self.provider.fetch_details(&card.title).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!(
                    game_id = card.id,
                    provider = self.provider.name(),
                    error = %e,
                    "Game details lookup failed"
                );
                None
            }
        };

        GameView { card, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::repository::MockCatalogRepository, models::GameDetails,
        services::providers::MockCatalogProvider,
    };

    fn card(id: i64, title: &str) -> GameCard {
        GameCard {
            id,
            title: title.to_string(),
            release_date: None,
            metascore: Some(80),
            cover_url: None,
            genres: vec![],
            platforms: vec![],
        }
    }

    #[tokio::test]
    async fn test_search_trims_and_caps() {
        let mut catalog = MockCatalogRepository::new();
        catalog
            .expect_search()
            .withf(|query, limit| query == "zelda" && *limit == SEARCH_LIMIT)
            .times(1)
            .returning(|_, _| {
                Ok(vec![GameRef {
                    id: 1,
                    title: "Zelda".to_string(),
                }])
            });

        let service = CatalogService::new(Arc::new(catalog), Arc::new(MockCatalogProvider::new()));
        let hits = service.search("  zelda ").await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_search_is_rejected() {
        let service = CatalogService::new(
            Arc::new(MockCatalogRepository::new()),
            Arc::new(MockCatalogProvider::new()),
        );
        assert!(matches!(
            service.search("   ").await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_game_attaches_details() {
        let mut catalog = MockCatalogRepository::new();
        catalog
            .expect_game_card()
            .returning(|id| Ok(Some(card(id, "Celeste"))));
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_fetch_details()
            .withf(|title| title == "Celeste")
            .returning(|_| {
                Ok(Some(GameDetails {
                    developer: Some("Maddy Makes Games".to_string()),
                    publisher: None,
                    slug: Some("celeste".to_string()),
                }))
            });

        let service = CatalogService::new(Arc::new(catalog), Arc::new(provider));
        let view = service.game(4).await.unwrap();
        assert_eq!(view.card.id, 4);
        assert_eq!(
            view.details.and_then(|d| d.slug).as_deref(),
            Some("celeste")
        );
    }

    #[tokio::test]
    async fn test_details_failure_degrades_to_plain_card() {
        let mut catalog = MockCatalogRepository::new();
        catalog
            .expect_game_card()
            .returning(|id| Ok(Some(card(id, "Celeste"))));
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_fetch_details()
            .returning(|_| Err(AppError::ExternalApi("rate limited".to_string())));
        provider.expect_name().return_const("mock");

        let service = CatalogService::new(Arc::new(catalog), Arc::new(provider));
        let view = service.game(4).await.unwrap();
        assert!(view.details.is_none());
    }

    #[tokio::test]
    async fn test_missing_game_is_not_found() {
        let mut catalog = MockCatalogRepository::new();
        catalog.expect_game_card().returning(|_| Ok(None));

        let service = CatalogService::new(Arc::new(catalog), Arc::new(MockCatalogProvider::new()));
        assert!(matches!(service.game(9).await, Err(AppError::NotFound(_))));
    }
}
