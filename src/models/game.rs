use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Minimal reference to a mirrored game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct GameRef {
    pub id: i64,
    pub title: String,
}

/// A game with the user's score attached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct RatedGame {
    pub id: i64,
    pub title: String,
    pub rating: i16,
}

/// Display form of a game: metadata joined with its genres and platforms
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct GameCard {
    pub id: i64,
    pub title: String,
    pub release_date: Option<NaiveDate>,
    pub metascore: Option<i32>,
    pub cover_url: Option<String>,
    pub genres: Vec<String>,
    pub platforms: Vec<String>,
}

/// Extra details pulled live from the catalog API for display
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GameDetails {
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub slug: Option<String>,
}

/// A game card plus its live details, as returned to the dialog layer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GameView {
    #[serde(flatten)]
    pub card: GameCard,
    pub details: Option<GameDetails>,
}

/// Normalised catalog entry ready to be written into the mirror
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogGame {
    pub title: String,
    pub release_date: Option<NaiveDate>,
    pub metascore: Option<i32>,
    pub cover_url: Option<String>,
    pub genres: Vec<String>,
}
