use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

pub mod game;
pub mod user;

pub use game::{CatalogGame, GameCard, GameDetails, GameRef, GameView, RatedGame};
pub use user::{
    NotificationFrequency, Platform, SettingsUpdate, User, UserPreferences, IDLE_STATE,
    KNOWN_GENRES, MAX_BATCH, MIN_BATCH,
};

// ============================================================================
// RAWG API Types
// ============================================================================

/// One page of `GET /games`
#[derive(Debug, Clone, Deserialize)]
pub struct RawgGamesPage {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<RawgGame>,
}

/// Game entry in a RAWG listing
#[derive(Debug, Clone, Deserialize)]
pub struct RawgGame {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub metacritic: Option<i32>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub genres: Vec<RawgNamed>,
}

/// Any `{ "name": ... }` object RAWG nests (genres, developers, publishers)
#[derive(Debug, Clone, Deserialize)]
pub struct RawgNamed {
    pub name: String,
}

/// `GET /games/{id}` response, only the fields shown to users
#[derive(Debug, Clone, Deserialize)]
pub struct RawgGameDetail {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub developers: Vec<RawgNamed>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub publishers: Vec<RawgNamed>,
}

/// RAWG sends `null` for some empty lists
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<RawgGame> for CatalogGame {
    fn from(game: RawgGame) -> Self {
        let release_date = game
            .released
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

        CatalogGame {
            title: game.name,
            release_date,
            metascore: game.metacritic,
            cover_url: game.background_image,
            genres: game.genres.into_iter().map(|g| g.name).collect(),
        }
    }
}

impl From<RawgGameDetail> for GameDetails {
    fn from(detail: RawgGameDetail) -> Self {
        GameDetails {
            developer: detail.developers.into_iter().next().map(|d| d.name),
            publisher: detail.publishers.into_iter().next().map(|p| p.name),
            slug: detail.slug,
        }
    }
}
