/// Outbound chat messages
///
/// The notifier and the inactivity sweeper talk to users without a request
/// from the chat layer, so they push through this seam. Message layout lives
/// here so every sender renders game cards the same way.
use crate::{error::AppResult, models::GameView};

pub mod telegram;

pub use telegram::TelegramPush;

/// Public page of a game on the catalog site
pub const GAME_PAGE_URL: &str = "https://rawg.io/games";

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PushSender: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> AppResult<()>;

    /// Sends a game card with its action buttons
    async fn send_game(&self, chat_id: i64, game: &GameView) -> AppResult<()>;
}

/// Inline button attached to a pushed card
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardButton {
    Link { text: String, url: String },
    Callback { text: String, data: String },
}

/// HTML caption of a game card
pub fn card_caption(game: &GameView) -> String {
    let card = &game.card;
    let details = game.details.clone().unwrap_or_default();
    let or_unknown = |v: Option<String>| v.unwrap_or_else(|| "Unknown".to_string());
    let join_or_unknown = |items: &[String]| {
        if items.is_empty() {
            "Unknown".to_string()
        } else {
            items.join(", ")
        }
    };

    let mut text = format!("<b>{}</b>\n", escape_html(&card.title));
    text.push_str(&format!(
        "Developer: {}\n",
        escape_html(&or_unknown(details.developer))
    ));
    text.push_str(&format!(
        "Publisher: {}\n",
        escape_html(&or_unknown(details.publisher))
    ));
    text.push_str(&format!(
        "Released: {}\n",
        card.release_date
            .map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    ));
    text.push_str(&format!(
        "Genres: {}\n",
        escape_html(&join_or_unknown(&card.genres))
    ));
    text.push_str(&format!(
        "Platforms: {}\n",
        escape_html(&join_or_unknown(&card.platforms))
    ));
    text.push_str(&format!(
        "Metascore: {}",
        card.metascore
            .map(|m| m.to_string())
            .unwrap_or_else(|| "None".to_string())
    ));
    text
}

/// Buttons under a recommended card, one per row
pub fn card_buttons(game: &GameView) -> Vec<CardButton> {
    let id = game.card.id;
    let mut buttons = Vec::with_capacity(4);

    if let Some(slug) = game.details.as_ref().and_then(|d| d.slug.as_deref()) {
        buttons.push(CardButton::Link {
            text: "Details".to_string(),
            url: format!("{}/{}", GAME_PAGE_URL, slug),
        });
    }
    buttons.push(CardButton::Callback {
        text: "Add to favorites".to_string(),
        data: format!("favorite_{}", id),
    });
    buttons.push(CardButton::Callback {
        text: "Rate".to_string(),
        data: format!("rate_{}", id),
    });
    buttons.push(CardButton::Callback {
        text: "Not interested".to_string(),
        data: format!("not_interested_{}", id),
    });

    buttons
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
