use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::GameView,
    services::push::{card_buttons, card_caption, CardButton, PushSender},
};

/// Telegram caps photo captions at 1024 characters
const CAPTION_LIMIT: usize = 1024;

/// Push delivery through the Telegram Bot API
#[derive(Clone)]
pub struct TelegramPush {
    http_client: HttpClient,
    bot_token: String,
    api_url: String,
}

#[derive(Debug, Serialize)]
struct InlineButton {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_data: Option<String>,
}

#[derive(Debug, Serialize)]
struct InlineKeyboard {
    inline_keyboard: Vec<Vec<InlineButton>>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboard>,
}

#[derive(Debug, Serialize)]
struct SendPhoto<'a> {
    chat_id: i64,
    photo: &'a str,
    caption: &'a str,
    parse_mode: &'static str,
    reply_markup: InlineKeyboard,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl From<CardButton> for InlineButton {
    fn from(button: CardButton) -> Self {
        match button {
            CardButton::Link { text, url } => InlineButton {
                text,
                url: Some(url),
                callback_data: None,
            },
            CardButton::Callback { text, data } => InlineButton {
                text,
                url: None,
                callback_data: Some(data),
            },
        }
    }
}

impl TelegramPush {
    pub fn new(bot_token: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            bot_token,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.bot_token, method)
    }

    fn keyboard(game: &GameView) -> InlineKeyboard {
        InlineKeyboard {
            inline_keyboard: card_buttons(game)
                .into_iter()
                .map(|b| vec![InlineButton::from(b)])
                .collect(),
        }
    }

    async fn call<T: Serialize + Sync>(&self, method: &str, payload: &T) -> AppResult<()> {
        let response = self
            .http_client
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let reply: ApiReply = response.json().await?;
        if !reply.ok {
            return Err(AppError::ExternalApi(format!(
                "Telegram {} failed with status {}: {}",
                method,
                status,
                reply.description.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PushSender for TelegramPush {
    async fn send_text(&self, chat_id: i64, text: &str) -> AppResult<()> {
        let payload = SendMessage {
            chat_id,
            text,
            parse_mode: "HTML",
            reply_markup: None,
        };
        self.call("sendMessage", &payload).await
    }

    #[tracing::instrument(skip(self, game), fields(game_id = game.card.id))]
    async fn send_game(&self, chat_id: i64, game: &GameView) -> AppResult<()> {
        let caption = card_caption(game);

        match game.card.cover_url.as_deref() {
            Some(photo) if caption.chars().count() <= CAPTION_LIMIT => {
                let payload = SendPhoto {
                    chat_id,
                    photo,
                    caption: &caption,
                    parse_mode: "HTML",
                    reply_markup: Self::keyboard(game),
                };
                self.call("sendPhoto", &payload).await
            }
            _ => {
                let payload = SendMessage {
                    chat_id,
                    text: &caption,
                    parse_mode: "HTML",
                    reply_markup: Some(Self::keyboard(game)),
                };
                self.call("sendMessage", &payload).await
            }
        }
    }
}
