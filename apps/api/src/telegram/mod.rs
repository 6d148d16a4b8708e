//! Telegram Bot API client — message delivery for nudges and webhook acks.
//!
//! Delivery is fire-and-forget from the system's point of view: the only
//! result we keep is the message_id, stored on the nudge so later replies
//! can be correlated back to it.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error: {0}")]
    Api(String),

    #[error("Telegram response missing message_id")]
    MissingMessageId,
}

#[derive(Debug, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    description: Option<String>,
    result: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    bot_token: String,
}

impl TelegramClient {
    pub fn new(bot_token: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            bot_token,
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{TELEGRAM_API_BASE}/bot{}/{method}", self.bot_token)
    }

    async fn post(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, TelegramError> {
        let envelope: ApiEnvelope = self
            .client
            .post(self.url(method))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if !envelope.ok {
            return Err(TelegramError::Api(
                envelope.description.unwrap_or_else(|| "unknown".to_string()),
            ));
        }

        Ok(envelope.result.unwrap_or(serde_json::Value::Null))
    }

    /// Sends a Markdown text message, optionally with an inline keyboard.
    /// Returns the raw result object (contains message_id).
    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        reply_markup: Option<&InlineKeyboard>,
    ) -> Result<serde_json::Value, TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = serde_json::to_value(markup).map_err(|e| {
                TelegramError::Api(format!("failed to serialize reply_markup: {e}"))
            })?;
        }

        debug!(chat_id, "Sending Telegram message");
        self.post("sendMessage", body).await
    }

    /// Acknowledges a button press so the client stops showing a spinner.
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<(), TelegramError> {
        let mut body = json!({ "callback_query_id": callback_query_id });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        self.post("answerCallbackQuery", body).await?;
        Ok(())
    }

    /// Sends a nudge with the three-button action keyboard. Callback payloads
    /// are "<action>:<nudge_id>" strings parsed back by the webhook handler.
    /// Returns the message_id for reply correlation.
    pub async fn send_nudge(
        &self,
        chat_id: &str,
        nudge_id: Uuid,
        message_text: &str,
    ) -> Result<String, TelegramError> {
        let keyboard = nudge_keyboard(nudge_id);
        let result = self
            .send_message(chat_id, message_text, Some(&keyboard))
            .await?;

        result
            .get("message_id")
            .map(|id| id.to_string().trim_matches('"').to_string())
            .ok_or(TelegramError::MissingMessageId)
    }
}

/// Two-row keyboard: [On it! | Snooze 1h] / [Busy today].
fn nudge_keyboard(nudge_id: Uuid) -> InlineKeyboard {
    InlineKeyboard {
        inline_keyboard: vec![
            vec![
                InlineKeyboardButton {
                    text: "On it!".to_string(),
                    callback_data: format!("on_it:{nudge_id}"),
                },
                InlineKeyboardButton {
                    text: "Snooze 1h".to_string(),
                    callback_data: format!("snooze_1h:{nudge_id}"),
                },
            ],
            vec![InlineKeyboardButton {
                text: "Busy today".to_string(),
                callback_data: format!("busy_today:{nudge_id}"),
            }],
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nudge_keyboard_callback_payloads() {
        let id = Uuid::new_v4();
        let keyboard = nudge_keyboard(id);
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(keyboard.inline_keyboard[0].len(), 2);
        assert_eq!(keyboard.inline_keyboard[1].len(), 1);
        assert_eq!(
            keyboard.inline_keyboard[0][0].callback_data,
            format!("on_it:{id}")
        );
        assert_eq!(
            keyboard.inline_keyboard[1][0].callback_data,
            format!("busy_today:{id}")
        );
    }
}
