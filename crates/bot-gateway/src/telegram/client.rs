//! Outbound Chat Transport
//!
//! `ChatTransport` is the narrow seam to the chat service; the production
//! implementation is a thin reqwest client over the Telegram Bot API. Tests
//! inject a recording double instead.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::InlineKeyboardMarkup;
use crate::error::{GatewayError, Result};

/// Outbound operations the bot performs against the chat service
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a new text message
    async fn send_text(&self, chat_id: i64, text: &str, markdown: bool) -> Result<()>;

    /// Send a new message carrying an inline keyboard
    async fn send_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<()>;

    /// Edit an existing message in place (text and keyboard)
    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<()>;

    /// Acknowledge a callback query so the client stops its spinner
    async fn answer_callback(&self, callback_id: &str) -> Result<()>;

    /// Register the webhook URL with the chat service
    async fn set_webhook(&self, url: &str) -> Result<()>;
}

/// Telegram Bot API envelope
#[derive(Deserialize)]
struct ApiAck {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Production transport speaking the Telegram Bot API
pub struct TelegramClient {
    client: reqwest::Client,
    base: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base: format!("https://api.telegram.org/bot{token}"),
        })
    }

    async fn call(&self, method: &str, payload: serde_json::Value) -> Result<()> {
        let url = format!("{}/{}", self.base, method);
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("{method}: {e}")))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "{method}: HTTP {status}: {body}"
            )));
        }

        let ack: ApiAck = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Transport(format!("{method}: bad response: {e}")))?;
        if !ack.ok {
            return Err(GatewayError::Transport(format!(
                "{method}: {}",
                ack.description.unwrap_or_else(|| "rejected".into())
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str, markdown: bool) -> Result<()> {
        let mut payload = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if markdown {
            payload["parse_mode"] = serde_json::json!("Markdown");
        }
        self.call("sendMessage", payload).await
    }

    async fn send_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "reply_markup": keyboard,
        });
        self.call("sendMessage", payload).await
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut payload = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        if let Some(keyboard) = keyboard {
            payload["reply_markup"] = serde_json::to_value(keyboard)
                .map_err(|e| GatewayError::Transport(format!("editMessageText: {e}")))?;
        }
        self.call("editMessageText", payload).await
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.call(
            "answerCallbackQuery",
            serde_json::json!({ "callback_query_id": callback_id }),
        )
        .await
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        self.call("setWebhook", serde_json::json!({ "url": url }))
            .await
    }
}
