//! Telegram Wire Types
//!
//! The subset of the Bot API the gateway consumes. Unknown payload fields
//! and update kinds are tolerated: an update carrying neither a message nor
//! a callback query is acknowledged and ignored.

mod client;

pub use client::{ChatTransport, TelegramClient};

use serde::{Deserialize, Serialize};

/// One incoming update from the webhook
#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// An incoming chat message
#[derive(Clone, Debug, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<TgUser>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

/// Message sender
#[derive(Clone, Debug, Deserialize)]
pub struct TgUser {
    pub id: i64,
}

/// Chat the message arrived in
#[derive(Clone, Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// A callback query fired by an inline keyboard button
#[derive(Clone, Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TgUser,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
    #[serde(default)]
    pub data: Option<String>,
}

/// Inline keyboard attached to an outgoing message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// One button per row, the layout every wizard keyboard uses
    pub fn single_column(buttons: Vec<InlineKeyboardButton>) -> Self {
        Self {
            inline_keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }
}

/// One inline keyboard button
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}
