//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates` and `sendMessage` for responses.
//! Docs: <https://core.telegram.org/bots/api>

mod convert;
mod polling;
pub(crate) mod send;
pub(crate) mod types;


use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use warden_core::config::TelegramConfig;

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    client: reqwest::Client,
    base_url: String,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
    /// Bot username from `getMe`, without the `@`.
    username: OnceLock<String>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: TelegramConfig) -> Self {
        let base_url = format!("https://api.telegram.org/bot{}", config.bot_token);
        Self {
            client: reqwest::Client::new(),
            base_url,
            last_update_id: Arc::new(Mutex::new(None)),
            username: OnceLock::new(),
        }
    }

    /// The bot's username, once `start` has identified it.
    pub fn username(&self) -> Option<&str> {
        self.username.get().map(String::as_str)
    }
}
