use serde::{Deserialize, Serialize};

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub telegram: Option<TelegramConfig>,
}

/// Telegram bot config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "super::defaults::default_true")]
    pub enabled: bool,
    /// Bot API token. Falls back to the `TELEGRAM_BOT_TOKEN` env var when empty.
    #[serde(default)]
    pub bot_token: String,
}
