mod channels;
mod defaults;


pub use channels::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::WardenError;
use defaults::*;

/// Env var consulted when `channel.telegram.bot_token` is empty.
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Top-level Warden configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub warden: WardenConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub cloudflare: CloudflareConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Append logs to this file in addition to stderr.
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

/// Authorization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Chat id of the single owner. Always authorized, never revocable.
    pub owner: i64,
    /// Message sent when an unauthorized chat uses the start command.
    #[serde(default = "default_deny_message")]
    pub deny_message: String,
}

/// Defaults for freshly created session contexts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Shell candidates in order of preference. The first one found is the default.
    #[serde(default = "default_shells")]
    pub shells: Vec<String>,
    /// Starting directory. Empty = `$HOME`, then the process directory.
    #[serde(default)]
    pub default_cwd: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            shells: default_shells(),
            default_cwd: String::new(),
        }
    }
}

impl SessionConfig {
    /// Resolve the starting directory for new sessions.
    pub fn resolve_cwd(&self) -> PathBuf {
        if !self.default_cwd.is_empty() {
            return PathBuf::from(shellexpand(&self.default_cwd));
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home);
        }
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))
    }

    /// Shell candidates that exist on this host, keeping configured order.
    /// Falls back to the configured list when none can be located.
    pub fn resolve_shells(&self) -> Vec<String> {
        let found: Vec<String> = self
            .shells
            .iter()
            .filter(|s| locate_executable(s).is_some())
            .cloned()
            .collect();
        if found.is_empty() {
            self.shells.clone()
        } else {
            found
        }
    }
}

/// Cloudflare zone API credentials for the remote control commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudflareConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub auth_email: String,
    #[serde(default)]
    pub auth_key: String,
    #[serde(default = "default_cloudflare_api_url")]
    pub api_url: String,
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            zone: String::new(),
            auth_email: String::new(),
            auth_key: String::new(),
            api_url: default_cloudflare_api_url(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Find an executable by absolute path or on `$PATH`.
fn locate_executable(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|p| p.is_file())
}

impl Config {
    /// Parse a config from TOML text and validate it.
    pub fn from_toml(content: &str) -> Result<Self, WardenError> {
        let mut config: Config = toml::from_str(content)
            .map_err(|e| WardenError::Config(format!("failed to parse config: {e}")))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(ref mut tg) = self.channel.telegram {
            if tg.bot_token.is_empty() {
                if let Ok(token) = std::env::var(BOT_TOKEN_ENV) {
                    tg.bot_token = token;
                }
            }
        }
    }

    fn validate(&self) -> Result<(), WardenError> {
        if self.auth.owner == 0 {
            return Err(WardenError::Config(
                "auth.owner must be set to the owner's chat id".to_string(),
            ));
        }
        if self.session.shells.is_empty() {
            return Err(WardenError::Config(
                "session.shells must list at least one shell".to_string(),
            ));
        }
        if self.cloudflare.enabled
            && (self.cloudflare.zone.is_empty()
                || self.cloudflare.auth_email.is_empty()
                || self.cloudflare.auth_key.is_empty())
        {
            return Err(WardenError::Config(
                "cloudflare is enabled but zone, auth_email or auth_key is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from a TOML file.
///
/// The owner id has no sensible default, so a missing file is an error.
/// Runs before logging is set up, so it reports only through its result.
pub fn load(path: &str) -> Result<Config, WardenError> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(WardenError::Config(format!(
            "config file not found at {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| WardenError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    Config::from_toml(&content)
}
