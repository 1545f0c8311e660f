//! Environment sanitization for spawned shells.
//!
//! Shells started on behalf of a chat inherit the bot's environment, minus:
//! - The bot's own credentials (bot token, control API keys)
//! - Terminal geometry inherited from the launching terminal
//! - Package-manager noise

use std::collections::BTreeMap;

/// Terminal type advertised to spawned shells.
pub const SHELL_TERM: &str = "xterm-256color";

const STRIPPED_PREFIXES: &[&str] = &["WARDEN_", "CLOUDFLARE_", "CF_", "npm_"];

const STRIPPED_KEYS: &[&str] = &["TELEGRAM_BOT_TOKEN", "TERM", "COLUMNS", "LINES"];

/// Result of sanitizing an environment.
#[derive(Debug, Clone, Default)]
pub struct SanitizedEnv {
    /// The variables a shell should start with.
    pub vars: BTreeMap<String, String>,
    /// Keys that were dropped.
    pub removed: Vec<String>,
}

/// Sanitize an arbitrary set of variables.
pub fn sanitize_env<I>(vars: I) -> SanitizedEnv
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut kept = BTreeMap::new();
    let mut removed = Vec::new();

    for (key, value) in vars {
        let strip = STRIPPED_KEYS.contains(&key.as_str())
            || STRIPPED_PREFIXES.iter().any(|p| key.starts_with(p));
        if strip {
            removed.push(key);
        } else {
            kept.insert(key, value);
        }
    }

    kept.insert("TERM".to_string(), SHELL_TERM.to_string());
    removed.sort();

    SanitizedEnv {
        vars: kept,
        removed,
    }
}

/// Sanitize the current process environment.
pub fn inherited_env() -> SanitizedEnv {
    sanitize_env(std::env::vars())
}
