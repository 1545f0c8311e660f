//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "warden".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_deny_message() -> String {
    "Not authorized to use this bot.".to_string()
}

pub fn default_shells() -> Vec<String> {
    vec!["bash".to_string(), "sh".to_string()]
}

pub fn default_cloudflare_api_url() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}
