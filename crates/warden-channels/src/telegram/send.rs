//! Message sending and command registration.

use super::TelegramChannel;
use crate::utils::{split_message, Markup};
use serde_json::{json, Value};
use tracing::{info, warn};
use warden_core::error::WardenError;
use warden_core::message::{render_command, MessageBody, OutgoingMessage};

/// Telegram's per-message character limit.
pub(crate) const MAX_MESSAGE_LEN: usize = 4096;

/// Commands advertised in the client's autocomplete menu.
const BOT_COMMANDS: &[(&str, &str)] = &[
    ("start", "Start using the bot"),
    ("help", "Show available commands"),
    ("token", "Generate a one-time access link"),
    ("grant", "Allow a chat to use the bot"),
    ("revoke", "Revoke a chat's access"),
    ("srvstatus", "Show host status"),
    ("cd", "Change working directory"),
    ("resize", "Set terminal size"),
    ("setshell", "Choose the shell"),
    ("setsilent", "Toggle silent output"),
    ("setinteractive", "Toggle interactive mode"),
    ("linkpreviews", "Toggle link previews"),
    ("on", "Enable development mode"),
    ("off", "Disable development mode"),
    ("status", "Show development mode"),
    ("everything", "Purge the whole cache"),
];

/// Build the `sendMessage` bodies for one outgoing message.
///
/// Long texts are split, HTML ones without breaking markup. Only the first
/// chunk carries the reply reference.
pub(crate) fn build_payloads(message: &OutgoingMessage, bot_username: Option<&str>) -> Vec<Value> {
    let (text, parse_mode) = match &message.body {
        MessageBody::Text(t) => (t.clone(), None),
        MessageBody::Html(h) => (h.clone(), Some("HTML")),
        MessageBody::Command {
            name,
            args,
            addressed,
        } => {
            let bot = if *addressed { bot_username } else { None };
            (render_command(name, args, bot), None)
        }
    };

    let markup = if parse_mode.is_some() {
        Markup::Html
    } else {
        Markup::Plain
    };

    split_message(&text, MAX_MESSAGE_LEN, markup)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut body = json!({
                "chat_id": message.target,
                "text": chunk,
                "disable_web_page_preview": message.disable_preview,
            });
            if let Some(mode) = parse_mode {
                body["parse_mode"] = json!(mode);
            }
            if let (0, Some(reply_to)) = (i, message.reply_to) {
                body["reply_to_message_id"] = json!(reply_to);
                body["allow_sending_without_reply"] = json!(true);
            }
            body
        })
        .collect()
}

impl TelegramChannel {
    /// Post one prepared `sendMessage` body.
    pub(crate) async fn post_message(&self, body: Value) -> Result<(), WardenError> {
        let url = format!("{}/sendMessage", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WardenError::Channel(format!("telegram send failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(WardenError::Channel(format!(
                "telegram send failed ({status}): {error_text}"
            )));
        }
        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands: Vec<Value> = BOT_COMMANDS
            .iter()
            .map(|(command, description)| json!({ "command": command, "description": description }))
            .collect();

        let url = format!("{}/setMyCommands", self.base_url);
        match self
            .client
            .post(&url)
            .json(&json!({ "commands": commands }))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!("registered Telegram bot commands");
            }
            Ok(resp) => {
                let body = resp.text().await.unwrap_or_default();
                warn!("failed to register Telegram bot commands: {body}");
            }
            Err(e) => {
                warn!("failed to register Telegram bot commands: {e}");
            }
        }
    }
}
