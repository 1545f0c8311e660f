//! Remote control commands: /on, /off, /status, /everything.
//!
//! These call an external API and are run off the event loop.

use tracing::warn;
use warden_core::{
    message::{escape_html, OutgoingMessage},
    traits::ControlApi,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    /// Enable development mode.
    On,
    /// Disable development mode.
    Off,
    /// Report development mode.
    Status,
    /// Purge the whole cache.
    PurgeAll,
}

impl RemoteAction {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            "status" => Some(Self::Status),
            "everything" => Some(Self::PurgeAll),
            _ => None,
        }
    }
}

/// Run `action` and build the reply for `chat`.
pub async fn execute(
    action: RemoteAction,
    control: Option<&dyn ControlApi>,
    chat: i64,
) -> OutgoingMessage {
    let Some(api) = control else {
        return OutgoingMessage::html(chat, "Remote control is not configured.");
    };

    let result = match action {
        RemoteAction::On => api.set_development_mode(true).await.map(mode_reply),
        RemoteAction::Off => api.set_development_mode(false).await.map(mode_reply),
        RemoteAction::Status => api.development_mode().await.map(mode_reply),
        RemoteAction::PurgeAll => api.purge_everything().await.map(|ok| {
            if ok {
                "Cache purged. It can take up to 30 seconds.".to_string()
            } else {
                "Cache purge failed.".to_string()
            }
        }),
    };

    match result {
        Ok(text) => OutgoingMessage::html(chat, text),
        Err(e) => {
            warn!("{} {action:?} failed: {e}", api.name());
            OutgoingMessage::html(chat, format!("Got error: {}", escape_html(&e.to_string())))
        }
    }
}

fn mode_reply(value: String) -> String {
    format!("Development Mode = {}", escape_html(&value))
}
