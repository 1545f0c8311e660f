//! Mapping Telegram updates onto channel-neutral messages.

use super::types::{TgChat, TgMessage, TgUser};
use chrono::{TimeZone, Utc};
use uuid::Uuid;
use warden_core::message::{parse_command, ChatInfo, IncomingMessage};

/// Convert a Telegram message. Returns `None` for messages without text
/// or without a sender (channel posts).
///
/// Messages sent before `started_at` (unix seconds) are flagged `queued`.
pub(crate) fn to_incoming(
    msg: TgMessage,
    edited: bool,
    bot_username: Option<&str>,
    started_at: i64,
) -> Option<IncomingMessage> {
    let text = msg.text?;
    let user = msg.from?;

    let (command, args) = match parse_command(&text, bot_username) {
        Some((c, a)) => (Some(c), a),
        None => (None, None),
    };

    let sent_at = if edited {
        msg.edit_date.unwrap_or(msg.date)
    } else {
        msg.date
    };
    let timestamp = Utc
        .timestamp_opt(sent_at, 0)
        .single()
        .unwrap_or_else(Utc::now);

    Some(IncomingMessage {
        id: Uuid::new_v4(),
        channel: "telegram".to_string(),
        message_id: msg.message_id,
        chat: chat_info(&msg.chat),
        sender_id: user.id,
        sender_name: Some(display_user(&user)),
        text,
        command,
        args,
        timestamp,
        queued: sent_at < started_at,
        edited,
    })
}

fn chat_info(chat: &TgChat) -> ChatInfo {
    let is_private = chat.chat_type == "private";
    let name = if is_private {
        match (&chat.first_name, &chat.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            _ => chat.id.to_string(),
        }
    } else {
        chat.title.clone().unwrap_or_else(|| chat.id.to_string())
    };

    ChatInfo {
        id: chat.id,
        name,
        username: chat.username.clone(),
        is_private,
    }
}

fn display_user(user: &TgUser) -> String {
    if let Some(ref un) = user.username {
        format!("@{un}")
    } else if let Some(ref ln) = user.last_name {
        format!("{} {ln}", user.first_name)
    } else {
        user.first_name.clone()
    }
}
