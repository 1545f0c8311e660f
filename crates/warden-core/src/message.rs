use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The chat an incoming message was posted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInfo {
    /// Platform chat id. Equal to the user id for private chats.
    pub id: i64,
    /// Display name (full name for private chats, title for groups).
    pub name: String,
    /// Public handle without the leading `@`.
    #[serde(default)]
    pub username: Option<String>,
    /// Whether this is a one-to-one chat with a user.
    #[serde(default)]
    pub is_private: bool,
}

/// An incoming message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    /// Platform message id, used for reply references.
    pub message_id: i64,
    pub chat: ChatInfo,
    /// Platform user id of the sender. Differs from `chat.id` in groups.
    pub sender_id: i64,
    /// Human-readable sender name.
    pub sender_name: Option<String>,
    /// Raw message text.
    pub text: String,
    /// Command name without the leading slash or `@bot` suffix.
    #[serde(default)]
    pub command: Option<String>,
    /// Everything after the command, trimmed. `None` when empty.
    #[serde(default)]
    pub args: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Sent while the bot was offline and delivered on startup.
    #[serde(default)]
    pub queued: bool,
    /// An edit of an earlier message.
    #[serde(default)]
    pub edited: bool,
}

impl IncomingMessage {
    /// First whitespace-separated word of the argument string.
    pub fn first_arg(&self) -> Option<&str> {
        self.args.as_deref().and_then(|a| a.split_whitespace().next())
    }

    /// Whether the message carries the given command.
    pub fn is_command(&self, name: &str) -> bool {
        self.command.as_deref() == Some(name)
    }
}

/// What an outgoing message contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageBody {
    /// Plain text, sent verbatim.
    Text(String),
    /// HTML-formatted text. Interpolated values must go through [`escape_html`].
    Html(String),
    /// A ready-to-send command suggestion, e.g. `/revoke 200`.
    /// `addressed` appends the bot's username (`/start@bot token`).
    Command {
        name: String,
        args: Vec<String>,
        addressed: bool,
    },
}

/// An outgoing message to send back through a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Platform chat id to deliver to.
    pub target: i64,
    pub body: MessageBody,
    /// Message id this one replies to.
    #[serde(default)]
    pub reply_to: Option<i64>,
    #[serde(default)]
    pub disable_preview: bool,
}

impl OutgoingMessage {
    pub fn text(target: i64, text: impl Into<String>) -> Self {
        Self::with_body(target, MessageBody::Text(text.into()))
    }

    pub fn html(target: i64, html: impl Into<String>) -> Self {
        Self::with_body(target, MessageBody::Html(html.into()))
    }

    pub fn command(target: i64, name: &str, args: &[&str]) -> Self {
        Self::with_body(
            target,
            MessageBody::Command {
                name: name.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                addressed: false,
            },
        )
    }

    fn with_body(target: i64, body: MessageBody) -> Self {
        Self {
            target,
            body,
            reply_to: None,
            disable_preview: false,
        }
    }

    /// Reply to a specific message in the target chat.
    pub fn replying_to(mut self, message_id: i64) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    pub fn without_preview(mut self) -> Self {
        self.disable_preview = true;
        self
    }

    /// Address a command suggestion to this bot. No-op for other bodies.
    pub fn addressed(mut self) -> Self {
        if let MessageBody::Command {
            ref mut addressed, ..
        } = self.body
        {
            *addressed = true;
        }
        self
    }

    /// The text content, regardless of formatting.
    pub fn text_content(&self) -> String {
        match &self.body {
            MessageBody::Text(t) | MessageBody::Html(t) => t.clone(),
            MessageBody::Command { name, args, .. } => render_command(name, args, None),
        }
    }
}

/// Render a command suggestion as message text.
pub fn render_command(name: &str, args: &[String], bot_username: Option<&str>) -> String {
    let mut out = format!("/{name}");
    if let Some(bot) = bot_username {
        out.push('@');
        out.push_str(bot);
    }
    for arg in args {
        out.push(' ');
        out.push_str(arg);
    }
    out
}

/// Split message text into `(command, args)`.
///
/// Returns `None` when the text is not a command, or when it is addressed
/// to a different bot (`/cmd@other_bot`).
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<(String, Option<String>)> {
    let text = text.trim_start();
    let rest = text.strip_prefix('/')?;
    let (head, tail) = match rest.find(char::is_whitespace) {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };

    let (name, mention) = match head.split_once('@') {
        Some((n, m)) => (n, Some(m)),
        None => (head, None),
    };
    if name.is_empty() {
        return None;
    }
    if let (Some(mention), Some(bot)) = (mention, bot_username) {
        if !mention.eq_ignore_ascii_case(bot) {
            return None;
        }
    }

    let args = tail.trim();
    let args = (!args.is_empty()).then(|| args.to_string());
    Some((name.to_lowercase(), args))
}

/// Escape text for interpolation into HTML-formatted messages.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
