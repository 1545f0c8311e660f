//! Built-in bot commands. Every handler runs after the access decision and
//! receives the resolved session context.

mod access;
pub mod remote;
mod settings;
mod status;


pub use remote::RemoteAction;

use std::time::Instant;
use warden_auth::{Access, Gatekeeper};
use warden_core::{
    message::{IncomingMessage, OutgoingMessage},
    traits::Channel,
};

/// Grouped context for command execution.
pub struct CommandContext<'a> {
    pub gate: &'a Gatekeeper,
    pub incoming: &'a IncomingMessage,
    pub access: &'a Access,
    /// Channel the command arrived on, for deep links.
    pub channel: &'a dyn Channel,
    pub uptime: &'a Instant,
}

impl CommandContext<'_> {
    /// Chat replies go to.
    fn chat(&self) -> i64 {
        self.incoming.chat.id
    }

    fn args(&self) -> Option<&str> {
        self.incoming.args.as_deref()
    }

    fn first_arg(&self) -> Option<&str> {
        self.incoming.first_arg()
    }

    fn reply_text(&self, text: impl Into<String>) -> OutgoingMessage {
        OutgoingMessage::text(self.chat(), text)
    }

    fn reply_html(&self, html: impl Into<String>) -> OutgoingMessage {
        OutgoingMessage::html(self.chat(), html)
    }
}

/// Known local commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Token,
    Grant,
    Revoke,
    SrvStatus,
    Cd,
    Resize,
    SetShell,
    SetSilent,
    SetInteractive,
    LinkPreviews,
}

impl Command {
    /// Parse a command name (already stripped of `/` and `@bot`).
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "token" => Some(Self::Token),
            "grant" => Some(Self::Grant),
            "revoke" => Some(Self::Revoke),
            "srvstatus" => Some(Self::SrvStatus),
            "cd" => Some(Self::Cd),
            "resize" => Some(Self::Resize),
            "setshell" => Some(Self::SetShell),
            "setsilent" => Some(Self::SetSilent),
            "setinteractive" => Some(Self::SetInteractive),
            "linkpreviews" => Some(Self::LinkPreviews),
            _ => None,
        }
    }
}

/// Handle a command and return the replies to deliver, in order.
pub fn handle(cmd: Command, ctx: &CommandContext<'_>) -> Vec<OutgoingMessage> {
    match cmd {
        Command::Start => access::handle_start(ctx),
        Command::Help => vec![status::handle_help(ctx)],
        Command::Token => access::handle_token(ctx),
        Command::Grant => access::handle_grant(ctx),
        Command::Revoke => access::handle_revoke(ctx),
        Command::SrvStatus => vec![status::handle_srvstatus(ctx)],
        Command::Cd => vec![settings::handle_cd(ctx)],
        Command::Resize => vec![settings::handle_resize(ctx)],
        Command::SetShell => vec![settings::handle_setshell(ctx)],
        Command::SetSilent => vec![settings::handle_setsilent(ctx)],
        Command::SetInteractive => vec![settings::handle_setinteractive(ctx)],
        Command::LinkPreviews => vec![settings::handle_linkpreviews(ctx)],
    }
}
