//! Access delegation commands: /start, /token, /grant, /revoke.

use super::CommandContext;
use tracing::{debug, info};
use warden_auth::{AuthError, GrantOutcome};
use warden_core::message::{escape_html, OutgoingMessage};

const USAGE: &str = "Use /grant &lt;id&gt; or /revoke &lt;id&gt; to control whether the chat with that ID can use this bot.";

pub(super) fn handle_start(ctx: &CommandContext<'_>) -> Vec<OutgoingMessage> {
    // The owner opening their own link withdraws the token instead of
    // leaving it usable.
    if let Some(token) = ctx.args() {
        if let Ok(true) = ctx.gate.withdraw_token(ctx.access.context_key, token) {
            return vec![
                ctx.reply_html("You were already authenticated; the token has been revoked.")
            ];
        }
    }
    vec![ctx.reply_html("Welcome! Use /help for more info.")]
}

pub(super) fn handle_token(ctx: &CommandContext<'_>) -> Vec<OutgoingMessage> {
    let token = match ctx.gate.issue_token(ctx.access.context_key) {
        Ok(t) => t,
        Err(e) => {
            debug!("token request ignored: {e}");
            return Vec::new();
        }
    };

    let intro = match ctx.channel.deep_link(&token) {
        Some(link) => format!(
            "One-time access token generated. The following link can be used to get access to the bot:\n{}\nOr by forwarding me this:",
            escape_html(&link)
        ),
        None => "One-time access token generated. Forward me this to get access to the bot:"
            .to_string(),
    };

    vec![
        ctx.reply_html(intro).without_preview(),
        OutgoingMessage::command(ctx.chat(), "start", &[token.as_str()]).addressed(),
    ]
}

pub(super) fn handle_grant(ctx: &CommandContext<'_>) -> Vec<OutgoingMessage> {
    match ctx.gate.grant(ctx.access.context_key, ctx.incoming.first_arg()) {
        Ok((id, GrantOutcome::Owner)) => vec![ctx
            .reply_html(format!("Chat {id} is the owner and always has access."))
            .replying_to(ctx.incoming.message_id)],
        Ok((id, _)) => vec![ctx
            .reply_html(format!(
                "Chat {id} can now use this bot. Use /revoke to undo."
            ))
            .replying_to(ctx.incoming.message_id)],
        Err(e) => access_error(ctx, e),
    }
}

pub(super) fn handle_revoke(ctx: &CommandContext<'_>) -> Vec<OutgoingMessage> {
    match ctx.gate.revoke(ctx.access.context_key, ctx.incoming.first_arg()) {
        Ok((id, outcome)) => {
            info!("revoke {id}: {outcome:?}");
            vec![ctx
                .reply_html(format!("Chat {id} has been revoked successfully."))
                .replying_to(ctx.incoming.message_id)]
        }
        Err(e) => access_error(ctx, e),
    }
}

fn access_error(ctx: &CommandContext<'_>, err: AuthError) -> Vec<OutgoingMessage> {
    let reply = match err {
        AuthError::Unauthorized => {
            debug!(
                "{} from non-owner context {} ignored",
                ctx.incoming.command.as_deref().unwrap_or("command"),
                ctx.access.context_key
            );
            return Vec::new();
        }
        AuthError::InvalidArgument(_) => return vec![ctx.reply_html(USAGE)],
        AuthError::OperationInProgress(_) => {
            ctx.reply_html("Couldn't revoke specified chat because a command is running.")
        }
        AuthError::OwnerUnrevokable => ctx.reply_html("The owner's chat can't be revoked."),
    };
    vec![reply.replying_to(ctx.incoming.message_id)]
}
