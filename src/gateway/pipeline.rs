//! Message processing pipeline: the handle_message flow.

use super::Gateway;
use crate::commands::{self, remote, Command, CommandContext, RemoteAction};
use tracing::{debug, info, warn};
use warden_core::message::{IncomingMessage, OutgoingMessage};

impl Gateway {
    /// Process a single incoming message through the full pipeline.
    pub(super) async fn handle_message(&self, incoming: IncomingMessage) {
        let preview = if incoming.text.chars().count() > 60 {
            let truncated: String = incoming.text.chars().take(60).collect();
            format!("{truncated}...")
        } else {
            incoming.text.clone()
        };
        info!(
            "[{}] {} in chat {} says: {}",
            incoming.channel,
            incoming.sender_name.as_deref().unwrap_or("unknown"),
            incoming.chat.id,
            preview
        );

        // --- 1. DROP BACKLOG ---
        if incoming.queued {
            debug!("dropping message sent before startup in chat {}", incoming.chat.id);
            return;
        }

        // --- 2. ACCESS DECISION ---
        let resolution = self.gate.resolve(&incoming);
        self.deliver_all(&incoming.channel, resolution.outbox.clone())
            .await;
        let Some(access) = resolution.access() else {
            return;
        };
        debug!(
            "chat {} authorized via {:?}, context {}",
            incoming.chat.id, access.path, access.context_key
        );

        let Some(name) = incoming.command.as_deref() else {
            debug!("ignoring non-command text in chat {}", incoming.chat.id);
            return;
        };

        // --- 3. REMOTE CONTROL (off the loop) ---
        if let Some(action) = RemoteAction::parse(name) {
            let channel = self.channels.get(&incoming.channel).cloned();
            let control = self.control.clone();
            let channel_name = incoming.channel.clone();
            let chat = incoming.chat.id;
            tokio::spawn(async move {
                let reply = remote::execute(action, control.as_deref(), chat).await;
                super::deliver_via(channel.as_ref(), &channel_name, reply).await;
            });
            return;
        }

        // --- 4. LOCAL COMMANDS ---
        let Some(cmd) = Command::parse(name) else {
            self.deliver(
                &incoming.channel,
                OutgoingMessage::text(incoming.chat.id, "Invalid command.")
                    .replying_to(incoming.message_id),
            )
            .await;
            return;
        };

        let Some(channel) = self.channels.get(&incoming.channel) else {
            warn!("message from unknown channel {}", incoming.channel);
            return;
        };
        let replies = {
            let ctx = CommandContext {
                gate: &self.gate,
                incoming: &incoming,
                access,
                channel: channel.as_ref(),
                uptime: &self.uptime,
            };
            commands::handle(cmd, &ctx)
        };
        self.deliver_all(&incoming.channel, replies).await;
    }
}
