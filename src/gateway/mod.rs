//! Gateway: the event loop connecting channels, the access decision engine,
//! and command handlers.

mod pipeline;


use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};
use warden_auth::Gatekeeper;
use warden_core::{
    message::{IncomingMessage, OutgoingMessage},
    traits::{Channel, ControlApi},
};

/// The central gateway that routes messages between channels and handlers.
pub struct Gateway {
    pub(super) gate: Arc<Gatekeeper>,
    pub(super) channels: HashMap<String, Arc<dyn Channel>>,
    pub(super) control: Option<Arc<dyn ControlApi>>,
    pub(super) uptime: Instant,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(
        gate: Arc<Gatekeeper>,
        channels: HashMap<String, Arc<dyn Channel>>,
        control: Option<Arc<dyn ControlApi>>,
    ) -> Self {
        Self {
            gate,
            channels,
            control,
            uptime: Instant::now(),
        }
    }

    /// Run the main event loop until ctrl-c or every channel closes.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "Warden gateway running | owner: {} | channels: {} | control: {}",
            self.gate.owner(),
            self.channels.keys().cloned().collect::<Vec<_>>().join(", "),
            self.control.as_ref().map_or("none", |c| c.name()),
        );

        let (tx, mut rx) = mpsc::channel::<IncomingMessage>(256);

        for (name, channel) in &self.channels {
            let mut channel_rx = channel
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start channel {name}: {e}"))?;
            let tx = tx.clone();
            let channel_name = name.clone();

            tokio::spawn(async move {
                while let Some(msg) = channel_rx.recv().await {
                    if tx.send(msg).await.is_err() {
                        info!("gateway receiver dropped, stopping {channel_name} forwarder");
                        break;
                    }
                }
            });

            info!("Channel started: {name}");
        }

        drop(tx);

        // One event at a time, in delivery order.
        loop {
            tokio::select! {
                incoming = rx.recv() => match incoming {
                    Some(incoming) => self.handle_message(incoming).await,
                    None => {
                        warn!("all channels closed");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&self) {
        for (name, channel) in &self.channels {
            if let Err(e) = channel.stop().await {
                warn!("failed to stop channel {name}: {e}");
            }
        }
        info!("Warden gateway stopped");
    }

    /// Send one message through the named channel, logging failures.
    pub(super) async fn deliver(&self, channel_name: &str, message: OutgoingMessage) {
        deliver_via(self.channels.get(channel_name), channel_name, message).await;
    }

    /// Send messages in order through the named channel.
    pub(super) async fn deliver_all(&self, channel_name: &str, messages: Vec<OutgoingMessage>) {
        for message in messages {
            self.deliver(channel_name, message).await;
        }
    }
}

async fn deliver_via(
    channel: Option<&Arc<dyn Channel>>,
    channel_name: &str,
    message: OutgoingMessage,
) {
    let Some(channel) = channel else {
        warn!("no channel named {channel_name}, dropping reply to {}", message.target);
        return;
    };
    if let Err(e) = channel.send(message).await {
        warn!("failed to send via {channel_name}: {e}");
    }
}
