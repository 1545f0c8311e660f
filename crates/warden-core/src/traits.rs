use crate::{
    error::WardenError,
    message::{IncomingMessage, OutgoingMessage},
};
use async_trait::async_trait;

/// Messaging Channel trait — the transport adapter.
///
/// Every messaging platform implements this trait to receive and send
/// messages. Authorization happens downstream, in the gateway.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    /// Returns a receiver that yields incoming messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, WardenError>;

    /// Send a message through this channel.
    async fn send(&self, message: OutgoingMessage) -> Result<(), WardenError>;

    /// A link that opens a chat with the bot and submits `payload` as the
    /// argument of the start command. `None` until the bot identity is known.
    fn deep_link(&self, _payload: &str) -> Option<String> {
        None
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), WardenError>;
}

/// Remote control API trait — the third-party service the bot toggles.
#[async_trait]
pub trait ControlApi: Send + Sync {
    /// Human-readable service name.
    fn name(&self) -> &str;

    /// Current development mode value (e.g. "on" / "off").
    async fn development_mode(&self) -> Result<String, WardenError>;

    /// Switch development mode, returning the value reported back.
    async fn set_development_mode(&self, enabled: bool) -> Result<String, WardenError>;

    /// Purge the whole cache. Returns whether the service reported success.
    async fn purge_everything(&self) -> Result<bool, WardenError>;
}
