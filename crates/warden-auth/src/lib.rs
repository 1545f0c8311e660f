//! # warden-auth
//!
//! The authorization subsystem: every inbound event is resolved here before
//! any command handler runs.
//!
//! - [`tokens`]: one-time delegation tokens issued by the owner.
//! - [`grants`]: chats granted access beyond the owner.
//! - [`session`]: per-chat mutable session contexts.
//! - [`gate`]: the access decision engine that ties the three together.

pub mod error;
pub mod gate;
pub mod grants;
pub mod session;
pub mod tokens;

pub use error::AuthError;
pub use gate::{Access, AccessPath, Decision, Gatekeeper, GrantOutcome, Resolution, RevokeOutcome};
pub use session::{OperationHandle, SessionContext, SessionDefaults, SharedSession, TerminalSize};
