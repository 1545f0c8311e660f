//! Access decision engine.
//!
//! Every inbound event goes through [`Gatekeeper::resolve`] before any
//! handler sees it. The decision order is fixed:
//!
//! 1. chat is the owner
//! 2. chat holds a grant
//! 3. start command carrying an outstanding token (consumed, chat granted)
//! 4. sender is the owner or holds a grant (context keyed by the sender)
//! 5. rejected
//!
//! Token, grant and session registries sit behind one lock, so a decision
//! and the registry mutations it causes are atomic. Messages the decision
//! wants delivered (owner notification, rejection notice) come back in the
//! [`Resolution`] outbox instead of being sent from here.

#[cfg(test)]
mod tests;

use crate::error::AuthError;
use crate::grants::{parse_chat_id, GrantRegistry};
use crate::session::{SessionDefaults, SessionStore, SharedSession};
use crate::tokens::TokenRegistry;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use warden_core::message::{escape_html, IncomingMessage, OutgoingMessage};

/// Command that carries a delegation token.
pub const START_COMMAND: &str = "start";

const DEFAULT_DENY_MESSAGE: &str = "Not authorized to use this bot.";

/// Which rule authorized an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPath {
    Owner,
    Granted,
    Redeemed,
    /// The chat is not authorized but the sender is.
    Sender,
}

/// A positive decision.
#[derive(Debug, Clone)]
pub struct Access {
    /// Key of the session context handlers should use.
    pub context_key: i64,
    pub path: AccessPath,
    pub session: SharedSession,
}

#[derive(Debug, Clone)]
pub enum Decision {
    Authorized(Access),
    Rejected,
}

/// Decision plus the messages it queued for delivery.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub decision: Decision,
    pub outbox: Vec<OutgoingMessage>,
}

impl Resolution {
    pub fn access(&self) -> Option<&Access> {
        match &self.decision {
            Decision::Authorized(access) => Some(access),
            Decision::Rejected => None,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.access().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    AlreadyGranted,
    /// The id is the owner's; nothing is stored.
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked,
    NotGranted,
}

struct GateState {
    tokens: TokenRegistry,
    grants: GrantRegistry,
    sessions: SessionStore,
}

/// The authorization subsystem for a single owner.
pub struct Gatekeeper {
    owner: i64,
    deny_message: String,
    state: Mutex<GateState>,
}

impl Gatekeeper {
    pub fn new(owner: i64, defaults: SessionDefaults) -> Self {
        Self {
            owner,
            deny_message: DEFAULT_DENY_MESSAGE.to_string(),
            state: Mutex::new(GateState {
                tokens: TokenRegistry::new(),
                grants: GrantRegistry::new(),
                sessions: SessionStore::new(defaults),
            }),
        }
    }

    /// Override the notice sent to unauthorized chats on the start command.
    pub fn with_deny_message(mut self, message: impl Into<String>) -> Self {
        self.deny_message = message.into();
        self
    }

    pub fn owner(&self) -> i64 {
        self.owner
    }

    /// Whether a resolved context key acts as the owner.
    pub fn is_owner_key(&self, context_key: i64) -> bool {
        context_key == self.owner
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide whether `msg` may proceed, and resolve its session context.
    pub fn resolve(&self, msg: &IncomingMessage) -> Resolution {
        let mut state = self.state();
        let mut outbox = Vec::new();
        let chat_id = msg.chat.id;

        let granted = if chat_id == self.owner {
            Some((AccessPath::Owner, chat_id))
        } else if state.grants.contains(chat_id) {
            Some((AccessPath::Granted, chat_id))
        } else if self.try_redeem(&mut state, msg) {
            outbox.extend(self.redemption_notice(msg));
            Some((AccessPath::Redeemed, chat_id))
        } else if msg.sender_id == self.owner || state.grants.contains(msg.sender_id) {
            Some((AccessPath::Sender, msg.sender_id))
        } else {
            None
        };

        let decision = match granted {
            Some((path, context_key)) => {
                let session = state.sessions.get_or_create(context_key);
                Decision::Authorized(Access {
                    context_key,
                    path,
                    session,
                })
            }
            None => {
                debug!(
                    "rejected {} from chat {} (sender {})",
                    msg.command.as_deref().unwrap_or("message"),
                    chat_id,
                    msg.sender_id
                );
                if msg.is_command(START_COMMAND) {
                    outbox.push(OutgoingMessage::text(chat_id, self.deny_message.clone()));
                }
                Decision::Rejected
            }
        };

        Resolution { decision, outbox }
    }

    /// Step 3: consume the start command's token and grant the chat.
    fn try_redeem(&self, state: &mut GateState, msg: &IncomingMessage) -> bool {
        if !msg.is_command(START_COMMAND) {
            return false;
        }
        let Some(token) = msg.args.as_deref() else {
            return false;
        };
        if !state.tokens.redeem(token) {
            return false;
        }
        state.grants.insert(msg.chat.id);
        info!("chat {} redeemed an access token", msg.chat.id);
        true
    }

    fn redemption_notice(&self, msg: &IncomingMessage) -> [OutgoingMessage; 2] {
        let kind = if msg.chat.is_private { "User" } else { "Chat" };
        let mut contents = format!("{kind} <em>{}</em>", escape_html(&msg.chat.name));
        if let Some(ref username) = msg.chat.username {
            contents.push_str(&format!(" (@{})", escape_html(username)));
        }
        contents.push_str(" can now use the bot. To revoke, use:");

        let chat_id = msg.chat.id.to_string();
        [
            OutgoingMessage::html(self.owner, contents),
            OutgoingMessage::command(self.owner, "revoke", &[chat_id.as_str()]),
        ]
    }

    fn require_owner(&self, context_key: i64) -> Result<(), AuthError> {
        if self.is_owner_key(context_key) {
            Ok(())
        } else {
            Err(AuthError::Unauthorized)
        }
    }

    /// Issue a one-time delegation token.
    pub fn issue_token(&self, context_key: i64) -> Result<String, AuthError> {
        self.require_owner(context_key)?;
        let token = self.state().tokens.issue();
        info!("issued access token");
        Ok(token)
    }

    /// Drop an outstanding token without granting anything.
    /// Returns whether it was outstanding.
    pub fn withdraw_token(&self, context_key: i64, token: &str) -> Result<bool, AuthError> {
        self.require_owner(context_key)?;
        let withdrawn = self.state().tokens.redeem(token);
        if withdrawn {
            info!("owner withdrew an access token");
        }
        Ok(withdrawn)
    }

    /// Grant access to the chat id in `arg`.
    pub fn grant(
        &self,
        context_key: i64,
        arg: Option<&str>,
    ) -> Result<(i64, GrantOutcome), AuthError> {
        self.require_owner(context_key)?;
        let chat_id = parse_chat_id(arg)?;
        if chat_id == self.owner {
            return Ok((chat_id, GrantOutcome::Owner));
        }

        let outcome = if self.state().grants.insert(chat_id) {
            info!("granted chat {chat_id}");
            GrantOutcome::Granted
        } else {
            GrantOutcome::AlreadyGranted
        };
        Ok((chat_id, outcome))
    }

    /// Revoke the chat id in `arg` and drop its session context.
    ///
    /// Refused while that context has a command running or a file open.
    pub fn revoke(
        &self,
        context_key: i64,
        arg: Option<&str>,
    ) -> Result<(i64, RevokeOutcome), AuthError> {
        self.require_owner(context_key)?;
        let chat_id = parse_chat_id(arg)?;
        if chat_id == self.owner {
            return Err(AuthError::OwnerUnrevokable);
        }

        let mut state = self.state();
        if let Some(session) = state.sessions.get(chat_id) {
            if session.is_busy() {
                warn!("refusing to revoke chat {chat_id}: operation in progress");
                return Err(AuthError::OperationInProgress(chat_id));
            }
        }

        let removed = state.grants.remove(chat_id);
        state.sessions.destroy(chat_id);
        if removed {
            info!("revoked chat {chat_id}");
            Ok((chat_id, RevokeOutcome::Revoked))
        } else {
            Ok((chat_id, RevokeOutcome::NotGranted))
        }
    }

    /// Granted chat ids, for the owner's own chat only.
    pub fn granted(&self, requesting_chat: i64) -> Result<Vec<i64>, AuthError> {
        if requesting_chat != self.owner {
            return Err(AuthError::Unauthorized);
        }
        Ok(self.state().grants.list())
    }

    /// Whether `chat_id` currently holds a grant.
    pub fn is_granted(&self, chat_id: i64) -> bool {
        self.state().grants.contains(chat_id)
    }

    /// Whether `token` is outstanding.
    pub fn is_outstanding(&self, token: &str) -> bool {
        self.state().tokens.contains(token)
    }

    pub fn outstanding_tokens(&self) -> usize {
        self.state().tokens.len()
    }

    /// Shells a session may switch to.
    pub fn available_shells(&self) -> Vec<String> {
        self.state().sessions.defaults().shells.clone()
    }

    /// Existing session for `context_key`, without creating one.
    pub fn session(&self, context_key: i64) -> Option<SharedSession> {
        self.state().sessions.get(context_key)
    }
}
