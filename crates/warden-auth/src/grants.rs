//! Chats granted access beyond the owner.

use crate::error::AuthError;
use std::collections::BTreeSet;

/// Granted chat ids. The owner is never stored here; it is authorized by
/// identity in the decision engine.
#[derive(Debug, Default)]
pub struct GrantRegistry {
    granted: BTreeSet<i64>,
}

impl GrantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the id was already granted.
    pub fn insert(&mut self, chat_id: i64) -> bool {
        self.granted.insert(chat_id)
    }

    /// Returns `false` if the id was not granted.
    pub fn remove(&mut self, chat_id: i64) -> bool {
        self.granted.remove(&chat_id)
    }

    pub fn contains(&self, chat_id: i64) -> bool {
        self.granted.contains(&chat_id)
    }

    /// Granted ids in ascending order.
    pub fn list(&self) -> Vec<i64> {
        self.granted.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.granted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }
}

/// Parse the chat id argument of `/grant` and `/revoke`.
pub fn parse_chat_id(arg: Option<&str>) -> Result<i64, AuthError> {
    let arg = arg.map(str::trim).filter(|a| !a.is_empty());
    match arg {
        Some(a) => a
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidArgument(Some(a.to_string()))),
        None => Err(AuthError::InvalidArgument(None)),
    }
}
