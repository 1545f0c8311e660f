//! One-time delegation tokens.
//!
//! A token is issued by the owner and redeemed through the start command by
//! the chat that should gain access. Redemption removes it; nothing ever
//! puts a consumed token back. Tokens do not expire.

use rand::{distributions::Alphanumeric, Rng};
use std::collections::HashSet;

/// Token length. Fits Telegram's 64-char deep-link payload limit.
pub const TOKEN_LEN: usize = 32;

/// Outstanding tokens.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    outstanding: HashSet<String>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate and record a fresh token.
    pub fn issue(&mut self) -> String {
        self.issue_with(generate_token)
    }

    /// Record a token produced by `generate`, regenerating on collision
    /// with an outstanding one.
    pub fn issue_with<F>(&mut self, mut generate: F) -> String
    where
        F: FnMut() -> String,
    {
        loop {
            let token = generate();
            if self.outstanding.insert(token.clone()) {
                return token;
            }
        }
    }

    /// Consume a token. Returns whether it was outstanding.
    pub fn redeem(&mut self, token: &str) -> bool {
        self.outstanding.remove(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.outstanding.contains(token)
    }

    pub fn len(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outstanding.is_empty()
    }
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}
