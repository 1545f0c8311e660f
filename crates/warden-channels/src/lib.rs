//! # warden-channels
//!
//! Messaging platform integrations for Warden.

pub mod telegram;
pub mod utils;
