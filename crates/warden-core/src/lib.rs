//! # warden-core
//!
//! Core types, traits, configuration, and error handling for the Warden bot.

pub mod config;
pub mod error;
pub mod message;
pub mod sanitize;
pub mod traits;
