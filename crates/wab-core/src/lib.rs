//! Governance layer for the chat automation bot.
//!
//! Two independent services consulted around every command execution:
//! the persisted settings document (`config`) and the per-actor throttle
//! (`security`). The chat-protocol client and command handlers live elsewhere
//! and reach this crate through `Governance` and the traits in `ports`.

pub mod config;
pub mod domain;
pub mod errors;
pub mod governance;
pub mod jsonc;
pub mod logging;
pub mod ports;
pub mod security;

pub use errors::{Error, Result};
