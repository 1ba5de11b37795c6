//! Web front for multi-turn conversations with the Gemini API.
//!
//! Each chat lives in a session holding its own conversation state; the
//! HTTP layer is a thin JSON API over it.

pub mod backing;
pub mod config;
pub mod http_server;
pub mod roles;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
