// Core of a multi-turn Gemini conversation:
// - Typed conversation document replayed on every request
// - API client for the generateContent endpoint
// - Per-conversation state manager
// - Configuration loading and API key sources
// - Shared error types

pub mod client;
pub use client::*;

pub mod conversation;
pub use conversation::ConversationStateManager;

pub mod types;
pub use types::*;

pub mod config;
pub use config::*;

pub mod errors;
pub use errors::*;
