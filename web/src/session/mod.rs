//! Session management for the chat server
//!
//! Each browser conversation lives in its own session, so state survives
//! across HTTP requests until the session is deleted ("new chat") or
//! expires. `SessionStore` can be implemented by different storage backends.

pub mod adapters;
pub mod store;

pub use adapters::InMemorySessionStore;
pub use store::{Session, SessionStore, SessionStoreError, SessionStoreRef};
