//! Session management for the CRM backend.
//!
//! This module provides:
//! - `Session`: the explicit session context handed to the request pipeline
//! - `TokenStore`: the single slot holding the bearer token, with in-memory,
//!   file and OS keychain implementations
//!
//! A 401 from the backend invalidates the session and emits
//! `SessionEvent::Invalidated` to every subscriber.

pub mod credentials;
pub mod session;
pub mod store;

pub use credentials::{KeyringTokenStore, TOKEN_KEY};
pub use session::{Session, SessionEvent, DEFAULT_LOGIN_PATH};
pub use store::{FileTokenStore, MemoryTokenStore, SessionData, TokenStore};
