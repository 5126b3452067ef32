//! crmdesk core library.
//!
//! Typed client for the CRM backend: a shared request pipeline with bearer
//! token injection and invalidate-on-401, session storage, and the auth,
//! client and invoice call groups.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionEvent};
pub use config::ClientConfig;
