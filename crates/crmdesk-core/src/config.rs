//! Pipeline configuration.
//!
//! `ClientConfig` carries everything the request pipeline needs to shape
//! outgoing requests: the base address of the CRM backend, the headers sent
//! with every request, the per-request timeout and whether cookies set by the
//! backend are replayed on later requests.
//!
//! The base address can be overridden with the `CRMDESK_API_URL`
//! environment variable.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::api::{ApiError, Result};

/// Environment variable that overrides the backend base address
pub const API_URL_ENV: &str = "CRMDESK_API_URL";

/// Base address used when no override is set
pub const DEFAULT_BASE_URL: &str = "https://crmappback-production-9545.up.railway.app";

/// Per-request timeout in milliseconds.
/// 10s keeps a hung backend from stalling the caller.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub default_headers: HeaderMap,
    pub timeout: Duration,
    pub send_credentials_cross_origin: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_base(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    fn with_base(base_url: &str) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        default_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        Self {
            base_url: base_url.to_string(),
            default_headers,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            send_credentials_cross_origin: false,
        }
    }

    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(std::env::var(API_URL_ENV).ok())
    }

    /// Resolve the base address from an optional override. Blank overrides
    /// fall back to the default. The address is not validated here.
    pub fn resolve(override_url: Option<String>) -> Self {
        match override_url {
            Some(url) if !url.trim().is_empty() => Self::with_base(url.trim()),
            _ => Self::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.send_credentials_cross_origin = enabled;
        self
    }

    /// Add or replace a default header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::InvalidRequest(format!("header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidRequest(format!("header value for {}: {}", name, e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Join the base address and a request path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
