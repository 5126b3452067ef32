//! Shared request pipeline.
//!
//! Every call to the backend goes through `Pipeline::send`: the request is
//! shaped from `ClientConfig`, passed through the request interceptors in
//! registration order, transmitted, and the outcome is handed to each
//! response interceptor exactly once before being returned to the caller.

use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{info, warn};

use super::interceptors::{BearerAuth, RequestLogger};
use super::{ApiError, Result};
use crate::auth::Session;
use crate::config::ClientConfig;

/// Outgoing request, built per call and dropped once the call completes.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    /// Base address joined with `path`
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl ResponseEnvelope {
    /// Body as text for error messages and logs
    pub fn body_text(&self) -> String {
        match &self.body {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Empty bodies become `null`; bodies that are not JSON are kept as a string.
pub(crate) fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Runs before a request is transmitted. Returning an error rejects the
/// request; nothing is sent.
pub trait RequestInterceptor: Send + Sync {
    fn on_request(&self, request: &mut RequestDescriptor) -> Result<()>;
}

/// Observes each completed exchange once. Cannot alter the outcome.
pub trait ResponseInterceptor: Send + Sync {
    fn on_success(&self, _request: &RequestDescriptor, _response: &ResponseEnvelope) {}

    /// `response` is `None` when nothing was received.
    fn on_failure(
        &self,
        _request: &RequestDescriptor,
        _response: Option<&ResponseEnvelope>,
        _error: &ApiError,
    ) {
    }
}

pub struct Pipeline {
    client: Client,
    config: ClientConfig,
    request_hooks: Vec<Arc<dyn RequestInterceptor>>,
    response_hooks: Vec<Arc<dyn ResponseInterceptor>>,
}

impl Pipeline {
    /// Pipeline with the standard hooks: bearer token injection and
    /// invalidate-on-401, plus request logging.
    pub fn new(config: ClientConfig, session: Session) -> Result<Self> {
        Self::builder(config).with_session(session).build()
    }

    pub fn builder(config: ClientConfig) -> PipelineBuilder {
        PipelineBuilder {
            config,
            request_hooks: Vec::new(),
            response_hooks: Vec::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a descriptor carrying the default headers.
    pub fn descriptor(&self, method: Method, path: &str, body: Option<Value>) -> RequestDescriptor {
        RequestDescriptor {
            method,
            path: path.to_string(),
            url: self.config.url_for(path),
            headers: self.config.default_headers.clone(),
            body,
        }
    }

    pub async fn send(&self, mut request: RequestDescriptor) -> Result<ResponseEnvelope> {
        for hook in &self.request_hooks {
            if let Err(e) = hook.on_request(&mut request) {
                warn!(method = %request.method, url = %request.url, error = %e, "Request rejected before sending");
                self.notify_failure(&request, None, &e);
                return Err(e);
            }
        }

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let error = ApiError::from(e);
                self.notify_failure(&request, None, &error);
                return Err(error);
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let text = match response.text().await {
            Ok(text) => text,
            // Status already received; keep it so the 401 check still applies
            Err(_) if !status.is_success() => String::new(),
            Err(e) => {
                let error = ApiError::from(e);
                self.notify_failure(&request, None, &error);
                return Err(error);
            }
        };

        let envelope = ResponseEnvelope {
            status,
            headers,
            body: parse_body(&text),
        };

        if status.is_success() {
            for hook in &self.response_hooks {
                hook.on_success(&request, &envelope);
            }
            Ok(envelope)
        } else {
            let error = ApiError::from_status(status, &envelope.body_text());
            self.notify_failure(&request, Some(&envelope), &error);
            Err(error)
        }
    }

    fn notify_failure(
        &self,
        request: &RequestDescriptor,
        response: Option<&ResponseEnvelope>,
        error: &ApiError,
    ) {
        for hook in &self.response_hooks {
            hook.on_failure(request, response, error);
        }
    }
}

pub struct PipelineBuilder {
    config: ClientConfig,
    request_hooks: Vec<Arc<dyn RequestInterceptor>>,
    response_hooks: Vec<Arc<dyn ResponseInterceptor>>,
}

impl PipelineBuilder {
    /// Register the standard hooks. Outbound: token, then URL logging.
    /// Inbound: logging, then the 401 side effect.
    pub fn with_session(self, session: Session) -> Self {
        let auth = Arc::new(BearerAuth::new(session));
        let logger = Arc::new(RequestLogger);
        self.request_hook(auth.clone())
            .request_hook(logger.clone())
            .response_hook(logger)
            .response_hook(auth)
    }

    pub fn request_hook(mut self, hook: Arc<dyn RequestInterceptor>) -> Self {
        self.request_hooks.push(hook);
        self
    }

    pub fn response_hook(mut self, hook: Arc<dyn ResponseInterceptor>) -> Self {
        self.response_hooks.push(hook);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let client = Client::builder()
            .timeout(self.config.timeout)
            .cookie_store(self.config.send_credentials_cross_origin)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to build HTTP client: {}", e)))?;

        info!(base_url = %self.config.base_url, "API pipeline configured");

        Ok(Pipeline {
            client,
            config: self.config,
            request_hooks: self.request_hooks,
            response_hooks: self.response_hooks,
        })
    }
}
