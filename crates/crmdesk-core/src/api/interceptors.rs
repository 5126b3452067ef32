//! Standard pipeline hooks.
//!
//! - `BearerAuth` attaches the session token to outgoing requests and
//!   invalidates the session when the backend answers 401.
//! - `RequestLogger` reports every exchange through `tracing`, with
//!   credentials redacted.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use super::pipeline::{RequestDescriptor, RequestInterceptor, ResponseEnvelope, ResponseInterceptor};
use super::{ApiError, Result};
use crate::auth::Session;

const REDACTED: &str = "<redacted>";

/// Body fields whose values never reach the log
const SECRET_FIELDS: [&str; 6] = [
    "password",
    "password_confirmation",
    "current_password",
    "new_password",
    "token",
    "access_token",
];

pub struct BearerAuth {
    session: Session,
}

impl BearerAuth {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl RequestInterceptor for BearerAuth {
    fn on_request(&self, request: &mut RequestDescriptor) -> Result<()> {
        let token = self
            .session
            .token()
            .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;

        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                ApiError::InvalidRequest("session token is not a valid header value".to_string())
            })?;
            value.set_sensitive(true);
            request.headers.insert(header::AUTHORIZATION, value);
        }
        Ok(())
    }
}

impl ResponseInterceptor for BearerAuth {
    fn on_failure(
        &self,
        _request: &RequestDescriptor,
        response: Option<&ResponseEnvelope>,
        _error: &ApiError,
    ) {
        // No response, no status to inspect
        let Some(response) = response else {
            return;
        };
        if response.status == StatusCode::UNAUTHORIZED {
            self.session.invalidate();
        }
    }
}

/// Reports exchanges to the tracing subscriber.
pub struct RequestLogger;

impl RequestInterceptor for RequestLogger {
    fn on_request(&self, request: &mut RequestDescriptor) -> Result<()> {
        debug!(method = %request.method, url = %request.url, "Making request");
        Ok(())
    }
}

impl ResponseInterceptor for RequestLogger {
    fn on_success(&self, request: &RequestDescriptor, response: &ResponseEnvelope) {
        debug!(
            method = %request.method,
            url = %request.url,
            status = response.status.as_u16(),
            "Response received"
        );
    }

    fn on_failure(
        &self,
        request: &RequestDescriptor,
        response: Option<&ResponseEnvelope>,
        error: &ApiError,
    ) {
        match response {
            Some(response) => {
                warn!(
                    method = %request.method,
                    url = %request.url,
                    status = response.status.as_u16(),
                    error = %error,
                    "API request failed"
                );
                debug!(
                    response_headers = ?redacted_headers(&response.headers),
                    response_body = %redacted_body(&response.body),
                    request_headers = ?redacted_headers(&request.headers),
                    request_body = %request.body.as_ref().map(redacted_body).unwrap_or_default(),
                    "Failed exchange"
                );
            }
            None => {
                warn!(
                    method = %request.method,
                    url = %request.url,
                    error = %error,
                    "API request failed without a response"
                );
            }
        }
    }
}

/// Body text safe to log: secret fields are masked at any depth, then the
/// result is truncated.
pub(crate) fn redacted_body(body: &Value) -> String {
    let text = match mask_secrets(body.clone()) {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    };
    ApiError::truncate_body(&text)
}

fn mask_secrets(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    if SECRET_FIELDS.contains(&key.to_ascii_lowercase().as_str()) {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, mask_secrets(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(mask_secrets).collect()),
        other => other,
    }
}

/// Header pairs safe to log: credentials and cookies are masked.
pub(crate) fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if *name == header::AUTHORIZATION {
                match value.to_str() {
                    Ok(v) if v.starts_with("Bearer ") => format!("Bearer {}", REDACTED),
                    _ => REDACTED.to_string(),
                }
            } else if *name == header::COOKIE || *name == header::SET_COOKIE || value.is_sensitive() {
                REDACTED.to_string()
            } else {
                value.to_str().unwrap_or(REDACTED).to_string()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::auth::{MemoryTokenStore, SessionEvent};

    fn descriptor() -> RequestDescriptor {
        RequestDescriptor {
            method: Method::GET,
            path: "/clients/42".to_string(),
            url: "http://api.test/clients/42".to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    fn envelope(status: StatusCode) -> ResponseEnvelope {
        ResponseEnvelope {
            status,
            headers: HeaderMap::new(),
            body: Value::Null,
        }
    }

    #[test]
    fn test_bearer_header_added_when_token_present() {
        let session = Session::new(Arc::new(MemoryTokenStore::with_token("abc123")));
        let mut request = descriptor();
        BearerAuth::new(session).on_request(&mut request).unwrap();
        assert_eq!(request.headers[header::AUTHORIZATION], "Bearer abc123");
        assert!(request.headers[header::AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_no_header_without_token() {
        let session = Session::new(Arc::new(MemoryTokenStore::new()));
        let mut request = descriptor();
        BearerAuth::new(session).on_request(&mut request).unwrap();
        assert!(request.headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_unencodable_token_rejects_request() {
        let session = Session::new(Arc::new(MemoryTokenStore::with_token("bad\ntoken")));
        let mut request = descriptor();
        let err = BearerAuth::new(session).on_request(&mut request).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn test_only_401_invalidates() {
        let session = Session::new(Arc::new(MemoryTokenStore::with_token("xyz")));
        let mut events = session.subscribe();
        let auth = BearerAuth::new(session.clone());
        let request = descriptor();

        for status in [StatusCode::FORBIDDEN, StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR] {
            let response = envelope(status);
            let error = ApiError::from_status(status, "");
            auth.on_failure(&request, Some(&response), &error);
        }
        auth.on_success(&request, &envelope(StatusCode::OK));
        assert!(session.is_authenticated());
        assert!(events.try_recv().is_err());

        let response = envelope(StatusCode::UNAUTHORIZED);
        let error = ApiError::from_status(StatusCode::UNAUTHORIZED, "");
        auth.on_failure(&request, Some(&response), &error);

        assert!(!session.is_authenticated());
        assert!(matches!(events.try_recv(), Ok(SessionEvent::Invalidated { .. })));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_missing_response_skips_401_check() {
        let session = Session::new(Arc::new(MemoryTokenStore::with_token("xyz")));
        let mut events = session.subscribe();
        let error = ApiError::InvalidResponse("connection reset".into());

        BearerAuth::new(session.clone()).on_failure(&descriptor(), None, &error);

        assert!(session.is_authenticated());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_redacted_headers_mask_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        headers.insert(header::COOKIE, HeaderValue::from_static("laravel_session=secret"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let shown = redacted_headers(&headers);
        let rendered = format!("{:?}", shown);
        assert!(!rendered.contains("abc123"));
        assert!(!rendered.contains("secret"));
        assert!(shown.contains(&("authorization".to_string(), "Bearer <redacted>".to_string())));
        assert!(shown.contains(&("accept".to_string(), "application/json".to_string())));
    }

    #[test]
    fn test_redacted_body_masks_secret_fields() {
        let body = json!({
            "email": "a@b.test",
            "password": "hunter2",
            "password_confirmation": "hunter2",
            "profile": {"Current_Password": "old-secret", "name": "Ann"},
            "sessions": [{"token": "abc123"}],
        });

        let shown = redacted_body(&body);

        for secret in ["hunter2", "old-secret", "abc123"] {
            assert!(!shown.contains(secret), "{} leaked in {}", secret, shown);
        }
        assert!(shown.contains("a@b.test"));
        assert!(shown.contains("Ann"));
        assert!(shown.contains(REDACTED));
        assert_eq!(redacted_body(&Value::Null), "");
        assert_eq!(redacted_body(&json!("plain text")), "plain text");
    }

    /// Shared buffer the tracing subscriber writes into
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_login_log_hides_password() {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut request = RequestDescriptor {
            method: Method::POST,
            path: "/login".to_string(),
            url: "http://api.test/login".to_string(),
            headers: HeaderMap::new(),
            body: Some(json!({"email": "a@b.test", "password": "hunter2"})),
        };
        request
            .headers
            .insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        let response = ResponseEnvelope {
            status: StatusCode::UNAUTHORIZED,
            headers: HeaderMap::new(),
            body: json!({"message": "Invalid credentials", "token": "stale"}),
        };
        let error = ApiError::from_status(StatusCode::UNAUTHORIZED, "");

        tracing::subscriber::with_default(subscriber, || {
            RequestLogger.on_failure(&request, Some(&response), &error);
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Failed exchange"), "{}", output);
        assert!(output.contains("a@b.test"));
        assert!(!output.contains("hunter2"), "{}", output);
        assert!(!output.contains("abc123"), "{}", output);
        assert!(!output.contains("stale"), "{}", output);
    }
}
