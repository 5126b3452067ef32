//! API client for the CRM backend.
//!
//! `ApiClient` owns the shared pipeline and the session context and hands
//! out the three call groups: `auth()`, `clients()` and `invoices()`. Every
//! group method is one request through the pipeline; success returns the
//! parsed body, failure returns the pipeline's error unchanged.

use std::fmt::Display;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::endpoints::{Endpoint, Resource};
use super::pipeline::Pipeline;
use super::{ApiError, Result};
use crate::auth::Session;
use crate::config::ClientConfig;

/// Body fields that may carry a freshly issued token
const TOKEN_FIELDS: [&str; 2] = ["token", "access_token"];

/// API client for the CRM backend.
/// Clone is cheap - the pipeline and the reqwest connection pool are shared.
#[derive(Clone)]
pub struct ApiClient {
    pipeline: Arc<Pipeline>,
    session: Session,
}

impl ApiClient {
    /// Create a client with the standard pipeline hooks
    pub fn new(config: ClientConfig, session: Session) -> Result<Self> {
        let pipeline = Pipeline::new(config, session.clone())?;
        Ok(Self::from_pipeline(Arc::new(pipeline), session))
    }

    /// Wrap an existing pipeline, e.g. one with extra hooks
    pub fn from_pipeline(pipeline: Arc<Pipeline>, session: Session) -> Self {
        Self { pipeline, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.pipeline.config().base_url
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { client: self }
    }

    pub fn clients(&self) -> ResourceApi<'_> {
        ResourceApi {
            client: self,
            resource: Resource::Clients,
        }
    }

    pub fn invoices(&self) -> ResourceApi<'_> {
        ResourceApi {
            client: self,
            resource: Resource::Invoices,
        }
    }

    /// Issue one endpoint call and decode the body into `T`.
    pub async fn call<T: DeserializeOwned>(&self, endpoint: Endpoint, body: Option<Value>) -> Result<T> {
        let path = endpoint.path();
        let value = self.call_value(endpoint, body).await?;
        decode(value, &path)
    }

    async fn call_value(&self, endpoint: Endpoint, body: Option<Value>) -> Result<Value> {
        let body = if endpoint.sends_body() { body } else { None };
        let request = self
            .pipeline
            .descriptor(endpoint.method(), &endpoint.path(), body);
        let response = self.pipeline.send(request).await?;
        Ok(response.body)
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::InvalidRequest(format!("Failed to serialize request body: {}", e)))
}

fn decode<T: DeserializeOwned>(value: Value, path: &str) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e)))
}

/// Token issued in a login or register response, if any
fn issued_token(body: &Value) -> Option<&str> {
    TOKEN_FIELDS
        .iter()
        .find_map(|field| body.get(field).and_then(Value::as_str))
        .filter(|token| !token.is_empty())
}

/// Authentication operations. Login and register store the issued token;
/// logout always clears it.
pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl AuthApi<'_> {
    pub async fn register<T: DeserializeOwned>(&self, user: &(impl Serialize + ?Sized)) -> Result<T> {
        let body = self.client.call_value(Endpoint::Register, Some(encode(user)?)).await?;
        self.store_issued_token(&body)?;
        decode(body, "/register")
    }

    pub async fn login<T: DeserializeOwned>(&self, credentials: &(impl Serialize + ?Sized)) -> Result<T> {
        let body = self.client.call_value(Endpoint::Login, Some(encode(credentials)?)).await?;
        self.store_issued_token(&body)?;
        decode(body, "/login")
    }

    pub async fn logout<T: DeserializeOwned>(&self) -> Result<T> {
        let result = self.client.call_value(Endpoint::Logout, None).await;
        if let Err(e) = self.client.session.clear() {
            warn!(error = %e, "Failed to clear session token on logout");
        }
        decode(result?, "/logout")
    }

    pub async fn me<T: DeserializeOwned>(&self) -> Result<T> {
        self.client.call(Endpoint::Me, None).await
    }

    pub async fn reset_password<T: DeserializeOwned>(
        &self,
        password_data: &(impl Serialize + ?Sized),
    ) -> Result<T> {
        self.client
            .call(Endpoint::ResetPassword, Some(encode(password_data)?))
            .await
    }

    fn store_issued_token(&self, body: &Value) -> Result<()> {
        match issued_token(body) {
            Some(token) => {
                self.client
                    .session
                    .set_token(token)
                    .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;
                debug!("Stored token from authentication response");
            }
            None => debug!("Authentication response carried no token"),
        }
        Ok(())
    }
}

/// CRUD operations on one record collection (clients or invoices).
pub struct ResourceApi<'a> {
    client: &'a ApiClient,
    resource: Resource,
}

impl ResourceApi<'_> {
    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub async fn get_all<T: DeserializeOwned>(&self) -> Result<T> {
        self.client.call(Endpoint::List(self.resource), None).await
    }

    pub async fn get_by_id<T: DeserializeOwned>(&self, id: impl Display) -> Result<T> {
        self.client
            .call(Endpoint::Get(self.resource, id.to_string()), None)
            .await
    }

    pub async fn create<T: DeserializeOwned>(&self, data: &(impl Serialize + ?Sized)) -> Result<T> {
        self.client
            .call(Endpoint::Create(self.resource), Some(encode(data)?))
            .await
    }

    pub async fn update<T: DeserializeOwned>(
        &self,
        id: impl Display,
        data: &(impl Serialize + ?Sized),
    ) -> Result<T> {
        self.client
            .call(Endpoint::Update(self.resource, id.to_string()), Some(encode(data)?))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, id: impl Display) -> Result<T> {
        self.client
            .call(Endpoint::Delete(self.resource, id.to_string()), None)
            .await
    }
}
