//! REST API client module for the CRM backend.
//!
//! This module provides the `ApiClient` and its call groups for
//! authentication, client records and invoice records.
//!
//! Every call passes through the shared `Pipeline`, which attaches the
//! session's bearer token and invalidates the session on a 401 response.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod interceptors;
pub mod pipeline;

pub use client::{ApiClient, AuthApi, ResourceApi};
pub use endpoints::{Endpoint, Resource};
pub use error::{ApiError, Result};
pub use interceptors::{BearerAuth, RequestLogger};
pub use pipeline::{
    Pipeline, PipelineBuilder, RequestDescriptor, RequestInterceptor, ResponseEnvelope,
    ResponseInterceptor,
};
