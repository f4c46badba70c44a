//! Service client port
//!
//! The single seam through which the engine talks to a remote control
//! plane. Provider crates implement it over their CLI or HTTP API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Raw error reported by a remote service
///
/// `code` is whatever the provider uses to identify the failure (an API
/// error code, an HTTP status, ...). The engine classifies it exactly once,
/// at the step boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ServiceError {
    pub code: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// One remote call in, one typed response or [`ServiceError`] out
///
/// Implementations are stateless per call and may be shared across
/// operations on different resources.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    type Request: Send;
    type Response: Send;

    /// Returns the client name used in log output (e.g., "usacloud")
    fn name(&self) -> &str;

    async fn invoke(&self, request: Self::Request) -> Result<Self::Response, ServiceError>;
}

#[async_trait]
impl<C> ServiceClient for Arc<C>
where
    C: ServiceClient,
{
    type Request = C::Request;
    type Response = C::Response;

    fn name(&self) -> &str {
        (**self).name()
    }

    async fn invoke(&self, request: Self::Request) -> Result<Self::Response, ServiceError> {
        (**self).invoke(request).await
    }
}
