//! Cloudflare provider error types

use resourceflow_core::ServiceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudflareError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Cloudflare API error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        code: Option<i32>,
        message: String,
    },

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudflareError>;

/// Error code reported to the engine for an API failure
///
/// Cloudflare answers several conflicts and lookups with a plain 400, so the
/// API error code wins over the HTTP status where it is more specific.
pub fn service_code(status: u16, api_code: Option<i32>) -> String {
    match api_code {
        // identical record / CNAME conflicts
        Some(81053) | Some(81057) | Some(81058) => "409".to_string(),
        Some(81044) => "404".to_string(),
        Some(971) | Some(10429) => "429".to_string(),
        _ => status.to_string(),
    }
}

impl From<CloudflareError> for ServiceError {
    fn from(error: CloudflareError) -> Self {
        let code = match &error {
            CloudflareError::MissingEnvVar(_) => "InvalidInput".to_string(),
            CloudflareError::ApiError { status, code, .. } => service_code(*status, *code),
            CloudflareError::HttpError(e) if e.is_timeout() || e.is_connect() => {
                "NetworkFailure".to_string()
            }
            CloudflareError::HttpError(e) => e
                .status()
                .map(|s| s.as_u16().to_string())
                .unwrap_or_else(|| "HttpError".to_string()),
            CloudflareError::JsonError(_) => "MalformedResponse".to_string(),
        };
        ServiceError::new(code, error.to_string())
    }
}
