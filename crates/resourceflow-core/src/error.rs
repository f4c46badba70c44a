//! Engine error types
//!
//! These cover the plumbing around the engine (persisted contexts and
//! invocation envelopes). Remote failures never surface here; they are
//! classified into [`crate::ErrorKind`] and returned inside
//! [`crate::OperationResult::Failed`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid context: {0}")]
    InvalidContext(String),

    #[error("Context for {found} cannot resume a {expected} operation")]
    ContextMismatch { expected: String, found: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
