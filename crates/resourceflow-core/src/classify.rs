//! Error classification
//!
//! Raw service errors are mapped into a fixed taxonomy once, at the step
//! boundary. Orchestration code only ever looks at [`ErrorKind`] and the
//! [`Disposition`] for the phase it is in.

use crate::context::Stage;
use crate::port::ServiceError;
use crate::result::OperationType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Classified error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    Throttled,
    ServiceInternal,
    /// The poller ran out of attempts or the resource settled in FAILED
    NotStabilized,
    Unknown,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled | Self::ServiceInternal)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::InvalidInput => write!(f, "INVALID_INPUT"),
            Self::Throttled => write!(f, "THROTTLED"),
            Self::ServiceInternal => write!(f, "SERVICE_INTERNAL"),
            Self::NotStabilized => write!(f, "NOT_STABILIZED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl std::str::FromStr for ErrorKind {
    type Err = String;

    /// Accepts `NOT_FOUND`, `not-found`, `NotFound` and similar spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "notfound" => Ok(Self::NotFound),
            "conflict" => Ok(Self::Conflict),
            "invalidinput" => Ok(Self::InvalidInput),
            "throttled" => Ok(Self::Throttled),
            "serviceinternal" => Ok(Self::ServiceInternal),
            "notstabilized" => Ok(Self::NotStabilized),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Invalid error kind: {s}")),
        }
    }
}

/// A service error after classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// Prefix the message with what a conflict means for this operation
    pub fn for_operation(self, operation: OperationType) -> Self {
        let prefix = match (self.kind, operation) {
            (ErrorKind::Conflict, OperationType::Create) => "resource already exists",
            (ErrorKind::Conflict, OperationType::Update) => "resource busy or version conflict",
            _ => return self,
        };
        Self {
            kind: self.kind,
            message: format!("{prefix}: {}", self.message),
        }
    }
}

/// What the orchestrator should do with a classified error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Treat as a normal "resource absent" observation
    Absent,
    /// Back off and ask to be invoked again
    Retry,
    /// Return as a failed result
    Terminal,
}

/// Fixed disposition of an error kind in a given lifecycle phase
pub fn disposition(kind: ErrorKind, operation: OperationType, stage: Stage) -> Disposition {
    use OperationType::*;

    match kind {
        ErrorKind::NotFound => match (operation, stage) {
            (Create, Stage::Guard) | (Create, Stage::Stabilize) => Disposition::Absent,
            (Delete, _) => Disposition::Absent,
            (List, _) => Disposition::Absent,
            _ => Disposition::Terminal,
        },
        kind if kind.is_retryable() && operation.is_mutating() => Disposition::Retry,
        _ => Disposition::Terminal,
    }
}

/// Maps service error codes to [`ErrorKind`]
///
/// Codes are compared case-insensitively with `_`, `-`, `.` and spaces
/// removed, so `RESOURCE_NOT_FOUND` and `ResourceNotFound` are the same.
/// Numeric codes are read as HTTP statuses. Overrides take precedence over
/// the built-in table.
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    overrides: HashMap<String, ErrorKind>,
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, code: &str, kind: ErrorKind) -> Self {
        self.overrides.insert(normalize(code), kind);
        self
    }

    pub fn kind_for(&self, code: &str) -> ErrorKind {
        let code = normalize(code);
        if let Some(kind) = self.overrides.get(&code) {
            return *kind;
        }
        default_kind(&code)
    }

    pub fn classify(&self, error: &ServiceError) -> ClassifiedError {
        ClassifiedError::new(self.kind_for(&error.code), error.message.clone())
    }
}

fn normalize(code: &str) -> String {
    code.trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | '.' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn default_kind(code: &str) -> ErrorKind {
    if let Ok(status) = code.parse::<u16>() {
        return match status {
            404 | 410 => ErrorKind::NotFound,
            409 | 412 => ErrorKind::Conflict,
            400 | 405 | 413 | 422 => ErrorKind::InvalidInput,
            429 => ErrorKind::Throttled,
            500..=599 => ErrorKind::ServiceInternal,
            _ => ErrorKind::Unknown,
        };
    }

    match code {
        "notfound"
        | "resourcenotfound"
        | "resourcenotfoundexception"
        | "nosuchentity"
        | "nosuchresource" => ErrorKind::NotFound,

        "conflict"
        | "alreadyexists"
        | "resourcealreadyexists"
        | "alreadyexistsexception"
        | "resourceconflictexception"
        | "resourceinuse"
        | "resourceinuseexception"
        | "concurrentmodification"
        | "concurrentmodificationexception"
        | "preconditionfailed" => ErrorKind::Conflict,

        "invalidinput"
        | "invalidrequest"
        | "invalidparameter"
        | "invalidparametervalue"
        | "validation"
        | "validationerror"
        | "validationexception"
        | "badrequest"
        | "malformedinput" => ErrorKind::InvalidInput,

        "throttled"
        | "throttling"
        | "throttlingexception"
        | "toomanyrequests"
        | "ratelimited"
        | "rateexceeded"
        | "requestlimitexceeded" => ErrorKind::Throttled,

        "internal"
        | "internalerror"
        | "internalfailure"
        | "internalserviceerror"
        | "serviceinternal"
        | "serviceunavailable"
        | "serviceexception"
        | "networkfailure" => ErrorKind::ServiceInternal,

        _ => ErrorKind::Unknown,
    }
}
