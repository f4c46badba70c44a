//! Operation types, invocation envelope and results

use crate::classify::{ClassifiedError, ErrorKind};
use crate::context::{Context, Stage};
use crate::translate::Page;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle operation requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl OperationType {
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }

    /// Ordered stage list the orchestrator folds over
    pub fn stages(&self) -> &'static [Stage] {
        match self {
            Self::Create => &[Stage::Guard, Stage::Submit, Stage::Stabilize, Stage::Refresh],
            Self::Update => &[Stage::PreCheck, Stage::Submit, Stage::Stabilize, Stage::Refresh],
            Self::Delete => &[Stage::PreCheck, Stage::Submit, Stage::Stabilize],
            Self::Read | Self::List => &[Stage::Fetch],
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Create => write!(f, "create"),
            OperationType::Read => write!(f, "read"),
            OperationType::Update => write!(f, "update"),
            OperationType::Delete => write!(f, "delete"),
            OperationType::List => write!(f, "list"),
        }
    }
}

impl std::str::FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "list" => Ok(Self::List),
            _ => Err(format!("Invalid operation: {s}")),
        }
    }
}

/// Inbound invocation envelope
///
/// `prior_context` is absent on the first invocation of an operation and
/// carries the previous `IN_PROGRESS` context on every re-invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation<D, O> {
    pub operation: OperationType,

    pub desired_state: D,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_context: Option<Context<O>>,

    /// Pagination token for list operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl<D, O> Invocation<D, O> {
    pub fn new(operation: OperationType, desired_state: D) -> Self {
        Self {
            operation,
            desired_state,
            prior_context: None,
            cursor: None,
        }
    }

    pub fn with_context(mut self, context: Option<Context<O>>) -> Self {
        self.prior_context = context;
        self
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// Result of one invocation
///
/// Serializes to the wire shapes `{"status":"SUCCESS","resource":…}`,
/// `{"status":"FAILED","errorKind":…,"message":…}` and
/// `{"status":"IN_PROGRESS","context":…,"delaySeconds":…}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationResult<R, O> {
    Success {
        resource: R,
    },
    Failed {
        #[serde(rename = "errorKind")]
        error_kind: ErrorKind,
        message: String,
    },
    InProgress {
        context: Context<O>,
        #[serde(rename = "delaySeconds")]
        delay_seconds: u64,
    },
}

impl<R, O> OperationResult<R, O> {
    pub fn success(resource: R) -> Self {
        Self::Success { resource }
    }

    pub fn failed(error: ClassifiedError) -> Self {
        Self::Failed {
            error_kind: error.kind,
            message: error.message,
        }
    }

    /// The delay is rounded up to whole seconds
    pub fn in_progress(context: Context<O>, delay: Duration) -> Self {
        let delay_seconds = delay.as_millis().div_ceil(1000) as u64;
        Self::InProgress {
            context,
            delay_seconds,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Failed { error_kind, .. } => Some(*error_kind),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&Context<O>> {
        match self {
            Self::InProgress { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn into_context(self) -> Option<Context<O>> {
        match self {
            Self::InProgress { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn resource(&self) -> Option<&R> {
        match self {
            Self::Success { resource } => Some(resource),
            _ => None,
        }
    }

    pub fn map<S>(self, f: impl FnOnce(R) -> S) -> OperationResult<S, O> {
        match self {
            Self::Success { resource } => OperationResult::Success {
                resource: f(resource),
            },
            Self::Failed {
                error_kind,
                message,
            } => OperationResult::Failed {
                error_kind,
                message,
            },
            Self::InProgress {
                context,
                delay_seconds,
            } => OperationResult::InProgress {
                context,
                delay_seconds,
            },
        }
    }
}

/// Success payload of a dispatched invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resolved<O> {
    Page(Page<O>),
    Resource(O),
    /// Deleted or already absent
    Absent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    type Wire = OperationResult<String, String>;

    #[test]
    fn test_success_wire_shape() {
        let result: Wire = OperationResult::success("r1".to_string());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "SUCCESS", "resource": "r1"})
        );
    }

    #[test]
    fn test_failed_wire_shape() {
        let result: Wire = OperationResult::failed(ClassifiedError::new(
            ErrorKind::InvalidInput,
            "name is required",
        ));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "FAILED", "errorKind": "INVALID_INPUT", "message": "name is required"})
        );
    }

    #[test]
    fn test_in_progress_wire_shape_rounds_delay_up() {
        let context = Context::new(OperationType::Delete).unwrap();
        let result: Wire = OperationResult::in_progress(context, Duration::from_millis(1500));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "IN_PROGRESS");
        assert_eq!(value["delaySeconds"], 2);
        assert_eq!(value["context"]["operation"], "delete");

        let back: Wire = serde_json::from_value(value).unwrap();
        assert!(!back.is_terminal());
    }

    #[test]
    fn test_invocation_envelope_parses_without_context() {
        let invocation: Invocation<serde_json::Value, String> = serde_json::from_value(json!({
            "operation": "create",
            "desiredState": {"name": "x"}
        }))
        .unwrap();
        assert_eq!(invocation.operation, OperationType::Create);
        assert!(invocation.prior_context.is_none());
        assert!(invocation.cursor.is_none());
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        version: String,
    }

    #[test]
    fn test_invocation_envelope_resumes_update_context() {
        let invocation: Invocation<serde_json::Value, Snapshot> = serde_json::from_value(json!({
            "operation": "update",
            "desiredState": {"name": "x"},
            "priorContext": {
                "operation": "update",
                "progress": {"completed": ["pre_check"], "attempts": 0},
                "captured": {"version": "v1"}
            }
        }))
        .unwrap();
        let context = invocation.prior_context.unwrap();
        assert_eq!(context.captured().map(|s| s.version.as_str()), Some("v1"));
    }

    #[test]
    fn test_resolved_absent_is_null() {
        let result: OperationResult<Resolved<String>, String> =
            OperationResult::success(Resolved::Absent);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "SUCCESS", "resource": null})
        );
    }

    #[test]
    fn test_operation_stage_lists() {
        assert_eq!(OperationType::Delete.stages().len(), 3);
        assert_eq!(OperationType::Create.stages()[0], Stage::Guard);
        assert_eq!(OperationType::Update.stages()[0], Stage::PreCheck);
        assert!(!OperationType::List.is_mutating());
    }
}
