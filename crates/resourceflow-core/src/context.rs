//! Progress carried between stateless invocations
//!
//! The context is the only state that survives from one invocation to the
//! next. It is a tagged enum with one variant per mutating operation so a
//! persisted blob always says which operation it belongs to.

use crate::error::{CoreError, Result};
use crate::result::OperationType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Named positions in an operation's stage list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Uniqueness check before create
    Guard,
    /// Existence check before update/delete
    PreCheck,
    /// The mutating call itself
    Submit,
    /// Polling until the resource settles
    Stabilize,
    /// Optional read after stabilization
    Refresh,
    /// The single call of a read or list
    Fetch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Guard => write!(f, "guard"),
            Stage::PreCheck => write!(f, "pre-check"),
            Stage::Submit => write!(f, "submit"),
            Stage::Stabilize => write!(f, "stabilize"),
            Stage::Refresh => write!(f, "refresh"),
            Stage::Fetch => write!(f, "fetch"),
        }
    }
}

/// Completed stages and the shared attempt counter
///
/// Both only grow: a stage once marked is never run again, and the
/// counter is never reset within one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub completed: BTreeSet<Stage>,

    /// Attempts spent polling or backing off, across all stages
    #[serde(default)]
    pub attempts: u32,

    /// Consecutive retryable errors; drives the backoff exponent
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retries: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    pub fn mark(&mut self, stage: Stage) {
        self.completed.insert(stage);
        self.retries = 0;
    }

    /// Returns the current retry streak and extends it by one
    pub fn next_retry(&mut self) -> u32 {
        let streak = self.retries;
        self.retries += 1;
        streak
    }

    pub fn reset_retries(&mut self) {
        self.retries = 0;
    }

    /// Spends one attempt. Returns `false` when that would exceed `max_attempts`.
    pub fn try_consume_attempt(&mut self, max_attempts: u32) -> bool {
        if self.attempts >= max_attempts {
            return false;
        }
        self.attempts += 1;
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateContext {
    pub progress: Progress,

    /// Identifier assigned by the submit response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateContext<O> {
    pub progress: Progress,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    /// State captured by the pre-check, consumed by submit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured: Option<O>,
}

impl<O> Default for UpdateContext<O> {
    fn default() -> Self {
        Self {
            progress: Progress::default(),
            resource_id: None,
            captured: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteContext {
    pub progress: Progress,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

/// Persisted progress of one in-flight lifecycle operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Context<O> {
    Create(CreateContext),
    Update(UpdateContext<O>),
    Delete(DeleteContext),
}

impl<O> Context<O> {
    /// Empty context for a mutating operation; `None` for read and list
    pub fn new(operation: OperationType) -> Option<Self> {
        match operation {
            OperationType::Create => Some(Self::Create(CreateContext::default())),
            OperationType::Update => Some(Self::Update(UpdateContext::default())),
            OperationType::Delete => Some(Self::Delete(DeleteContext::default())),
            OperationType::Read | OperationType::List => None,
        }
    }

    pub fn operation(&self) -> OperationType {
        match self {
            Self::Create(_) => OperationType::Create,
            Self::Update(_) => OperationType::Update,
            Self::Delete(_) => OperationType::Delete,
        }
    }

    pub fn progress(&self) -> &Progress {
        match self {
            Self::Create(ctx) => &ctx.progress,
            Self::Update(ctx) => &ctx.progress,
            Self::Delete(ctx) => &ctx.progress,
        }
    }

    pub fn progress_mut(&mut self) -> &mut Progress {
        match self {
            Self::Create(ctx) => &mut ctx.progress,
            Self::Update(ctx) => &mut ctx.progress,
            Self::Delete(ctx) => &mut ctx.progress,
        }
    }

    pub fn resource_id(&self) -> Option<&str> {
        match self {
            Self::Create(ctx) => ctx.resource_id.as_deref(),
            Self::Update(ctx) => ctx.resource_id.as_deref(),
            Self::Delete(ctx) => ctx.resource_id.as_deref(),
        }
    }

    pub fn set_resource_id(&mut self, id: impl Into<String>) {
        let id = Some(id.into());
        match self {
            Self::Create(ctx) => ctx.resource_id = id,
            Self::Update(ctx) => ctx.resource_id = id,
            Self::Delete(ctx) => ctx.resource_id = id,
        }
    }

    /// Pre-check state of an update; always `None` for other operations
    pub fn captured(&self) -> Option<&O> {
        match self {
            Self::Update(ctx) => ctx.captured.as_ref(),
            _ => None,
        }
    }

    /// Store the pre-check state. Ignored outside update.
    pub fn capture(&mut self, observed: O) {
        if let Self::Update(ctx) = self {
            ctx.captured = Some(observed);
        }
    }

    /// Checks that this context can resume `operation`
    pub fn ensure_operation(&self, operation: OperationType) -> Result<()> {
        if self.operation() == operation {
            Ok(())
        } else {
            Err(CoreError::ContextMismatch {
                expected: operation.to_string(),
                found: self.operation().to_string(),
            })
        }
    }
}

impl<O: Serialize> Context<O> {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<O: DeserializeOwned> Context<O> {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| CoreError::InvalidContext(e.to_string()))
    }
}
