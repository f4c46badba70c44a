//! Resource status and the observed-state contract

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a remote resource as reported by the service
///
/// Absence is a status of its own so read and delete flows can branch on
/// it without treating it as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    /// Resource is being created
    Creating,
    /// Resource is accepted but waiting on the provider
    Pending,
    /// Resource is ready
    Active,
    /// Resource is applying an update
    Updating,
    /// Resource is being deleted
    Deleting,
    /// Resource is in a failed state
    Failed,
    /// Resource does not exist
    NotFound,
}

impl ResourceStatus {
    /// Statuses the service is expected to move away from on its own
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            Self::Creating | Self::Pending | Self::Updating | Self::Deleting
        )
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creating => write!(f, "CREATING"),
            Self::Pending => write!(f, "PENDING"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Updating => write!(f, "UPDATING"),
            Self::Deleting => write!(f, "DELETING"),
            Self::Failed => write!(f, "FAILED"),
            Self::NotFound => write!(f, "NOT_FOUND"),
        }
    }
}

impl std::str::FromStr for ResourceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATING" => Ok(Self::Creating),
            "PENDING" => Ok(Self::Pending),
            "ACTIVE" => Ok(Self::Active),
            "UPDATING" => Ok(Self::Updating),
            "DELETING" => Ok(Self::Deleting),
            "FAILED" => Ok(Self::Failed),
            "NOT_FOUND" => Ok(Self::NotFound),
            _ => Err(format!("Invalid resource status: {s}")),
        }
    }
}

/// What the engine needs to know about an observed resource
///
/// Implemented by each resource type's observed-state struct. Everything
/// else about the resource stays opaque to the engine.
pub trait ObservedResource: Clone + Send + Sync {
    fn status(&self) -> ResourceStatus;

    /// Identifier assigned by the remote service, if it has one yet
    fn identifier(&self) -> Option<&str>;

    /// Version token for optimistic concurrency, where the API has one
    fn version(&self) -> Option<&str> {
        None
    }
}
