//! Per-resource translation contract

use crate::poller::StabilizationRules;
use crate::result::OperationType;
use crate::status::ObservedResource;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One page of a list operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<O> {
    pub items: Vec<O>,

    /// Opaque token for the next page, passed back unchanged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<O> Page<O> {
    pub fn new(items: Vec<O>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// A remote response after translation
#[derive(Debug, Clone, PartialEq)]
pub enum Observation<O> {
    /// Exactly one resource came back
    Resource(O),
    /// The query matched nothing
    Absent,
    /// A page of resources (list-style reads)
    Page(Page<O>),
    /// The call was accepted without a resource body
    Accepted,
}

impl<O: ObservedResource> Observation<O> {
    /// The first resource in the observation that is not reported as absent
    pub fn into_present(self) -> Option<O> {
        match self {
            Self::Resource(resource) if !resource.status().is_absent() => Some(resource),
            Self::Page(page) => page.items.into_iter().find(|r| !r.status().is_absent()),
            _ => None,
        }
    }
}

/// Maps desired state to requests and responses to observed state
///
/// Implementations are pure: no I/O, no shared mutable state. One
/// translator exists per resource type.
pub trait Translator: Send + Sync {
    type Desired: Send + Sync;
    type Observed: ObservedResource + Serialize + DeserializeOwned;
    type Request: Send;
    type Response: Send;

    /// Returns the resource type name (e.g., "server", "dns-record")
    fn resource_type(&self) -> &str;

    /// Human-readable key of the desired resource for logs and messages
    fn resource_key(&self, desired: &Self::Desired) -> String;

    /// Presence validation of the attributes an operation needs
    fn validate(&self, _operation: OperationType, _desired: &Self::Desired) -> Result<(), String> {
        Ok(())
    }

    /// Lookup used to refuse creating a duplicate. `None` skips the guard.
    fn guard_request(&self, _desired: &Self::Desired) -> Option<Self::Request> {
        None
    }

    fn create_request(&self, desired: &Self::Desired) -> Self::Request;

    /// Read by remote identifier when known, otherwise by the desired
    /// state's own identifying fields
    fn read_request(&self, desired: &Self::Desired, resource_id: Option<&str>) -> Self::Request;

    /// `current` is the state captured by the update pre-check
    fn update_request(&self, desired: &Self::Desired, current: &Self::Observed) -> Self::Request;

    fn delete_request(&self, desired: &Self::Desired, resource_id: Option<&str>) -> Self::Request;

    fn list_request(&self, desired: &Self::Desired, cursor: Option<&str>) -> Self::Request;

    fn from_response(&self, response: Self::Response) -> Observation<Self::Observed>;

    /// Issue one more read after stabilization and return that instead
    fn refresh_after_stabilize(&self) -> bool {
        false
    }

    fn stabilization_rules(&self, operation: OperationType) -> StabilizationRules {
        StabilizationRules::for_operation(operation)
    }
}
