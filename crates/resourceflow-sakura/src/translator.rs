//! Server translator

use crate::usacloud::{SakuraRequest, SakuraResponse, ServerInfo, ServerSpec};
use resourceflow_core::{
    Observation, ObservedResource, OperationType, Page, ResourceStatus, Translator,
};
use serde::{Deserialize, Serialize};

/// Default number of servers per list page
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Observed server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerState {
    pub id: String,
    pub name: String,
    pub status: ResourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

impl ObservedResource for ServerState {
    fn status(&self) -> ResourceStatus {
        self.status
    }

    fn identifier(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn version(&self) -> Option<&str> {
        self.modified_at.as_deref()
    }
}

impl From<ServerInfo> for ServerState {
    fn from(info: ServerInfo) -> Self {
        let status = server_status(info.availability.as_deref(), info.instance_status.as_deref());
        let ip = info.ip_address();
        Self {
            id: info.id,
            name: info.name,
            status,
            cpu: info.cpu,
            memory_mb: info.memory_mb,
            ip,
            tags: info.tags,
            modified_at: info.modified_at,
        }
    }
}

/// Maps usacloud `Availability` / `InstanceStatus` to the engine status
pub fn server_status(availability: Option<&str>, instance_status: Option<&str>) -> ResourceStatus {
    match (availability, instance_status) {
        (Some("migrating"), _) => ResourceStatus::Creating,
        (Some("failed"), _) => ResourceStatus::Failed,
        (Some("discontinued"), _) => ResourceStatus::NotFound,
        (_, Some("cleaning")) | (_, Some("shutting_down")) => ResourceStatus::Deleting,
        (Some("available"), Some("up")) => ResourceStatus::Active,
        // available + down: waiting for power-on
        _ => ResourceStatus::Pending,
    }
}

/// Sakura Cloud servers
#[derive(Debug, Clone)]
pub struct ServerTranslator {
    /// Delete attached disks together with the server
    pub with_disks: bool,
    pub page_size: usize,
}

impl Default for ServerTranslator {
    fn default() -> Self {
        Self {
            with_disks: true,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Translator for ServerTranslator {
    type Desired = ServerSpec;
    type Observed = ServerState;
    type Request = SakuraRequest;
    type Response = SakuraResponse;

    fn resource_type(&self) -> &str {
        "server"
    }

    fn resource_key(&self, desired: &ServerSpec) -> String {
        desired.name.clone()
    }

    fn validate(&self, operation: OperationType, desired: &ServerSpec) -> Result<(), String> {
        if operation != OperationType::List && desired.name.trim().is_empty() {
            return Err("server name is required".to_string());
        }
        if operation == OperationType::Create {
            if desired.core.is_none() {
                return Err("core is required to create a server".to_string());
            }
            if desired.memory_gb.is_none() {
                return Err("memoryGb is required to create a server".to_string());
            }
        }
        Ok(())
    }

    fn guard_request(&self, desired: &ServerSpec) -> Option<SakuraRequest> {
        Some(SakuraRequest::FindByName(desired.name.clone()))
    }

    fn create_request(&self, desired: &ServerSpec) -> SakuraRequest {
        SakuraRequest::Create(desired.clone())
    }

    fn read_request(&self, desired: &ServerSpec, resource_id: Option<&str>) -> SakuraRequest {
        SakuraRequest::Read {
            id: resource_id.map(str::to_string).or_else(|| desired.id.clone()),
            name: desired.name.clone(),
        }
    }

    fn update_request(&self, desired: &ServerSpec, current: &ServerState) -> SakuraRequest {
        SakuraRequest::Update {
            id: current.id.clone(),
            spec: desired.clone(),
        }
    }

    fn delete_request(&self, desired: &ServerSpec, resource_id: Option<&str>) -> SakuraRequest {
        // usacloud accepts a name wherever it takes an ID
        let id = resource_id
            .map(str::to_string)
            .or_else(|| desired.id.clone())
            .unwrap_or_else(|| desired.name.clone());
        SakuraRequest::Delete {
            id,
            with_disks: self.with_disks,
        }
    }

    fn list_request(&self, desired: &ServerSpec, cursor: Option<&str>) -> SakuraRequest {
        SakuraRequest::List {
            tag: desired.tags.first().cloned(),
            offset: cursor.and_then(|c| c.parse().ok()).unwrap_or(0),
            limit: self.page_size,
        }
    }

    fn from_response(&self, response: SakuraResponse) -> Observation<ServerState> {
        match response {
            SakuraResponse::Server(info) => Observation::Resource(info.into()),
            SakuraResponse::NoServer => Observation::Absent,
            SakuraResponse::Servers {
                servers,
                next_offset,
            } => Observation::Page(Page::new(
                servers.into_iter().map(ServerState::from).collect(),
                next_offset.map(|n| n.to_string()),
            )),
            SakuraResponse::Deleted => Observation::Accepted,
        }
    }
}
