#![allow(dead_code)]

use async_trait::async_trait;
use resourceflow_core::{
    EngineConfig, ObservedResource, Observation, OperationType, Orchestrator, Page,
    ResourceStatus, ServiceClient, ServiceError, Translator,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Widget {
    pub name: String,
    pub size: Option<u32>,
}

impl Widget {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            size: Some(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetState {
    pub id: String,
    pub name: String,
    pub status: ResourceStatus,
    pub version: Option<String>,
}

impl WidgetState {
    pub fn new(id: &str, status: ResourceStatus) -> Self {
        Self {
            id: id.to_string(),
            name: "x".to_string(),
            status,
            version: None,
        }
    }

    pub fn versioned(id: &str, status: ResourceStatus, version: &str) -> Self {
        Self {
            version: Some(version.to_string()),
            ..Self::new(id, status)
        }
    }
}

impl ObservedResource for WidgetState {
    fn status(&self) -> ResourceStatus {
        self.status
    }

    fn identifier(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetRequest {
    FindByName(String),
    Create(String),
    Get { id: Option<String>, name: String },
    Update { id: String, version: Option<String> },
    Delete(Option<String>),
    List(Option<String>),
}

impl WidgetRequest {
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Get { .. } | Self::FindByName(_))
    }
}

#[derive(Debug, Clone)]
pub enum WidgetResponse {
    One(WidgetState),
    Nothing,
    Many(Vec<WidgetState>, Option<String>),
    Accepted,
}

#[derive(Debug, Default)]
pub struct WidgetTranslator {
    pub guard: bool,
    pub refresh: bool,
}

impl Translator for WidgetTranslator {
    type Desired = Widget;
    type Observed = WidgetState;
    type Request = WidgetRequest;
    type Response = WidgetResponse;

    fn resource_type(&self) -> &str {
        "widget"
    }

    fn resource_key(&self, desired: &Widget) -> String {
        desired.name.clone()
    }

    fn validate(&self, operation: OperationType, desired: &Widget) -> Result<(), String> {
        if desired.name.is_empty() {
            return Err("name is required".to_string());
        }
        if operation == OperationType::Create && desired.size.is_none() {
            return Err("size is required".to_string());
        }
        Ok(())
    }

    fn guard_request(&self, desired: &Widget) -> Option<WidgetRequest> {
        self.guard
            .then(|| WidgetRequest::FindByName(desired.name.clone()))
    }

    fn create_request(&self, desired: &Widget) -> WidgetRequest {
        WidgetRequest::Create(desired.name.clone())
    }

    fn read_request(&self, desired: &Widget, resource_id: Option<&str>) -> WidgetRequest {
        WidgetRequest::Get {
            id: resource_id.map(str::to_string),
            name: desired.name.clone(),
        }
    }

    fn update_request(&self, _desired: &Widget, current: &WidgetState) -> WidgetRequest {
        WidgetRequest::Update {
            id: current.id.clone(),
            version: current.version.clone(),
        }
    }

    fn delete_request(&self, _desired: &Widget, resource_id: Option<&str>) -> WidgetRequest {
        WidgetRequest::Delete(resource_id.map(str::to_string))
    }

    fn list_request(&self, _desired: &Widget, cursor: Option<&str>) -> WidgetRequest {
        WidgetRequest::List(cursor.map(str::to_string))
    }

    fn from_response(&self, response: WidgetResponse) -> Observation<WidgetState> {
        match response {
            WidgetResponse::One(state) => Observation::Resource(state),
            WidgetResponse::Nothing => Observation::Absent,
            WidgetResponse::Many(items, next) => Observation::Page(Page::new(items, next)),
            WidgetResponse::Accepted => Observation::Accepted,
        }
    }

    fn refresh_after_stabilize(&self) -> bool {
        self.refresh
    }
}

/// Replays scripted responses in order and records every request
#[derive(Debug, Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<WidgetResponse, ServiceError>>>,
    calls: Mutex<Vec<WidgetRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, response: WidgetResponse) -> &Self {
        self.script.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn fail(&self, code: &str, message: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(ServiceError::new(code, message)));
        self
    }

    pub fn calls(&self) -> Vec<WidgetRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn read_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_read()).count()
    }
}

#[async_trait]
impl ServiceClient for ScriptedClient {
    type Request = WidgetRequest;
    type Response = WidgetResponse;

    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, request: WidgetRequest) -> Result<WidgetResponse, ServiceError> {
        self.calls.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::new("Unscripted", format!("{request:?}"))))
    }
}

pub type WidgetOrchestrator = Orchestrator<WidgetTranslator, Arc<ScriptedClient>>;

pub fn test_config() -> EngineConfig {
    EngineConfig::default()
        .with_max_attempts(5)
        .with_poll_interval(Duration::from_secs(3))
}

pub fn orchestrator(client: &Arc<ScriptedClient>) -> WidgetOrchestrator {
    Orchestrator::new(WidgetTranslator::default(), Arc::clone(client), test_config())
}

pub fn orchestrator_with(
    client: &Arc<ScriptedClient>,
    translator: WidgetTranslator,
    config: EngineConfig,
) -> WidgetOrchestrator {
    Orchestrator::new(translator, Arc::clone(client), config)
}
