//! DNS record translator

use crate::dns::{DnsRecord, DnsRequest, DnsResponse, RecordBody};
use resourceflow_core::{
    Observation, ObservedResource, OperationType, Page, ResourceStatus, Translator,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u32 = 100;

/// Desired DNS record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecordSpec {
    /// Fully qualified record name (e.g., "api.example.com")
    pub name: String,

    #[serde(rename = "type", default = "default_record_type")]
    pub record_type: String,

    #[serde(default)]
    pub content: Option<String>,

    /// 1 = automatic
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    #[serde(default)]
    pub proxied: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

fn default_record_type() -> String {
    "A".to_string()
}

fn default_ttl() -> u32 {
    1
}

impl DnsRecordSpec {
    fn body(&self) -> RecordBody {
        RecordBody {
            record_type: self.record_type.clone(),
            name: self.name.clone(),
            content: self.content.clone().unwrap_or_default(),
            ttl: self.ttl,
            proxied: self.proxied,
        }
    }
}

/// Observed DNS record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecordState {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
    pub status: ResourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<String>,
}

impl From<DnsRecord> for DnsRecordState {
    /// Records are live as soon as the API returns them
    fn from(record: DnsRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            record_type: record.record_type,
            content: record.content,
            ttl: record.ttl,
            proxied: record.proxied,
            status: ResourceStatus::Active,
            modified_on: record.modified_on,
        }
    }
}

impl ObservedResource for DnsRecordState {
    fn status(&self) -> ResourceStatus {
        self.status
    }

    fn identifier(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn version(&self) -> Option<&str> {
        self.modified_on.as_deref()
    }
}

/// Cloudflare DNS records in one zone
#[derive(Debug, Clone)]
pub struct DnsRecordTranslator {
    pub per_page: u32,
}

impl Default for DnsRecordTranslator {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Translator for DnsRecordTranslator {
    type Desired = DnsRecordSpec;
    type Observed = DnsRecordState;
    type Request = DnsRequest;
    type Response = DnsResponse;

    fn resource_type(&self) -> &str {
        "dns-record"
    }

    fn resource_key(&self, desired: &DnsRecordSpec) -> String {
        format!("{} {}", desired.record_type, desired.name)
    }

    fn validate(&self, operation: OperationType, desired: &DnsRecordSpec) -> Result<(), String> {
        if operation == OperationType::List {
            return Ok(());
        }
        if desired.name.trim().is_empty() {
            return Err("record name is required".to_string());
        }
        if desired.record_type.trim().is_empty() {
            return Err("record type is required".to_string());
        }
        let needs_content = matches!(operation, OperationType::Create | OperationType::Update);
        if needs_content && desired.content.as_deref().is_none_or(str::is_empty) {
            return Err("record content is required".to_string());
        }
        Ok(())
    }

    fn guard_request(&self, desired: &DnsRecordSpec) -> Option<DnsRequest> {
        Some(find(desired))
    }

    fn create_request(&self, desired: &DnsRecordSpec) -> DnsRequest {
        DnsRequest::Create(desired.body())
    }

    fn read_request(&self, desired: &DnsRecordSpec, resource_id: Option<&str>) -> DnsRequest {
        match resource_id.map(str::to_string).or_else(|| desired.id.clone()) {
            Some(id) => DnsRequest::Get(id),
            None => find(desired),
        }
    }

    fn update_request(&self, desired: &DnsRecordSpec, current: &DnsRecordState) -> DnsRequest {
        DnsRequest::Update {
            id: current.id.clone(),
            body: desired.body(),
        }
    }

    /// The delete pre-check always records the ID before this runs
    fn delete_request(&self, desired: &DnsRecordSpec, resource_id: Option<&str>) -> DnsRequest {
        let id = resource_id
            .map(str::to_string)
            .or_else(|| desired.id.clone())
            .unwrap_or_default();
        DnsRequest::Delete(id)
    }

    fn list_request(&self, desired: &DnsRecordSpec, cursor: Option<&str>) -> DnsRequest {
        DnsRequest::List {
            name: (!desired.name.is_empty()).then(|| desired.name.clone()),
            page: cursor.and_then(|c| c.parse().ok()).unwrap_or(1),
            per_page: self.per_page,
        }
    }

    fn from_response(&self, response: DnsResponse) -> Observation<DnsRecordState> {
        match response {
            DnsResponse::Record(record) => Observation::Resource(record.into()),
            DnsResponse::NoRecord => Observation::Absent,
            DnsResponse::Records { records, next_page } => Observation::Page(Page::new(
                records.into_iter().map(DnsRecordState::from).collect(),
                next_page.map(|p| p.to_string()),
            )),
            DnsResponse::Deleted => Observation::Accepted,
        }
    }
}

fn find(desired: &DnsRecordSpec) -> DnsRequest {
    DnsRequest::Find {
        name: desired.name.clone(),
        record_type: desired.record_type.clone(),
    }
}
