//! Cloudflare DNS API client
//!
//! Direct Cloudflare API implementation for DNS record management.
//! Uses Bearer token authentication.

use crate::error::{CloudflareError, Result};
use async_trait::async_trait;
use resourceflow_core::{ServiceClient, ServiceError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Longest body excerpt kept in an error message
const BODY_EXCERPT_LEN: usize = 200;

/// Unwrap the API envelope of a response body
///
/// Error statuses whose body is not an envelope (HTML pages from the edge
/// on 429/502/503) are reported by status.
fn parse_envelope<T: DeserializeOwned>(
    status: u16,
    body: &str,
) -> Result<(T, Option<ResultInfo>)> {
    let api_response: ApiResponse<T> = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(_) if status >= 400 => {
            return Err(CloudflareError::ApiError {
                status,
                code: None,
                message: body.trim().chars().take(BODY_EXCERPT_LEN).collect(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    match api_response.result {
        Some(result) if api_response.success => Ok((result, api_response.result_info)),
        _ => {
            let first = api_response.errors.first();
            Err(CloudflareError::ApiError {
                status,
                code: first.map(|e| e.code),
                message: first
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Unknown error".to_string()),
            })
        }
    }
}

/// Configuration for the DNS client
#[derive(Debug, Clone)]
pub struct DnsConfig {
    pub api_token: String,
    pub zone_id: String,
}

impl DnsConfig {
    /// Create DnsConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let api_token = std::env::var("CLOUDFLARE_API_TOKEN")
            .map_err(|_| CloudflareError::MissingEnvVar("CLOUDFLARE_API_TOKEN".to_string()))?;
        let zone_id = std::env::var("CLOUDFLARE_ZONE_ID")
            .map_err(|_| CloudflareError::MissingEnvVar("CLOUDFLARE_ZONE_ID".to_string()))?;

        Ok(Self { api_token, zone_id })
    }
}

/// Cloudflare DNS client
pub struct CloudflareDns {
    client: reqwest::Client,
    api_token: String,
    zone_id: String,
    base_url: String,
}

impl CloudflareDns {
    pub fn new(config: DnsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token: config.api_token,
            zone_id: config.zone_id,
            base_url: CLOUDFLARE_API_BASE.to_string(),
        }
    }

    /// Point the client at another API root (a proxy or a local stub)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    fn record_url(&self, record_id: &str) -> String {
        format!("{}/{}", self.records_url(), record_id)
    }

    /// Send a request and unwrap the API envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(T, Option<ResultInfo>)> {
        let response = request.bearer_auth(&self.api_token).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_envelope(status, &body)
    }

    /// Find a DNS record by full name and type
    pub async fn find_record(&self, name: &str, record_type: &str) -> Result<Option<DnsRecord>> {
        let request = self
            .client
            .get(self.records_url())
            .query(&[("name", name), ("type", record_type)]);
        let (records, _): (Vec<DnsRecord>, _) = self.send(request).await?;
        Ok(records.into_iter().next())
    }

    pub async fn get_record(&self, record_id: &str) -> Result<DnsRecord> {
        let (record, _) = self.send(self.client.get(self.record_url(record_id))).await?;
        Ok(record)
    }

    pub async fn create_record(&self, body: &RecordBody) -> Result<DnsRecord> {
        let request = self.client.post(self.records_url()).json(body);
        let (record, _) = self.send(request).await?;
        Ok(record)
    }

    /// Overwrite an existing DNS record
    pub async fn update_record(&self, record_id: &str, body: &RecordBody) -> Result<DnsRecord> {
        let request = self.client.put(self.record_url(record_id)).json(body);
        let (record, _) = self.send(request).await?;
        Ok(record)
    }

    pub async fn delete_record(&self, record_id: &str) -> Result<()> {
        let (_deleted, _): (DeleteResult, _) =
            self.send(self.client.delete(self.record_url(record_id))).await?;
        Ok(())
    }

    /// List one page of DNS records, optionally filtered by name
    pub async fn list_records(
        &self,
        name: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<DnsRecord>, Option<u32>)> {
        let mut query = vec![("page", page.to_string()), ("per_page", per_page.to_string())];
        if let Some(name) = name {
            query.push(("name", name.to_string()));
        }
        let request = self.client.get(self.records_url()).query(&query);
        let (records, info) = self.send(request).await?;
        Ok((records, info.and_then(|i| i.next_page())))
    }
}

/// One DNS API call
#[derive(Debug, Clone, PartialEq)]
pub enum DnsRequest {
    Find { name: String, record_type: String },
    Get(String),
    Create(RecordBody),
    Update { id: String, body: RecordBody },
    Delete(String),
    List {
        name: Option<String>,
        page: u32,
        per_page: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DnsResponse {
    Record(DnsRecord),
    NoRecord,
    Records {
        records: Vec<DnsRecord>,
        next_page: Option<u32>,
    },
    Deleted,
}

#[async_trait]
impl ServiceClient for CloudflareDns {
    type Request = DnsRequest;
    type Response = DnsResponse;

    fn name(&self) -> &str {
        "cloudflare-dns"
    }

    async fn invoke(&self, request: DnsRequest) -> std::result::Result<DnsResponse, ServiceError> {
        tracing::debug!("Cloudflare DNS request: {:?}", request);
        let response = match request {
            DnsRequest::Find { name, record_type } => {
                match self.find_record(&name, &record_type).await? {
                    Some(record) => DnsResponse::Record(record),
                    None => DnsResponse::NoRecord,
                }
            }
            DnsRequest::Get(id) => DnsResponse::Record(self.get_record(&id).await?),
            DnsRequest::Create(body) => DnsResponse::Record(self.create_record(&body).await?),
            DnsRequest::Update { id, body } => {
                DnsResponse::Record(self.update_record(&id, &body).await?)
            }
            DnsRequest::Delete(id) => {
                self.delete_record(&id).await?;
                DnsResponse::Deleted
            }
            DnsRequest::List {
                name,
                page,
                per_page,
            } => {
                let (records, next_page) =
                    self.list_records(name.as_deref(), page, per_page).await?;
                DnsResponse::Records { records, next_page }
            }
        };
        Ok(response)
    }
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<ApiError>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i32,
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultInfo {
    pub page: u32,
    pub total_pages: u32,
}

impl ResultInfo {
    pub fn next_page(&self) -> Option<u32> {
        (self.page < self.total_pages).then(|| self.page + 1)
    }
}

/// DNS record as returned by the API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
    pub modified_on: Option<String>,
}

/// Request body for create and overwrite
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordBody {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    /// 1 = automatic
    pub ttl: u32,
    pub proxied: bool,
}

#[derive(Debug, Deserialize)]
struct DeleteResult {
    #[allow(dead_code)]
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_envelope() {
        let body = r#"{
            "success": true,
            "errors": [],
            "result": [{
                "id": "372e67954025e0ba6aaa6d586b9e0b59",
                "name": "www.example.com",
                "type": "A",
                "content": "198.51.100.4",
                "ttl": 3600,
                "proxied": false,
                "modified_on": "2026-01-01T05:20:00.12345Z"
            }],
            "result_info": {"page": 1, "per_page": 20, "total_pages": 3}
        }"#;
        let response: ApiResponse<Vec<DnsRecord>> = serde_json::from_str(body).unwrap();
        assert!(response.success);
        let records = response.result.unwrap();
        assert_eq!(records[0].record_type, "A");
        assert_eq!(
            records[0].modified_on.as_deref(),
            Some("2026-01-01T05:20:00.12345Z")
        );
        assert_eq!(response.result_info.unwrap().next_page(), Some(2));
    }

    #[test]
    fn test_parse_error_envelope() {
        let body = r#"{
            "success": false,
            "errors": [{"code": 81044, "message": "Record does not exist."}],
            "result": null
        }"#;
        let response: ApiResponse<DnsRecord> = serde_json::from_str(body).unwrap();
        assert!(!response.success);
        assert!(response.result.is_none());
        assert_eq!(response.errors[0].code, 81044);
    }

    #[test]
    fn test_html_error_page_is_reported_by_status() {
        let body = "<html><head><title>503 Service Unavailable</title></head></html>";
        let err = parse_envelope::<DnsRecord>(503, body).unwrap_err();
        assert!(matches!(
            &err,
            CloudflareError::ApiError { status: 503, code: None, message } if message.contains("503")
        ));
        assert_eq!(ServiceError::from(err).code, "503");

        let err = parse_envelope::<DnsRecord>(429, &"x".repeat(1000)).unwrap_err();
        assert!(matches!(
            err,
            CloudflareError::ApiError { status: 429, ref message, .. } if message.len() == BODY_EXCERPT_LEN
        ));
    }

    #[test]
    fn test_garbage_success_body_is_malformed() {
        let err = parse_envelope::<DnsRecord>(200, "<html></html>").unwrap_err();
        assert!(matches!(err, CloudflareError::JsonError(_)));
    }

    #[test]
    fn test_last_page_has_no_next() {
        let info = ResultInfo {
            page: 3,
            total_pages: 3,
        };
        assert_eq!(info.next_page(), None);
    }

    #[test]
    fn test_record_urls() {
        let dns = CloudflareDns::new(DnsConfig {
            api_token: "test".to_string(),
            zone_id: "zone".to_string(),
        })
        .with_base_url("http://localhost:8080");

        assert_eq!(dns.records_url(), "http://localhost:8080/zones/zone/dns_records");
        assert_eq!(
            dns.record_url("abc"),
            "http://localhost:8080/zones/zone/dns_records/abc"
        );
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("CLOUDFLARE_API_TOKEN", Some("token")),
                ("CLOUDFLARE_ZONE_ID", None),
            ],
            || {
                assert!(matches!(
                    DnsConfig::from_env(),
                    Err(CloudflareError::MissingEnvVar(name)) if name == "CLOUDFLARE_ZONE_ID"
                ));
            },
        );
        temp_env::with_vars(
            [
                ("CLOUDFLARE_API_TOKEN", Some("token")),
                ("CLOUDFLARE_ZONE_ID", Some("zone")),
            ],
            || {
                let config = DnsConfig::from_env().unwrap();
                assert_eq!(config.zone_id, "zone");
            },
        );
    }
}
