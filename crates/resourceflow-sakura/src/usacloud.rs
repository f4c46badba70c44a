//! usacloud CLI wrapper
//!
//! Wraps the usacloud CLI commands for Sakura Cloud server operations and
//! exposes them to the engine as a [`ServiceClient`].

use crate::error::{Result, SakuraError};
use async_trait::async_trait;
use resourceflow_core::{ServiceClient, ServiceError};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

const USACLOUD: &str = "usacloud";

/// usacloud CLI wrapper
pub struct Usacloud {
    zone: String,
}

impl Usacloud {
    pub fn new(zone: impl Into<String>) -> Self {
        Self { zone: zone.into() }
    }

    /// Run a usacloud command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(USACLOUD);
        cmd.arg("--zone").arg(&self.zone);
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} --zone {} {}", USACLOUD, self.zone, args.join(" "));

        let output = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SakuraError::UsacloudNotFound,
            _ => SakuraError::IoError(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SakuraError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// List all servers, optionally filtered by tag
    pub async fn list_servers(&self, tag: Option<&str>) -> Result<Vec<ServerInfo>> {
        let mut args = vec!["server", "list", "--output-type", "json"];
        if let Some(tag) = tag {
            args.push("--tags");
            args.push(tag);
        }
        let output = self.run_command(&args).await?;

        if output.trim().is_empty() || output.trim() == "[]" {
            return Ok(Vec::new());
        }

        let servers: Vec<ServerInfo> = serde_json::from_str(&output)?;
        Ok(servers)
    }

    /// Get server by name
    pub async fn get_server(&self, name: &str) -> Result<Option<ServerInfo>> {
        let servers = self.list_servers(None).await?;
        Ok(servers.into_iter().find(|s| s.name == name))
    }

    /// Get server by ID
    pub async fn get_server_by_id(&self, id: &str) -> Result<ServerInfo> {
        let output = self
            .run_command(&["server", "read", id, "--output-type", "json"])
            .await?;

        Ok(parse_single(&output)?)
    }

    /// Create a server
    pub async fn create_server(&self, spec: &ServerSpec) -> Result<ServerInfo> {
        // Store string conversions to extend their lifetime
        let core_str = spec.core.unwrap_or_default().to_string();
        let memory_str = spec.memory_gb.unwrap_or_default().to_string();
        let disk_size_str = spec.disk_size_gb.map(|d| d.to_string());

        let mut args = vec![
            "server",
            "create",
            "--name",
            spec.name.as_str(),
            "--core",
            core_str.as_str(),
            "--memory",
            memory_str.as_str(),
            "--output-type",
            "json",
            "--yes",
        ];

        if let Some(ref disk_size) = disk_size_str {
            args.push("--disk-size");
            args.push(disk_size.as_str());
        }

        if let Some(ref os) = spec.os_type {
            args.push("--os-type");
            args.push(os.as_str());
        }

        for tag in &spec.tags {
            args.push("--tags");
            args.push(tag.as_str());
        }

        let output = self.run_command(&args).await?;
        Ok(parse_single(&output)?)
    }

    /// Update mutable server attributes (name, tags)
    pub async fn update_server(&self, id: &str, spec: &ServerSpec) -> Result<ServerInfo> {
        let mut args = vec![
            "server",
            "update",
            id,
            "--name",
            spec.name.as_str(),
            "--output-type",
            "json",
            "--yes",
        ];
        for tag in &spec.tags {
            args.push("--tags");
            args.push(tag.as_str());
        }

        let output = self.run_command(&args).await?;
        Ok(parse_single(&output)?)
    }

    /// Delete a server
    pub async fn delete_server(&self, id: &str, with_disks: bool) -> Result<()> {
        let mut args = vec!["server", "delete", id, "--yes", "--force"];

        if with_disks {
            args.push("--with-disks");
        }

        self.run_command(&args).await?;
        Ok(())
    }
}

/// usacloud prints either one object or a one-element array
fn parse_single(output: &str) -> serde_json::Result<ServerInfo> {
    match serde_json::from_str::<Vec<ServerInfo>>(output) {
        Ok(mut servers) if !servers.is_empty() => Ok(servers.remove(0)),
        _ => serde_json::from_str(output),
    }
}

/// Server information from usacloud
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "CPU")]
    pub cpu: Option<i32>,

    #[serde(rename = "MemoryMB")]
    pub memory_mb: Option<i32>,

    #[serde(rename = "Availability")]
    pub availability: Option<String>,

    #[serde(rename = "InstanceStatus")]
    pub instance_status: Option<String>,

    #[serde(rename = "Interfaces")]
    pub interfaces: Option<Vec<InterfaceInfo>>,

    #[serde(rename = "Tags", default)]
    pub tags: Vec<String>,

    #[serde(rename = "ModifiedAt")]
    pub modified_at: Option<String>,
}

impl ServerInfo {
    /// Get the first IP address
    pub fn ip_address(&self) -> Option<String> {
        self.interfaces
            .as_ref()?
            .iter()
            .find_map(|i| i.ip_address.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    #[serde(rename = "IPAddress")]
    pub ip_address: Option<String>,
}

/// Desired server
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    pub name: String,

    /// vCPU count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Known server ID; otherwise the server is looked up by name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// One usacloud call
#[derive(Debug, Clone, PartialEq)]
pub enum SakuraRequest {
    FindByName(String),
    Create(ServerSpec),
    Read { id: Option<String>, name: String },
    Update { id: String, spec: ServerSpec },
    Delete { id: String, with_disks: bool },
    List {
        tag: Option<String>,
        offset: usize,
        limit: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SakuraResponse {
    Server(ServerInfo),
    NoServer,
    Servers {
        servers: Vec<ServerInfo>,
        next_offset: Option<usize>,
    },
    Deleted,
}

/// Slice one page out of a full server listing
pub fn paginate(
    servers: Vec<ServerInfo>,
    offset: usize,
    limit: usize,
) -> (Vec<ServerInfo>, Option<usize>) {
    let total = servers.len();
    let page: Vec<ServerInfo> = servers.into_iter().skip(offset).take(limit).collect();
    let end = offset + page.len();
    let next = (end < total && !page.is_empty()).then_some(end);
    (page, next)
}

#[async_trait]
impl ServiceClient for Usacloud {
    type Request = SakuraRequest;
    type Response = SakuraResponse;

    fn name(&self) -> &str {
        "usacloud"
    }

    async fn invoke(
        &self,
        request: SakuraRequest,
    ) -> std::result::Result<SakuraResponse, ServiceError> {
        let response = match request {
            SakuraRequest::FindByName(name) | SakuraRequest::Read { id: None, name } => {
                match self.get_server(&name).await? {
                    Some(server) => SakuraResponse::Server(server),
                    None => SakuraResponse::NoServer,
                }
            }
            SakuraRequest::Read { id: Some(id), .. } => {
                SakuraResponse::Server(self.get_server_by_id(&id).await?)
            }
            SakuraRequest::Create(spec) => SakuraResponse::Server(self.create_server(&spec).await?),
            SakuraRequest::Update { id, spec } => {
                SakuraResponse::Server(self.update_server(&id, &spec).await?)
            }
            SakuraRequest::Delete { id, with_disks } => {
                self.delete_server(&id, with_disks).await?;
                SakuraResponse::Deleted
            }
            SakuraRequest::List { tag, offset, limit } => {
                let servers = self.list_servers(tag.as_deref()).await?;
                let (servers, next_offset) = paginate(servers, offset, limit);
                SakuraResponse::Servers {
                    servers,
                    next_offset,
                }
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(id: &str) -> ServerInfo {
        ServerInfo {
            id: id.to_string(),
            name: format!("srv-{id}"),
            cpu: Some(2),
            memory_mb: Some(4096),
            availability: Some("available".to_string()),
            instance_status: Some("up".to_string()),
            interfaces: None,
            tags: Vec::new(),
            modified_at: None,
        }
    }

    #[test]
    fn test_server_info_ip() {
        let server = ServerInfo {
            interfaces: Some(vec![InterfaceInfo {
                ip_address: Some("192.168.1.1".to_string()),
            }]),
            ..server("123")
        };

        assert_eq!(server.ip_address(), Some("192.168.1.1".to_string()));
    }

    #[test]
    fn test_parse_server_json() {
        let output = r#"[{
            "ID": "113100000001",
            "Name": "web-1",
            "CPU": 2,
            "MemoryMB": 4096,
            "Availability": "migrating",
            "InstanceStatus": "down",
            "Tags": ["web"],
            "ModifiedAt": "2026-01-01T00:00:00+09:00"
        }]"#;
        let server = parse_single(output).unwrap();
        assert_eq!(server.id, "113100000001");
        assert_eq!(server.availability.as_deref(), Some("migrating"));
        assert_eq!(server.tags, vec!["web"]);
        assert!(server.interfaces.is_none());

        let single = parse_single(r#"{"ID": "1", "Name": "a"}"#).unwrap();
        assert_eq!(single.name, "a");
    }

    #[test]
    fn test_paginate() {
        let servers: Vec<ServerInfo> = (1..=5).map(|i| server(&i.to_string())).collect();

        let (first, next) = paginate(servers.clone(), 0, 2);
        assert_eq!(first.len(), 2);
        assert_eq!(next, Some(2));

        let (last, next) = paginate(servers.clone(), 4, 2);
        assert_eq!(last[0].id, "5");
        assert_eq!(next, None);

        let (beyond, next) = paginate(servers, 10, 2);
        assert!(beyond.is_empty());
        assert_eq!(next, None);
    }

    #[test]
    fn test_server_spec_from_json() {
        let spec: ServerSpec = serde_json::from_value(serde_json::json!({
            "name": "web-1",
            "core": 2,
            "memoryGb": 4,
            "tags": ["web"]
        }))
        .unwrap();
        assert_eq!(spec.core, Some(2));
        assert_eq!(spec.memory_gb, Some(4));
        assert!(spec.id.is_none());
    }
}
