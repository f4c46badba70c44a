//! File-backed context store
//!
//! Keeps the context of each in-flight operation between `rflow` runs:
//!
//! ```text
//! .resourceflow/contexts/
//!   server-web-1.json          current context
//!   server-web-1.json.backup   previous context
//! ```

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use resourceflow_core::{Context, OperationType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const CONTEXT_DIR: &str = ".resourceflow/contexts";

/// One stored context with bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "O: DeserializeOwned"))]
pub struct StoredContext<O> {
    pub key: String,
    pub operation: OperationType,
    pub updated_at: DateTime<Utc>,
    pub context: Context<O>,
}

#[derive(Serialize)]
struct StoredContextRef<'a, O> {
    key: &'a str,
    operation: OperationType,
    updated_at: DateTime<Utc>,
    context: &'a Context<O>,
}

pub struct ContextStore {
    /// Project root directory
    root: PathBuf,
}

impl ContextStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn dir(&self) -> PathBuf {
        self.root.join(CONTEXT_DIR)
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.dir().join(format!("{}.json", sanitize_key(key)))
    }

    fn backup_path(&self, key: &str) -> PathBuf {
        self.dir().join(format!("{}.json.backup", sanitize_key(key)))
    }

    pub async fn load<O: DeserializeOwned>(
        &self,
        key: &str,
    ) -> anyhow::Result<Option<StoredContext<O>>> {
        let path = self.path(key);
        if !path.exists() {
            tracing::debug!("No stored context for {}", key);
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("コンテキストを読み込めません: {}", path.display()))?;
        let stored: StoredContext<O> = serde_json::from_str(&content)
            .with_context(|| format!("コンテキストが壊れています: {}", path.display()))?;
        Ok(Some(stored))
    }

    pub async fn save<O: Serialize>(&self, key: &str, context: &Context<O>) -> anyhow::Result<()> {
        let dir = self.dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created context directory: {}", dir.display());
        }

        let path = self.path(key);
        let backup = self.backup_path(key);
        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
        }

        let stored = StoredContextRef {
            key,
            operation: context.operation(),
            updated_at: Utc::now(),
            context,
        };
        fs::write(&path, serde_json::to_string_pretty(&stored)?).await?;
        tracing::debug!("Saved {} context for {}", context.operation(), key);
        Ok(())
    }

    /// Drops the context and its backup once the operation is terminal
    pub async fn remove(&self, key: &str) -> anyhow::Result<()> {
        for path in [self.path(key), self.backup_path(key)] {
            if path.exists() {
                fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}

/// Keys become file names; anything outside `[A-Za-z0-9._-]` is replaced
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
