use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch project directory the binary runs in
pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// `rflow` with the project as cwd and no ambient configuration
    #[allow(deprecated)]
    pub fn rflow(&self) -> Command {
        let mut cmd = Command::cargo_bin("rflow").unwrap();
        cmd.current_dir(self.path())
            .env_remove("RESOURCEFLOW_CONFIG_PATH")
            .env_remove("RESOURCEFLOW_MAX_ATTEMPTS")
            .env_remove("RESOURCEFLOW_POLL_INTERVAL")
            .env_remove("RESOURCEFLOW_PROVIDER")
            .env_remove("CLOUDFLARE_API_TOKEN")
            .env_remove("CLOUDFLARE_ZONE_ID")
            .env_remove("RUST_LOG");
        cmd
    }
}
