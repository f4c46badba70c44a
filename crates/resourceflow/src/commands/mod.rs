pub mod invoke;
pub mod lifecycle;
pub mod read;

use anyhow::Context as _;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Reads JSON from a file, or from stdin when the path is `-`
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("標準入力を読み込めません")?;
        buf
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("ファイルを読み込めません: {}", path.display()))?
    };

    serde_json::from_str(&content)
        .with_context(|| format!("JSON を解析できません: {}", path.display()))
}
