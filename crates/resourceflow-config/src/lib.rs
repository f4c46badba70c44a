pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "RESOURCEFLOW_CONFIG_PATH";
pub const MAX_ATTEMPTS_ENV: &str = "RESOURCEFLOW_MAX_ATTEMPTS";
pub const POLL_INTERVAL_ENV: &str = "RESOURCEFLOW_POLL_INTERVAL";

const CANDIDATES: [&str; 2] = ["resourceflow.local.yaml", "resourceflow.yaml"];

/// エンジン設定
///
/// ```yaml
/// max_attempts: 20
/// poll_interval_secs: 15
/// backoff:
///   initial_secs: 5
///   max_secs: 60
///   multiplier: 2.0
/// error_codes:
///   QuotaExceeded: THROTTLED
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// ポーリングとリトライで共有する試行回数の上限
    pub max_attempts: u32,

    pub poll_interval_secs: u64,

    pub backoff: BackoffSettings,

    /// サービス固有のエラーコード → エラー種別 (例: "THROTTLED")
    pub error_codes: BTreeMap<String, String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            poll_interval_secs: 10,
            backoff: BackoffSettings::default(),
            error_codes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffSettings {
    pub initial_secs: u64,
    pub max_secs: u64,
    pub multiplier: f64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_secs: 5,
            max_secs: 120,
            multiplier: 2.0,
        }
    }
}

impl EngineSettings {
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts は 1 以上である必要があります".to_string(),
            ));
        }
        if self.backoff.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "backoff.multiplier は 1.0 以上である必要があります".to_string(),
            ));
        }
        if self.backoff.initial_secs > self.backoff.max_secs {
            return Err(ConfigError::Invalid(
                "backoff.initial_secs が backoff.max_secs を超えています".to_string(),
            ));
        }
        Ok(())
    }

    /// 環境変数による上書きを適用
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(value) = env_number(MAX_ATTEMPTS_ENV)? {
            self.max_attempts = value as u32;
        }
        if let Some(value) = env_number(POLL_INTERVAL_ENV)? {
            self.poll_interval_secs = value;
        }
        Ok(())
    }
}

fn env_number(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u32>()
            .map(|n| Some(u64::from(n)))
            .map_err(|_| ConfigError::InvalidEnv {
                name: name.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// resourceflowのグローバル設定ディレクトリ
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("resourceflow"))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 RESOURCEFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: resourceflow.local.yaml, resourceflow.yaml
/// 3. ./.resourceflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/resourceflow/config.yaml (グローバル設定)
///
/// どれも存在しなければ `None`
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    let current_dir = std::env::current_dir()?;
    for dir in [current_dir.clone(), current_dir.join(".resourceflow")] {
        if !dir.is_dir() {
            continue;
        }
        for filename in &CANDIDATES {
            let path = dir.join(filename);
            if path.exists() {
                return Ok(Some(path));
            }
        }
    }

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("config.yaml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

/// 設定を読み込む
///
/// 設定ファイルがなければデフォルト値を使う。環境変数はファイルの後に適用される。
pub fn load_settings() -> Result<EngineSettings> {
    let mut settings = match find_config_file()? {
        Some(path) => load_settings_from(&path)?,
        None => EngineSettings::default(),
    };
    settings.apply_env()?;
    settings.validate()?;
    Ok(settings)
}

pub fn load_settings_from(path: &Path) -> Result<EngineSettings> {
    let content = std::fs::read_to_string(path)?;
    EngineSettings::from_yaml(&content, path)
}
