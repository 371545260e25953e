use crate::migration::SettleConfig;
use crate::reconciliation::ReconcileStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;

/// Namespace declared by hierarchy documents
pub const DEFAULT_NAMESPACE: &str = "http://schemas.microsoft.com/office/onenote/2013/onenote";

/// Appended to the local notebook name to form the remote notebook name
pub const DEFAULT_REMOTE_SUFFIX: &str = " - Remote";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_remote_suffix() -> String {
    DEFAULT_REMOTE_SUFFIX.to_string()
}

fn default_settle_interval_ms() -> u64 {
    250
}

fn default_settle_timeout_ms() -> u64 {
    10_000
}

/// Migration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrateConfig {
    /// XML namespace of hierarchy documents, handed to the store
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_remote_suffix")]
    pub remote_suffix: String,
    #[serde(default)]
    pub strategy: ReconcileStrategy,
    /// Delay between two hierarchy fetches while waiting for a copy to settle
    #[serde(default = "default_settle_interval_ms")]
    pub settle_interval_ms: u64,
    /// Give up waiting for a copy to settle after this long
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
    /// Where the disposable working copy goes. Defaults to the OS temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            remote_suffix: default_remote_suffix(),
            strategy: ReconcileStrategy::default(),
            settle_interval_ms: default_settle_interval_ms(),
            settle_timeout_ms: default_settle_timeout_ms(),
            work_dir: None,
        }
    }
}

impl MigrateConfig {
    pub fn settle(&self) -> SettleConfig {
        SettleConfig {
            interval: Duration::from_millis(self.settle_interval_ms),
            timeout: Duration::from_millis(self.settle_timeout_ms),
        }
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Read the configuration file
pub async fn read_config(config_path: &Path) -> Result<Option<MigrateConfig>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(config_path).await?;
    let config: MigrateConfig = serde_json::from_str(&content)?;
    Ok(Some(config))
}

/// Write the configuration file
pub async fn write_config(config_path: &Path, config: &MigrateConfig) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_path, content).await?;
    Ok(())
}
