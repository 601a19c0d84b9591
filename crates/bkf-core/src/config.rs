use crate::export::{DownloadTarget, PollingPolicy};
use crate::transport::CurlOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How often and how long to wait for the remote export (`[polling]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Maximum number of progress checks (including the first).
    pub max_attempts: u32,
    /// Pause between two progress checks, in milliseconds.
    pub delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 600,
            delay_ms: 10_000,
        }
    }
}

/// HTTP limits (`[http]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Upper bound for a single request; the archive download is one request.
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            request_timeout_secs: 3600,
        }
    }
}

impl From<&HttpConfig> for CurlOptions {
    fn from(cfg: &HttpConfig) -> Self {
        CurlOptions {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/bkf/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BkfConfig {
    /// File name of the saved archive inside the output directory.
    pub archive_file_name: String,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for BkfConfig {
    fn default() -> Self {
        Self {
            archive_file_name: "backup.zip".to_string(),
            polling: PollingConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl BkfConfig {
    pub fn polling_policy(&self) -> Result<PollingPolicy> {
        Ok(PollingPolicy::new(
            self.polling.max_attempts,
            Duration::from_millis(self.polling.delay_ms),
        )?)
    }

    pub fn download_target(&self, dir: &Path) -> Result<DownloadTarget> {
        Ok(DownloadTarget::new(dir, self.archive_file_name.as_str())?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bkf")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BkfConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BkfConfig::default();
        let toml = default_cfg.to_toml_string()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit file, which must exist.
pub fn load_from(path: &Path) -> Result<BkfConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: BkfConfig = toml::from_str(&data)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
