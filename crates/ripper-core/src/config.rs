use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::adapter::HttpOptions;

/// Global configuration loaded from `~/.config/ripper/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RipperConfig {
    /// Maximum number of chapter jobs downloading at once.
    pub max_concurrent_jobs: usize,
    /// Whole-request timeout in seconds for adapter HTTP requests.
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds for adapter HTTP requests.
    pub connect_timeout_secs: u64,
    /// Save directory used when neither the command line nor the session names one.
    #[serde(default)]
    pub default_save_dir: Option<PathBuf>,
    /// Number chapter names by default.
    #[serde(default)]
    pub chapter_prefix: bool,
    /// Optional User-Agent header sent by adapters.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for RipperConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            request_timeout_secs: 30,
            connect_timeout_secs: 15,
            default_save_dir: None,
            chapter_prefix: false,
            user_agent: None,
        }
    }
}

impl RipperConfig {
    /// Per-request limits handed to the HTTP-backed adapters.
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            user_agent: self.user_agent.clone(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ripper")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RipperConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RipperConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: RipperConfig = toml::from_str(&data)?;
    Ok(cfg)
}
