//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.ayna/config.json`) and environment.
//! Every field has a default, so an empty `{}` file is a complete configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_API_HOST: &str = "http://localhost:1337";
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Backend REST API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Real-time channel settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Message thread settings.
    #[serde(default)]
    pub thread: ThreadConfig,

    /// Where the token and identity snapshot are kept.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend host and request options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Backend host, without the `api/` suffix (default "http://localhost:1337"). Overridden by AYNA_API_URL env.
    #[serde(default = "default_api_host")]
    pub base_url: String,

    /// Per-request timeout. None (default) waits indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_host(),
            request_timeout_secs: None,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Real-time channel endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeConfig {
    /// Socket.IO server origin. When unset the API host is used.
    pub url: Option<String>,
}

/// Thread history paging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadConfig {
    /// Messages per history page (default 10).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

/// Local state file location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// State file path (default ~/.ayna/state.json). Overridden by AYNA_STATE_PATH env.
    pub state_path: Option<PathBuf>,
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the API host: env AYNA_API_URL overrides config. Trailing slashes are removed.
pub fn resolve_api_host(config: &Config) -> String {
    non_empty_env("AYNA_API_URL")
        .unwrap_or_else(|| config.api.base_url.trim().to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Resolve the Socket.IO origin: `realtime.url` when set, else the API host.
pub fn resolve_realtime_url(config: &Config) -> String {
    config
        .realtime
        .url
        .as_ref()
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| resolve_api_host(config))
}

/// Resolve the local state file: env AYNA_STATE_PATH, then config, then the default next to the config dir.
pub fn resolve_state_path(config: &Config) -> PathBuf {
    non_empty_env("AYNA_STATE_PATH")
        .map(PathBuf::from)
        .or_else(|| {
            config
                .storage
                .state_path
                .clone()
                .filter(|p| !p.as_os_str().is_empty())
        })
        .unwrap_or_else(default_state_path)
}

fn default_state_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".ayna").join("state.json"))
        .unwrap_or_else(|| PathBuf::from("state.json"))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("AYNA_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".ayna").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or AYNA_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Create the config directory and an empty `{}` config file if missing. Returns the config directory.
pub fn init_config_file(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;
    if !config_path.exists() {
        std::fs::write(config_path, b"{}")
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    } else {
        log::debug!("config already exists at {}, skipping", config_path.display());
    }
    Ok(config_dir.to_path_buf())
}
