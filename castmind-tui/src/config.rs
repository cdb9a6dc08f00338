//! Configuration loading for the CastMind console.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use castmind_client::{CacheConfig, ClientConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "CASTMIND_TUI_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TuiConfig {
    pub api_base_url: String,
    pub auth: AuthConfig,
    pub request_timeout_ms: u64,
    pub refresh_interval_ms: u64,
    pub health_poll_ms: u64,
    pub system_health_poll_ms: u64,
    pub stale_time_ms: u64,
    pub gc_time_ms: u64,
    pub page_size: u32,
    pub persistence_path: PathBuf,
    pub error_log_path: PathBuf,
    pub export_dir: PathBuf,
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThemeConfig {
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or CASTMIND_TUI_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

impl TuiConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(invalid("api_base_url", "must not be empty"));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(invalid("api_base_url", "must start with http:// or https://"));
        }
        if self.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms", "must be > 0"));
        }
        if self.refresh_interval_ms == 0 {
            return Err(invalid("refresh_interval_ms", "must be > 0"));
        }
        if self.health_poll_ms == 0 {
            return Err(invalid("health_poll_ms", "must be > 0"));
        }
        if self.system_health_poll_ms == 0 {
            return Err(invalid("system_health_poll_ms", "must be > 0"));
        }
        if self.gc_time_ms == 0 {
            return Err(invalid("gc_time_ms", "must be > 0"));
        }
        if self.page_size == 0 {
            return Err(invalid("page_size", "must be > 0"));
        }
        if self.persistence_path.as_os_str().is_empty() {
            return Err(invalid("persistence_path", "must not be empty"));
        }
        if self.error_log_path.as_os_str().is_empty() {
            return Err(invalid("error_log_path", "must not be empty"));
        }
        if self.export_dir.as_os_str().is_empty() {
            return Err(invalid("export_dir", "must not be empty"));
        }
        if self.theme.name.trim().is_empty() {
            return Err(invalid("theme.name", "must not be empty"));
        }
        if self.theme.name.to_ascii_lowercase() != "synthbrute" {
            return Err(invalid("theme.name", "only 'synthbrute' is supported"));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.api_base_url.trim())
            .with_timeout(Duration::from_millis(self.request_timeout_ms));
        config.api_key = self.auth.api_key.clone();
        config.bearer_token = self.auth.bearer_token.clone();
        config
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default()
            .with_stale_time(Duration::from_millis(self.stale_time_ms))
            .with_gc_time(Duration::from_millis(self.gc_time_ms))
    }

    pub fn health_poll(&self) -> Duration {
        Duration::from_millis(self.health_poll_ms)
    }

    pub fn system_health_poll(&self) -> Duration {
        Duration::from_millis(self.system_health_poll_ms)
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
