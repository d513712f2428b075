use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::iothub::DEFAULT_SERVICE_API_VERSION;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExplorerConfig {
    /// Auto-refresh period for the tree; 0 disables it
    #[serde(default)]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub response_timeout_secs: u64,
    #[serde(default = "default_state_path")]
    pub state_path: String,
    #[serde(default = "default_secrets_path")]
    pub secrets_path: String,
    #[serde(default = "default_hub_api_version")]
    pub hub_api_version: String,
}

fn default_timeout() -> u64 {
    10
}
fn default_state_path() -> String {
    "data/hub_state.json".to_string()
}
fn default_secrets_path() -> String {
    "data/secrets.json".to_string()
}
fn default_hub_api_version() -> String {
    DEFAULT_SERVICE_API_VERSION.to_string()
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 0,
            connect_timeout_secs: default_timeout(),
            response_timeout_secs: default_timeout(),
            state_path: default_state_path(),
            secrets_path: default_secrets_path(),
            hub_api_version: default_hub_api_version(),
        }
    }
}

impl ExplorerConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("refresh_interval_secs", 0)?
            .set_default("connect_timeout_secs", 10)?
            .set_default("response_timeout_secs", 10)?
            // Shared settings, e.g. config/default.toml
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            // Per-environment overrides
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. EXPLORER__REFRESH_INTERVAL_SECS=30)
            .add_source(Environment::with_prefix("EXPLORER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
