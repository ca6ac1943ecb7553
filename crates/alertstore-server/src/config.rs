use alertstore_common::types::SaveAlertsCommand;
use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub alerting: AlertingConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SeaORM connection url, e.g. `sqlite://data/alertstore.db?mode=rwc`
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Created on startup when the url points at a local SQLite file.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            data_dir: default_data_dir(),
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        self.url.trim().to_string()
    }

    pub fn is_sqlite(&self) -> bool {
        self.url.trim_start().starts_with("sqlite:")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// List rules without a dashboard in searches.
    #[serde(default = "default_standalone_alerts_enabled")]
    pub standalone_alerts_enabled: bool,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            standalone_alerts_enabled: default_standalone_alerts_enabled(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LogConfig {
    /// Default `EnvFilter` directive for this workspace's crates.
    pub fn directive(&self) -> String {
        format!("alertstore={}", self.level.trim())
    }
}

// ---- Dashboard seed file types (used by `save-alerts` CLI subcommand) ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSeedFile {
    #[serde(default)]
    pub dashboards: Vec<SaveAlertsCommand>,
}

impl DashboardSeedFile {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file '{path}'"))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse seed file '{path}'"))
    }
}

fn default_database_url() -> String {
    "sqlite://data/alertstore.db?mode=rwc".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_standalone_alerts_enabled() -> bool {
    false
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{path}'"))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{path}'"))?;
        Ok(config)
    }
}
