use serde::{Deserialize, Serialize};

use crate::entity::department;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Hierarchy rules
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level: trace, debug, info, warn, error
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

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database type (postgres)
    #[serde(default = "default_db_type", rename = "type")]
    pub db_type: String,
    /// Database host
    #[serde(default = "default_db_host")]
    pub host: String,
    /// Database port
    #[serde(default = "default_db_port")]
    pub port: u16,
    /// Database name
    #[serde(default = "default_db_name", rename = "database")]
    pub name: String,
    /// Database user
    #[serde(default = "default_db_user", rename = "username")]
    pub user: String,
    /// Database password
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HierarchyConfig {
    /// Position tiers allowed to manage a department
    #[serde(default = "default_manager_positions")]
    pub manager_positions: Vec<String>,
    /// Status given to new departments when the request has none
    #[serde(default = "default_active_status")]
    pub active_status: String,
    /// Status forced onto descendants of a deleted department
    #[serde(default = "default_inactive_status")]
    pub inactive_status: String,
    /// Maximum department name length in characters, capped at the column width
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
    /// Maximum department code length in characters, capped at the column width
    #[serde(default = "default_max_code_len")]
    pub max_code_len: usize,
    /// Maximum status length in characters, capped at the column width
    #[serde(default = "default_max_status_len")]
    pub max_status_len: usize,
}

fn default_db_type() -> String {
    "postgres".to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_name() -> String {
    "orgtree".to_string()
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_manager_positions() -> Vec<String> {
    vec!["senior_manager".to_string(), "middle_manager".to_string()]
}

fn default_active_status() -> String {
    "active".to_string()
}

fn default_inactive_status() -> String {
    "inactive".to_string()
}

fn default_max_name_len() -> usize {
    department::NAME_WIDTH
}

fn default_max_code_len() -> usize {
    department::CODE_WIDTH
}

fn default_max_status_len() -> usize {
    department::STATUS_WIDTH
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: default_db_type(),
            host: default_db_host(),
            port: default_db_port(),
            name: default_db_name(),
            user: default_db_user(),
            password: String::new(),
        }
    }
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            manager_positions: default_manager_positions(),
            active_status: default_active_status(),
            inactive_status: default_inactive_status(),
            max_name_len: default_max_name_len(),
            max_code_len: default_max_code_len(),
            max_status_len: default_max_status_len(),
        }
    }
}

impl DatabaseConfig {
    /// Generate database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

impl HierarchyConfig {
    /// Whether a user holding `position` may manage a department
    pub fn is_manager_position(&self, position: &str) -> bool {
        self.manager_positions
            .iter()
            .any(|p| p.eq_ignore_ascii_case(position))
    }

    /// Effective name limit; a larger configured value would overflow the column
    pub fn name_limit(&self) -> usize {
        self.max_name_len.min(department::NAME_WIDTH)
    }

    pub fn code_limit(&self) -> usize {
        self.max_code_len.min(department::CODE_WIDTH)
    }

    pub fn status_limit(&self) -> usize {
        self.max_status_len.min(department::STATUS_WIDTH)
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
