use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Background notification polling.
#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_retry")]
    pub retry_seconds: u64,
    /// Account the sync daemon signs in with; unset runs signed out.
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            retry_seconds: default_retry(),
            phone: None,
            display_name: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// How far ahead of departure a trip must be published.
    #[serde(default)]
    pub min_publish_lead_minutes: i64,
    #[serde(default = "default_search_limit")]
    pub search_result_limit: usize,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            min_publish_lead_minutes: 0,
            search_result_limit: default_search_limit(),
        }
    }
}

fn default_timeout() -> u64 { 30 }
fn default_interval() -> u64 { 15 * 60 }
fn default_retry() -> u64 { 60 }
fn default_search_limit() -> usize { 50 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `YOL__SERVER__PORT=9000` overrides `server.port`
            .add_source(config::Environment::with_prefix("YOL").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Parse a TOML document directly, without the file and env layers.
    pub fn from_toml(raw: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
