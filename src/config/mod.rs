//! Configuration module

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub gluehome: GlueHomeConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// One configured Glue Home account
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub api_key: String,
    /// Stable id of this config entry; generated at startup when absent
    #[serde(default)]
    pub entry_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlueHomeConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for GlueHomeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    /// Unset means transient failures are retried forever
    #[serde(default)]
    pub max_consecutive_failures: Option<u32>,
    #[serde(default = "default_setup_retry")]
    pub setup_retry_secs: u64,
    #[serde(default)]
    pub max_setup_attempts: Option<u32>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            timeout_secs: default_fetch_timeout(),
            max_consecutive_failures: None,
            setup_retry_secs: default_setup_retry(),
            max_setup_attempts: None,
        }
    }
}

impl RefreshConfig {
    pub fn setup_retry_delay(&self) -> Duration {
        Duration::from_secs(self.setup_retry_secs)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8099
}

fn default_base_url() -> String {
    "https://user-api.gluehome.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_interval() -> u64 {
    30
}

fn default_fetch_timeout() -> u64 {
    60
}

fn default_setup_retry() -> u64 {
    30
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("GLUEHOME").separator("__"))
            .build()?;

        Self::from_settings(settings)
    }

    pub fn from_settings(settings: config::Config) -> anyhow::Result<Self> {
        Ok(settings.try_deserialize()?)
    }
}
