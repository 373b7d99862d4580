use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Outbound queue-service request timeout (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Top-level config (qflow.toml + QFLOW_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QflowConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Outbound queue-service settings consumed by the HTTP queue client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Base URL of the external queue service, without a trailing slash
    /// (e.g. `https://queues.example.com`).
    pub backend_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl QflowConfig {
    /// Load configuration, merging (lowest to highest precedence):
    ///   1. `qflow.toml` at `config_path` (or `./qflow.toml`)
    ///   2. `QFLOW_*` environment variables, `__` as the section separator
    ///      (e.g. `QFLOW_QUEUE__BACKEND_BASE_URL`)
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or("qflow.toml");

        let config: QflowConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("QFLOW_").split("__"))
            .extract()
            .map_err(|e| crate::error::QflowError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
