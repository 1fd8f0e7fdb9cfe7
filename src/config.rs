use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::auth::DEFAULT_TOKEN_BYTES;
use crate::auth::password::{DEFAULT_ITERATIONS, DEFAULT_MEMORY_KIB, DEFAULT_PARALLELISM};
use crate::db::DEFAULT_MAX_CONNECTIONS;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// PostgreSQL connection URL; absent means the in-memory store
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub postgres_max_connections: u32,
    /// Create a dev account and API key at startup
    #[serde(default)]
    pub seed_dev_data: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    /// Absolute session lifetime, counted from login
    pub session_timeout_secs: u64,
    /// Entropy of session IDs and API keys
    pub token_bytes: usize,
    pub password_memory_kib: u32,
    pub password_iterations: u32,
    pub password_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_timeout_secs: 12 * 60 * 60,
            token_bytes: DEFAULT_TOKEN_BYTES,
            password_memory_kib: DEFAULT_MEMORY_KIB,
            password_iterations: DEFAULT_ITERATIONS,
            password_parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl AuthConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

fn default_body_limit() -> usize {
    1 << 20
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl AppConfig {
    /// Load `config/<env>.yaml`.
    pub fn load(env: &str) -> anyhow::Result<Self> {
        Self::load_from(format!("config/{}.yaml", env))
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("Failed to parse config yaml")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.gateway.body_limit_bytes > 0, "gateway.body_limit_bytes must be > 0");
        anyhow::ensure!(
            self.auth.token_bytes >= 16,
            "auth.token_bytes must be at least 16, got {}",
            self.auth.token_bytes
        );
        anyhow::ensure!(
            self.auth.session_timeout_secs > 0,
            "auth.session_timeout_secs must be > 0"
        );
        Ok(())
    }
}
