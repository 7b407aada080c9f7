//! Configuration loading and management.
//!
//! Loads configuration from `./config.toml` (or `$HALLGATE_CONFIG_PATH`).
//! Environment variables override file values; file values override
//! defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HallgateConfig {
    /// HTTP server settings (`[server]`).
    pub server: ServerConfig,
    /// Decision cache settings (`[cache]`).
    pub cache: CacheConfig,
    /// Identity and admin-bypass settings (`[auth]`).
    pub auth: AuthConfig,
}

impl HallgateConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// Config file path: `$HALLGATE_CONFIG_PATH` or `./config.toml`. A
    /// missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_from_file() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                let config: HallgateConfig =
                    toml::from_str(&contents).context("failed to parse config TOML")?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(HallgateConfig::default())
            }
            Err(e) => Err(anyhow::anyhow!("failed to read config file: {e}")),
        }
    }

    /// Resolve config path using a custom env resolver (for testing).
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        match env("HALLGATE_CONFIG_PATH") {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from("config.toml"),
        }
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability.
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("HALLGATE_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = env("HALLGATE_MAX_BATCH_SIZE") {
            match v.parse() {
                Ok(n) => self.server.max_batch_size = n,
                Err(_) => tracing::warn!(
                    var = "HALLGATE_MAX_BATCH_SIZE",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("HALLGATE_CACHE_CAPACITY") {
            match v.parse() {
                Ok(n) => self.cache.capacity = n,
                Err(_) => tracing::warn!(
                    var = "HALLGATE_CACHE_CAPACITY",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("HALLGATE_CACHE_TTL_SECS") {
            match v.parse() {
                Ok(n) => self.cache.ttl_seconds = n,
                Err(_) => tracing::warn!(
                    var = "HALLGATE_CACHE_TTL_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("HALLGATE_ADMIN_PERMISSION") {
            self.auth.admin_permission = v;
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the API binds to.
    pub bind_addr: String,
    /// Maximum `entityIds` length accepted by the batch endpoint.
    pub max_batch_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8087".to_owned(),
            max_batch_size: 100,
        }
    }
}

/// Decision cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached decisions.
    pub capacity: usize,
    /// Entry time-to-live in seconds.
    pub ttl_seconds: u64,
}

impl CacheConfig {
    /// TTL as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl_seconds: 300,
        }
    }
}

/// Identity and admin-bypass settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Global permission key whose holders bypass rule evaluation.
    pub admin_permission: String,
    /// Header the upstream session layer uses for the user id.
    pub user_id_header: String,
    /// Header the upstream session layer uses for the user email.
    pub user_email_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_permission: "admin.full".to_owned(),
            user_id_header: "x-hall-user-id".to_owned(),
            user_email_header: "x-hall-user-email".to_owned(),
        }
    }
}
