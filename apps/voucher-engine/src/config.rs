use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use voucher_db::TxSettings;
use voucher_db::models::CodeType;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_port: u16,
    pub store: StoreBackend,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_port: 8080,
            store: StoreBackend::Postgres,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedemptionConfig {
    pub lock_timeout_ms: u64,
    pub statement_timeout_ms: u64,
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RedemptionConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2_000,
            statement_timeout_ms: 5_000,
            max_retries: 3,
            initial_backoff_ms: 25,
            max_backoff_ms: 500,
        }
    }
}

impl RedemptionConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn tx_settings(&self) -> TxSettings {
        TxSettings {
            lock_timeout: self.lock_timeout(),
            statement_timeout: Duration::from_millis(self.statement_timeout_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries).with_backoff(
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    pub short_length: usize,
    pub max_attempts: u32,
    pub qr_base_url: String,
    pub default_types: Vec<CodeType>,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            short_length: 8,
            max_attempts: 5,
            qr_base_url: "https://vouchers.example.com".to_string(),
            default_types: vec![CodeType::Short, CodeType::Qr],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NearbyConfig {
    /// Catalog service that knows provider locations. Lookup is off when unset.
    pub service_url: Option<String>,
    pub timeout_ms: u64,
    pub radius_meters: f64,
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            timeout_ms: 800,
            radius_meters: 5_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            file_name: "voucher-engine.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redemption: RedemptionConfig,
    pub codes: CodeConfig,
    pub nearby: NearbyConfig,
    pub logging: LoggingConfig,
}

/// Where `EngineConfig::load` found its settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(String),
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path),
            ConfigSource::Environment => f.write_str("environment"),
        }
    }
}

impl EngineConfig {
    /// Loads settings before logging exists; the caller logs the returned source.
    pub fn load() -> Result<(Self, ConfigSource)> {
        let mut config_paths = vec![
            "/etc/voucher-engine/engine.toml".to_string(),
            "./engine.toml".to_string(),
        ];
        if let Ok(path) = std::env::var("VOUCHER_ENGINE_CONFIG") {
            config_paths.insert(0, path);
        }
        Self::load_from(&config_paths, |key| std::env::var(key).ok())
    }

    pub fn load_from<F>(config_paths: &[String], lookup: F) -> Result<(Self, ConfigSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        for path in config_paths {
            if let Ok(contents) = fs::read_to_string(path) {
                let mut config = Self::from_toml(&contents)
                    .with_context(|| format!("Invalid config file {}", path))?;
                // Secrets usually live in the environment, not the file.
                if config.database.url.is_none() {
                    config.database.url = lookup("DATABASE_URL");
                }
                return Ok((config, ConfigSource::File(path.clone())));
            }
        }

        Ok((Self::from_lookup(lookup)?, ConfigSource::Environment))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Builds a config from `KEY=value` lookups, falling back to defaults for
    /// anything unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = parsed(&lookup, "LISTEN_PORT")? {
            config.server.listen_port = port;
        }
        if let Some(store) = lookup("VOUCHER_STORE") {
            config.server.store = store.parse().map_err(anyhow::Error::msg)?;
        }

        config.database.url = lookup("DATABASE_URL");
        if let Some(max) = parsed(&lookup, "DATABASE_MAX_CONNECTIONS")? {
            config.database.max_connections = max;
        }

        if let Some(ms) = parsed(&lookup, "LOCK_TIMEOUT_MS")? {
            config.redemption.lock_timeout_ms = ms;
        }
        if let Some(ms) = parsed(&lookup, "STATEMENT_TIMEOUT_MS")? {
            config.redemption.statement_timeout_ms = ms;
        }
        if let Some(retries) = parsed(&lookup, "REDEEM_MAX_RETRIES")? {
            config.redemption.max_retries = retries;
        }
        if let Some(ms) = parsed(&lookup, "REDEEM_INITIAL_BACKOFF_MS")? {
            config.redemption.initial_backoff_ms = ms;
        }
        if let Some(ms) = parsed(&lookup, "REDEEM_MAX_BACKOFF_MS")? {
            config.redemption.max_backoff_ms = ms;
        }

        if let Some(len) = parsed(&lookup, "SHORT_CODE_LENGTH")? {
            config.codes.short_length = len;
        }
        if let Some(attempts) = parsed(&lookup, "CODE_MAX_ATTEMPTS")? {
            config.codes.max_attempts = attempts;
        }
        if let Some(url) = lookup("QR_BASE_URL") {
            config.codes.qr_base_url = url;
        }
        if let Some(types) = lookup("DEFAULT_CODE_TYPES") {
            config.codes.default_types = types
                .split(',')
                .filter(|t| !t.trim().is_empty())
                .map(str::parse)
                .collect::<Result<_, _>>()
                .map_err(anyhow::Error::msg)?;
        }

        config.nearby.service_url = lookup("NEARBY_SERVICE_URL");
        if let Some(ms) = parsed(&lookup, "NEARBY_TIMEOUT_MS")? {
            config.nearby.timeout_ms = ms;
        }
        if let Some(radius) = parsed(&lookup, "NEARBY_RADIUS_METERS")? {
            config.nearby.radius_meters = radius;
        }

        if let Some(dir) = lookup("LOG_DIR") {
            config.logging.directory = dir;
        }

        Ok(config)
    }
}

fn parsed<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        None => Ok(None),
    }
}
