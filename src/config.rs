use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sanitize::sanitize;

/// Environment variable overriding the built-in default endpoint.
pub const DEFAULT_ENDPOINT_ENV: &str = "SPEEDSCALE_API_BASE_URL";

/// Minimum artificial suspension for simulated calls.
pub const MIN_DEMO_DELAY_MS: u64 = 600;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Fallback endpoint used whenever user input is blank or unsafe.
    #[serde(default = "default_endpoint")]
    pub default_endpoint: String,
    /// Base that root-relative endpoints such as `/gateway` resolve against.
    #[serde(default = "default_origin")]
    pub origin: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_endpoint: default_endpoint(),
            origin: default_origin(),
        }
    }
}

fn default_endpoint() -> String {
    std::env::var(DEFAULT_ENDPOINT_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "http://localhost:8000".to_string())
}
fn default_origin() -> String {
    "http://localhost".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/speedscale.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,
    #[serde(default = "default_trending_interval_ms")]
    pub trending_interval_ms: u64,
    #[serde(default = "default_trending_limit")]
    pub trending_limit: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            health_interval_ms: default_health_interval_ms(),
            health_timeout_ms: default_health_timeout_ms(),
            trending_interval_ms: default_trending_interval_ms(),
            trending_limit: default_trending_limit(),
        }
    }
}

impl PollingConfig {
    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }
    pub fn trending_interval(&self) -> Duration {
        Duration::from_millis(self.trending_interval_ms)
    }
}

fn default_health_interval_ms() -> u64 {
    5_000
}
fn default_health_timeout_ms() -> u64 {
    5_000
}
fn default_trending_interval_ms() -> u64 {
    10_000
}
fn default_trending_limit() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct DemoConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_search_delay_ms")]
    pub search_delay_ms: u64,
    #[serde(default = "default_product_delay_ms")]
    pub product_delay_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            search_delay_ms: default_search_delay_ms(),
            product_delay_ms: default_product_delay_ms(),
        }
    }
}

fn default_search_delay_ms() -> u64 {
    800
}
fn default_product_delay_ms() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// All defaults. Used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// Load and validate a config file. A missing file yields [`Config::minimal`].
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        let config = Config::minimal();
        validate(&config)?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate client
    let default = &config.client.default_endpoint;
    if let Some(reason) = sanitize(Some(default), default).reason {
        anyhow::bail!(
            "client.default_endpoint '{}' is not a usable endpoint: {}",
            config.client.default_endpoint,
            reason.warning()
        );
    }
    match reqwest::Url::parse(&config.client.origin) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => anyhow::bail!(
            "client.origin must be an absolute http(s) URL, got '{}'",
            config.client.origin
        ),
    }

    // Validate polling
    if config.polling.health_interval_ms == 0 || config.polling.trending_interval_ms == 0 {
        anyhow::bail!("polling intervals must be > 0");
    }
    if config.polling.health_timeout_ms == 0 {
        anyhow::bail!("polling.health_timeout_ms must be > 0");
    }
    if config.polling.trending_limit == 0 {
        anyhow::bail!("polling.trending_limit must be >= 1");
    }

    // Validate demo
    if config.demo.search_delay_ms < MIN_DEMO_DELAY_MS
        || config.demo.product_delay_ms < MIN_DEMO_DELAY_MS
    {
        anyhow::bail!("demo delays must be >= {} ms", MIN_DEMO_DELAY_MS);
    }

    // Validate logging
    match config.logging.level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        other => anyhow::bail!(
            "Unknown logging.level: '{}'. Must be trace, debug, info, warn, or error.",
            other
        ),
    }
    match config.logging.format.as_str() {
        "text" | "json" => {}
        other => anyhow::bail!("Unknown logging.format: '{}'. Must be text or json.", other),
    }

    Ok(())
}
