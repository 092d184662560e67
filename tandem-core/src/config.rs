use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub room: RoomConfig,
    pub translation: TranslationConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// How long an empty room survives before reclamation. Joins inside the
    /// window cancel it.
    pub reclaim_grace_secs: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            reclaim_grace_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Per-tier bound; a hung provider must never block the fallback chain
    pub timeout_secs: u64,
    /// Primary tier runs only when a key is configured
    pub deepl_api_key: Option<String>,
    pub deepl_base_url: String,
    pub libretranslate_base_url: String,
    pub mymemory_base_url: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            deepl_api_key: None,
            deepl_base_url: "https://api-free.deepl.com".to_string(),
            libretranslate_base_url: "https://libretranslate.de".to_string(),
            mymemory_base_url: "https://api.mymemory.translated.net".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// SFU sidecar base URL
    pub base_url: String,
    pub timeout_secs: u64,
    pub health_interval_secs: u64,
    /// Consecutive failed health checks before the worker counts as dead
    pub health_failure_threshold: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:4443".to_string(),
            timeout_secs: 10,
            health_interval_secs: 5,
            health_failure_threshold: 3,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // Override with environment variables (TANDEM_SERVER_HOST, etc.)
        builder = builder.add_source(
            Environment::with_prefix("TANDEM")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.http_port == 0 {
            anyhow::bail!("server.http_port must not be 0");
        }
        if self.logging.format != "json" && self.logging.format != "pretty" {
            anyhow::bail!(
                "logging.format must be \"json\" or \"pretty\", got {:?}",
                self.logging.format
            );
        }
        if self.room.reclaim_grace_secs == 0 {
            anyhow::bail!("room.reclaim_grace_secs must be at least 1");
        }
        if self.relay.base_url.is_empty() {
            anyhow::bail!("relay.base_url must be set");
        }
        if self.translation.timeout_secs == 0 {
            anyhow::bail!("translation.timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Get HTTP address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }
}
