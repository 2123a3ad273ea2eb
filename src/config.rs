use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::server::PageLimits;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Page size used when a listing omits `limit`
    pub default_limit: usize,
    /// Largest page size a listing may request; larger values are clamped
    pub max_limit: usize,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            default_limit: 50,
            max_limit: 500,
            max_body_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Self::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        // Apply environment variable overrides
        if let Ok(host) = std::env::var("PCDB_HOST") {
            config.host = host;
        }
        env_override("PCDB_PORT", &mut config.port);
        env_override("PCDB_DEFAULT_LIMIT", &mut config.default_limit);
        env_override("PCDB_MAX_LIMIT", &mut config.max_limit);
        env_override("PCDB_MAX_BODY_BYTES", &mut config.max_body_bytes);

        Ok(config)
    }

    /// Config file path: `PCDB_CONFIG`, else ~/.config/peoplechain-db/config.yaml
    pub fn default_config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PCDB_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("peoplechain-db")
            .join("config.yaml")
    }

    /// Listing bounds; `max_limit` is raised to `default_limit` if lower.
    pub fn page_limits(&self) -> PageLimits {
        PageLimits::new(self.default_limit, self.max_limit)
    }

    /// Socket address string to bind, e.g. `0.0.0.0:8081`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_override<T: std::str::FromStr>(name: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!("Ignoring {}: cannot parse '{}'", name, raw),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {1}", .0.display())]
    ReadError(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{}': {1}", .0.display())]
    ParseError(PathBuf, #[source] serde_yaml::Error),
}
