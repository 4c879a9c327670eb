//! Configuration management
//!
//! Loads and validates settings from environment variables or a TOML
//! file. The environment variable names match what operators already
//! export for the platform: `FUSEKI_ENDPOINT` for the triple store and
//! `GEMINI_API_KEY` for the generative API.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP API server configuration
    pub server: ServerConfig,

    /// Triple store (Fuseki) configuration
    pub store: StoreConfig,

    /// Gemini generative API configuration
    pub gemini: GeminiConfig,

    /// DBpedia Lookup configuration
    pub dbpedia: DbpediaConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the API binds to
    pub bind_address: SocketAddr,

    /// Enable permissive CORS (the frontend runs on another origin)
    pub enable_cors: bool,

    /// Enable per-request tracing
    pub enable_request_logging: bool,
}

/// Triple store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Fuseki dataset base URL (`<base>/query`, `<base>/update`, `<base>/data`)
    pub endpoint: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Gemini API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; when absent the search pipeline stays on the
    /// deterministic fallbacks
    pub api_key: Option<String>,

    /// Model name
    pub model: String,

    /// API base URL
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// DBpedia Lookup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbpediaConfig {
    /// Keyword search endpoint
    pub lookup_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum hits requested per lookup
    pub max_hits: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let bind_address = std::env::var("EDUGRAPH_BIND")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_bind);

        let endpoint = std::env::var("FUSEKI_ENDPOINT")
            .unwrap_or_else(|_| String::from("http://localhost:3030/education"));

        let request_timeout_secs = std::env::var("FUSEKI_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());

        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| String::from("gemini-2.0-flash"));

        let gemini_endpoint = std::env::var("GEMINI_ENDPOINT")
            .unwrap_or_else(|_| String::from("https://generativelanguage.googleapis.com/v1beta"));

        let gemini_timeout_secs = std::env::var("GEMINI_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let lookup_url = std::env::var("DBPEDIA_LOOKUP_URL")
            .unwrap_or_else(|_| String::from("http://lookup.dbpedia.org/api/search/KeywordSearch"));

        let log_level = std::env::var("EDUGRAPH_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let log_format = std::env::var("EDUGRAPH_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            server: ServerConfig {
                bind_address,
                enable_cors: true,
                enable_request_logging: true,
            },
            store: StoreConfig {
                endpoint,
                request_timeout_secs,
            },
            gemini: GeminiConfig {
                api_key: gemini_api_key,
                model: gemini_model,
                endpoint: gemini_endpoint,
                timeout_secs: gemini_timeout_secs,
            },
            dbpedia: DbpediaConfig {
                lookup_url,
                timeout_secs: 10,
                max_hits: 10,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.store.endpoint.trim().is_empty() {
            anyhow::bail!("store.endpoint must not be empty");
        }

        if !self.store.endpoint.starts_with("http://")
            && !self.store.endpoint.starts_with("https://")
        {
            anyhow::bail!("store.endpoint must be an http(s) URL");
        }

        if self.store.request_timeout_secs == 0 {
            anyhow::bail!("store.request_timeout_secs must be greater than 0");
        }

        if self.gemini.model.trim().is_empty() {
            anyhow::bail!("gemini.model must not be empty");
        }

        Ok(())
    }

    /// Get the store request timeout as Duration.
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.request_timeout_secs)
    }
}

fn default_bind() -> SocketAddr {
    "127.0.0.1:5000".parse().expect("static address")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: default_bind(),
                enable_cors: true,
                enable_request_logging: true,
            },
            store: StoreConfig {
                endpoint: String::from("http://localhost:3030/education"),
                request_timeout_secs: 30,
            },
            gemini: GeminiConfig {
                api_key: None,
                model: String::from("gemini-2.0-flash"),
                endpoint: String::from("https://generativelanguage.googleapis.com/v1beta"),
                timeout_secs: 60,
            },
            dbpedia: DbpediaConfig {
                lookup_url: String::from("http://lookup.dbpedia.org/api/search/KeywordSearch"),
                timeout_secs: 10,
                max_hits: 10,
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_endpoint_scheme() {
        let mut config = Config::default();
        config.store.endpoint = String::from("localhost:3030/education");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.store.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_store_timeout_conversion() {
        let config = Config::default();
        assert_eq!(config.store_timeout(), Duration::from_secs(30));
    }
}
