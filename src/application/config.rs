//! Application configuration loaded from environment variables.

use std::env;
use thiserror::Error;

/// Which document store adapter to run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// CouchDB over HTTP.
    CouchDb { url: String, database: String },
    /// In-process store, mainly for local development.
    Memory,
}

/// Application configuration loaded from environment variables.
#[derive(Debug)]
pub struct AppConfig {
    /// HTTP server address
    pub addr: String,
    /// Document store selection
    pub store: StoreConfig,
    /// statsd sink address (None if disabled)
    pub statsd_addr: Option<String>,
    /// Whether the tracing-backed metric sink is enabled
    pub metrics_log: bool,
    /// Page size used by all list endpoints
    pub page_size: usize,
}

/// Error type for configuration validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `INSULTD_ADDR`: Server address (default: "127.0.0.1:8080")
    /// - `INSULTD_STORE`: Store adapter, "couchdb" or "memory" (default: "couchdb")
    /// - `INSULTD_COUCHDB_URL`: CouchDB base URL (default: "http://localhost:5984")
    /// - `INSULTD_COUCHDB_DATABASE`: Database name (default: "insults")
    /// - `INSULTD_STATSD_ADDR`: statsd host:port (if set, enables the statsd sink)
    /// - `INSULTD_METRICS_LOG`: Enable the log-backed metric sink (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("INSULTD_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let store = match env::var("INSULTD_STORE")
            .unwrap_or_else(|_| "couchdb".to_string())
            .to_lowercase()
            .as_str()
        {
            "couchdb" => StoreConfig::CouchDb {
                url: env::var("INSULTD_COUCHDB_URL")
                    .unwrap_or_else(|_| "http://localhost:5984".to_string()),
                database: env::var("INSULTD_COUCHDB_DATABASE")
                    .unwrap_or_else(|_| "insults".to_string()),
            },
            "memory" => StoreConfig::Memory,
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "INSULTD_STORE must be \"couchdb\" or \"memory\", got \"{}\"",
                    other
                )))
            }
        };

        let statsd_addr = env::var("INSULTD_STATSD_ADDR").ok();
        if let Some(ref addr) = statsd_addr {
            if addr.split(':').count() != 2 {
                return Err(ConfigError::InvalidValue(
                    "INSULTD_STATSD_ADDR must be host:port".to_string(),
                ));
            }
        }

        let metrics_log = env::var("INSULTD_METRICS_LOG")
            .map(|s| s != "0" && s.to_lowercase() != "false")
            .unwrap_or(true);

        Ok(Self {
            addr,
            store,
            statsd_addr,
            metrics_log,
            page_size: 50,
        })
    }

    /// Log the effective configuration.
    pub fn log(&self) {
        match &self.store {
            StoreConfig::CouchDb { url, database } => {
                tracing::info!(%url, %database, "using CouchDB store")
            }
            StoreConfig::Memory => tracing::info!("using in-memory store"),
        }
        match &self.statsd_addr {
            Some(addr) => tracing::info!(%addr, "statsd sink enabled"),
            None => tracing::info!("statsd sink disabled"),
        }
        tracing::info!(enabled = self.metrics_log, "log metric sink");
        tracing::info!(page_size = self.page_size, addr = %self.addr, "server configuration");
    }
}
