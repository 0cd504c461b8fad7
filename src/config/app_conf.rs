use std::env;
use tracing::{debug, error, info};

use crate::config::{parse_env_or, ConfigError};

/// HTTP server and upload limits
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted size of a CSV upload, in bytes
    pub import_max_bytes: usize,
    /// Maximum number of data rows accepted in one CSV import
    pub import_max_rows: usize,
    /// Whether to answer CORS preflights for any origin
    pub cors_allow_any: bool,
}

impl AppConfig {
    /// Load application configuration from environment variables
    ///
    /// Expected environment variables:
    /// - APP_HOST: bind address (defaults to 127.0.0.1)
    /// - APP_PORT: bind port (defaults to 8080)
    /// - IMPORT_MAX_BYTES: CSV upload size cap (defaults to 5 MiB)
    /// - IMPORT_MAX_ROWS: CSV row cap (defaults to 1000)
    /// - CORS_ALLOW_ANY: permissive CORS (defaults to true)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading application configuration from environment variables");
        let defaults = AppConfig::default();

        let host = env::var("APP_HOST").unwrap_or(defaults.host);
        let port = parse_env_or("APP_PORT", defaults.port)?;
        let import_max_bytes = parse_env_or("IMPORT_MAX_BYTES", defaults.import_max_bytes)?;
        let import_max_rows = parse_env_or("IMPORT_MAX_ROWS", defaults.import_max_rows)?;
        let cors_allow_any = parse_env_or("CORS_ALLOW_ANY", defaults.cors_allow_any)?;
        debug!("App bind address: {}:{}", host, port);

        let config = AppConfig { host, port, import_max_bytes, import_max_rows, cors_allow_any };
        config.validate()?;
        info!("Application configuration loaded successfully");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            error!("APP_HOST is empty");
            return Err(ConfigError::ValidationError("APP_HOST cannot be empty".to_string()));
        }
        if self.import_max_bytes == 0 {
            error!("IMPORT_MAX_BYTES is 0");
            return Err(ConfigError::ValidationError("IMPORT_MAX_BYTES must be greater than 0".to_string()));
        }
        if self.import_max_rows == 0 {
            error!("IMPORT_MAX_ROWS is 0");
            return Err(ConfigError::ValidationError("IMPORT_MAX_ROWS must be greater than 0".to_string()));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            import_max_bytes: 5 * 1024 * 1024,
            import_max_rows: 1000,
            cors_allow_any: true,
        }
    }
}
