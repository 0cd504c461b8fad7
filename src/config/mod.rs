pub mod app_conf;
pub mod jwt_conf;
pub mod mongo_conf;
pub mod super_admin_conf;

pub use app_conf::AppConfig;
pub use jwt_conf::JwtConfig;
pub use mongo_conf::MongoConfig;
pub use super_admin_conf::SuperAdminConfig;

/// Common configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Reads an optional env var and parses it, falling back to `default` when unset.
pub(crate) fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(format!("Invalid {} value: {}", key, raw))),
        Err(_) => {
            tracing::warn!("{} not set, using default", key);
            Ok(default)
        }
    }
}
