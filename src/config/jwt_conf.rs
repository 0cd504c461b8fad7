use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

const MIN_SECRET_LEN: usize = 32;

/// JWT configuration structure
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// JWT secret key for signing tokens
    pub jwt_secret: String,
    /// Access token expiration time in minutes
    pub access_token_expiration: i64,
    /// Refresh token expiration time in minutes
    pub refresh_token_expiration: i64,
    /// JWT issuer (optional)
    pub jwt_issuer: Option<String>,
    /// JWT audience (optional)
    pub jwt_audience: Option<String>,
}

impl JwtConfig {
    /// Load JWT configuration from environment variables
    ///
    /// Expected environment variables:
    /// - JWT_SECRET: Secret key for signing JWT tokens (required, at least 32 chars)
    /// - JWT_ACCESS_TOKEN_EXPIRY: Access token expiration in minutes (defaults to 15)
    /// - JWT_REFRESH_TOKEN_EXPIRY: Refresh token expiration in minutes (defaults to 10080 = 1 week)
    /// - JWT_ISSUER: JWT issuer (optional)
    /// - JWT_AUDIENCE: JWT audience (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_prefixed_env("")
    }

    /// Same as `from_env` but reads `TEST_`-prefixed variables
    pub fn from_test_env() -> Result<Self, ConfigError> {
        Self::from_prefixed_env("TEST_")
    }

    fn from_prefixed_env(prefix: &str) -> Result<Self, ConfigError> {
        info!("Loading JWT configuration from {}JWT_* environment variables", prefix);
        let var = |name: &str| format!("{}{}", prefix, name);

        let jwt_secret = env::var(var("JWT_SECRET"))
            .map_err(|_| {
                error!("{} environment variable not found", var("JWT_SECRET"));
                ConfigError::EnvVarNotFound(var("JWT_SECRET"))
            })?;
        debug!("JWT secret loaded (length: {} chars)", jwt_secret.len());

        let access_token_expiration = env::var(var("JWT_ACCESS_TOKEN_EXPIRY"))
            .unwrap_or_else(|_| {
                warn!("{} not set, using default: 15 minutes", var("JWT_ACCESS_TOKEN_EXPIRY"));
                "15".to_string()
            })
            .parse::<i64>()
            .map_err(|e| {
                error!("Invalid {} value: {}", var("JWT_ACCESS_TOKEN_EXPIRY"), e);
                ConfigError::InvalidValue(format!("{}: {}", var("JWT_ACCESS_TOKEN_EXPIRY"), e))
            })?;

        let refresh_token_expiration = env::var(var("JWT_REFRESH_TOKEN_EXPIRY"))
            .unwrap_or_else(|_| {
                warn!("{} not set, using default: 10080 minutes (1 week)", var("JWT_REFRESH_TOKEN_EXPIRY"));
                "10080".to_string()
            })
            .parse::<i64>()
            .map_err(|e| {
                error!("Invalid {} value: {}", var("JWT_REFRESH_TOKEN_EXPIRY"), e);
                ConfigError::InvalidValue(format!("{}: {}", var("JWT_REFRESH_TOKEN_EXPIRY"), e))
            })?;

        let config = JwtConfig {
            jwt_secret,
            access_token_expiration,
            refresh_token_expiration,
            jwt_issuer: env::var(var("JWT_ISSUER")).ok(),
            jwt_audience: env::var(var("JWT_AUDIENCE")).ok(),
        };

        config.validate()?;
        info!("JWT configuration loaded successfully");
        Ok(config)
    }

    /// Validate the JWT configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        debug!("Validating JWT configuration");

        if self.jwt_secret.len() < MIN_SECRET_LEN {
            error!("JWT secret is too short (minimum {} characters required)", MIN_SECRET_LEN);
            return Err(ConfigError::ValidationError(format!("JWT secret must be at least {} characters long", MIN_SECRET_LEN)));
        }

        if self.access_token_expiration <= 0 {
            error!("Access token expiration must be greater than 0");
            return Err(ConfigError::ValidationError("Access token expiration must be greater than 0".to_string()));
        }

        if self.refresh_token_expiration <= 0 {
            error!("Refresh token expiration must be greater than 0");
            return Err(ConfigError::ValidationError("Refresh token expiration must be greater than 0".to_string()));
        }

        if self.access_token_expiration >= self.refresh_token_expiration {
            warn!("Access token expiration is greater than or equal to refresh token expiration");
        }

        Ok(())
    }
}

/// Create JWT configuration for testing with default values
impl Default for JwtConfig {
    fn default() -> Self {
        JwtConfig {
            jwt_secret: "test_secret_key_for_jwt_testing_should_be_long_enough_for_security_purposes".to_string(),
            access_token_expiration: 15,
            refresh_token_expiration: 10080, // 1 week
            jwt_issuer: Some("school-backend-test".to_string()),
            jwt_audience: Some("school-backend-users".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(JwtConfig::default().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = JwtConfig::default();
        config.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_expiry_rejected() {
        let mut config = JwtConfig::default();
        config.access_token_expiration = 0;
        assert!(config.validate().is_err());

        let mut config = JwtConfig::default();
        config.refresh_token_expiration = -5;
        assert!(config.validate().is_err());
    }
}
