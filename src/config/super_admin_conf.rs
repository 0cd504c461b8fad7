use std::env;
use serde::{Serialize, Deserialize};
use crate::config::ConfigError;

/// Credentials of the super admin seeded at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperAdminConfig {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SuperAdminConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(SuperAdminConfig {
            name: env::var("SUPER_ADMIN_NAME").unwrap_or_else(|_| "Super Admin".to_string()),
            email: env::var("SUPER_ADMIN_EMAIL").map_err(|_| ConfigError::EnvVarNotFound("SUPER_ADMIN_EMAIL".to_string()))?,
            password: env::var("SUPER_ADMIN_PASSWORD").map_err(|_| ConfigError::EnvVarNotFound("SUPER_ADMIN_PASSWORD".to_string()))?,
        })
    }
}
