//! Gateway configuration.
//!
//! - `CONCIERGE_GATEWAY_ADDR` - bind address (default: 127.0.0.1:8000)
//! - `CONCIERGE_DB_PATH` - SQLite file (default: concierge.db)
//! - `CONCIERGE_LIST_LIMIT` - default `list_records` cap (default: 100)
//! - `CONCIERGE_SEED` - load the demo data set on startup (default: true)

use crate::store::DEFAULT_LIST_LIMIT;
use concierge_core::ConfigError;
use concierge_core::config::{get_env_bool, get_env_string, get_env_u32};
use std::path::PathBuf;

pub const DEFAULT_GATEWAY_ADDR: &str = "127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub list_limit: u32,
    pub seed: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_GATEWAY_ADDR.to_string(),
            db_path: PathBuf::from("concierge.db"),
            list_limit: DEFAULT_LIST_LIMIT,
            seed: true,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(addr) = get_env_string("CONCIERGE_GATEWAY_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(path) = get_env_string("CONCIERGE_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(limit) = get_env_u32("CONCIERGE_LIST_LIMIT")? {
            config.list_limit = limit;
        }
        if let Some(seed) = get_env_bool("CONCIERGE_SEED")? {
            config.seed = seed;
        }
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    #[must_use]
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: bool) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.list_limit == 0 {
            return Err(ConfigError::ValidationError(
                "list_limit must be greater than 0".to_string(),
            ));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "db_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.list_limit, 100);
    }

    #[test]
    fn test_zero_list_limit_rejected() {
        let config = GatewayConfig {
            list_limit: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
