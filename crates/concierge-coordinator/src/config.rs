//! Coordinator configuration.
//!
//! - `CONCIERGE_COORDINATOR_ADDR` - bind address (default: 127.0.0.1:9400)
//! - `CONCIERGE_SPECIALISTS` - comma-separated specialist base URLs to discover
//!   at startup (default: the data and ticketing default addresses)
//! - `CONCIERGE_STEP_TIMEOUT_MS` - per-step dispatch timeout (default: 10000)
//! - `CONCIERGE_MAX_RETRIES` - extra attempts for idempotent steps (default: 1)
//! - `CONCIERGE_MAX_CONCURRENT_STEPS` - in-flight specialist calls per request (default: 8)

use concierge_core::ConfigError;
use concierge_core::config::{get_env_duration_ms, get_env_string, get_env_u32, get_env_u64};
use std::time::Duration;

pub const DEFAULT_COORDINATOR_ADDR: &str = "127.0.0.1:9400";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub bind_addr: String,
    pub specialists: Vec<String>,
    pub step_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub max_concurrent_steps: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_COORDINATOR_ADDR.to_string(),
            specialists: vec![
                "http://127.0.0.1:9300".to_string(),
                "http://127.0.0.1:9301".to_string(),
            ],
            step_timeout: Duration::from_millis(10_000),
            max_retries: 1,
            retry_backoff: Duration::from_millis(100),
            max_concurrent_steps: 8,
        }
    }
}

impl CoordinatorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(addr) = get_env_string("CONCIERGE_COORDINATOR_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(list) = get_env_string("CONCIERGE_SPECIALISTS") {
            config.specialists = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(timeout) = get_env_duration_ms("CONCIERGE_STEP_TIMEOUT_MS")? {
            config.step_timeout = timeout;
        }
        if let Some(retries) = get_env_u32("CONCIERGE_MAX_RETRIES")? {
            config.max_retries = retries;
        }
        if let Some(limit) = get_env_u64("CONCIERGE_MAX_CONCURRENT_STEPS")? {
            config.max_concurrent_steps =
                usize::try_from(limit).map_err(|_| ConfigError::InvalidEnvVar {
                    key: "CONCIERGE_MAX_CONCURRENT_STEPS".to_string(),
                    message: "value does not fit in usize".to_string(),
                })?;
        }
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    #[must_use]
    pub fn with_specialists(mut self, specialists: Vec<String>) -> Self {
        self.specialists = specialists;
        self
    }

    #[must_use]
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_max_concurrent_steps(mut self, limit: usize) -> Self {
        self.max_concurrent_steps = limit;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "step_timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrent_steps == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrent_steps must be at least 1".to_string(),
            ));
        }
        if self.max_retries > 5 {
            return Err(ConfigError::ValidationError(
                "max_retries must be <= 5".to_string(),
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
        let config = CoordinatorConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:9400");
        assert_eq!(config.step_timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.max_concurrent_steps, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env() {
        unsafe {
            std::env::set_var("CONCIERGE_STEP_TIMEOUT_MS", "2500");
            std::env::set_var("CONCIERGE_MAX_CONCURRENT_STEPS", "3");
            std::env::set_var(
                "CONCIERGE_SPECIALISTS",
                "http://a:1, http://b:2,,",
            );
        }
        let config = CoordinatorConfig::from_env().unwrap();
        unsafe {
            std::env::remove_var("CONCIERGE_STEP_TIMEOUT_MS");
            std::env::remove_var("CONCIERGE_MAX_CONCURRENT_STEPS");
            std::env::remove_var("CONCIERGE_SPECIALISTS");
        }
        assert_eq!(config.step_timeout, Duration::from_millis(2500));
        assert_eq!(config.max_concurrent_steps, 3);
        assert_eq!(config.specialists, vec!["http://a:1", "http://b:2"]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(
            CoordinatorConfig::default()
                .with_step_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            CoordinatorConfig::default()
                .with_max_concurrent_steps(0)
                .validate()
                .is_err()
        );
        assert!(CoordinatorConfig::default().with_max_retries(9).validate().is_err());
    }
}
