//! Specialist process configuration.
//!
//! - `CONCIERGE_GATEWAY_URL` - tool gateway base URL (default: http://127.0.0.1:8000)
//! - `CONCIERGE_GATEWAY_TIMEOUT_MS` - per-call gateway timeout (default: 5000)
//! - `CONCIERGE_GATEWAY_RETRIES` - extra attempts for read-only calls (default: 1)
//! - `CONCIERGE_DATA_ADDR` / `CONCIERGE_TICKETING_ADDR` - bind addresses
//!   (defaults: 127.0.0.1:9300 / 127.0.0.1:9301)

use crate::data::DataSpecialist;
use crate::error::AgentResult;
use crate::specialist::{RetryPolicy, Specialist, verify_gateway};
use crate::ticketing::TicketingSpecialist;
use concierge_core::ConfigError;
use concierge_core::config::{get_env_duration_ms, get_env_string, get_env_u32};
use concierge_gateway::{GatewayClient, ToolGateway};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Which specialist a process hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialistKind {
    Data,
    Ticketing,
}

impl SpecialistKind {
    pub fn default_addr(&self) -> &'static str {
        match self {
            SpecialistKind::Data => "127.0.0.1:9300",
            SpecialistKind::Ticketing => "127.0.0.1:9301",
        }
    }

    /// Gateway tools this specialist issues
    pub fn required_tools(&self) -> &'static [&'static str] {
        match self {
            SpecialistKind::Data => &["fetch_record", "list_records", "update_record", "fetch_history"],
            SpecialistKind::Ticketing => &["create_ticket", "fetch_record", "fetch_history"],
        }
    }

    fn addr_var(&self) -> &'static str {
        match self {
            SpecialistKind::Data => "CONCIERGE_DATA_ADDR",
            SpecialistKind::Ticketing => "CONCIERGE_TICKETING_ADDR",
        }
    }
}

impl fmt::Display for SpecialistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SpecialistKind::Data => "data",
            SpecialistKind::Ticketing => "ticketing",
        })
    }
}

impl FromStr for SpecialistKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "data" => Ok(SpecialistKind::Data),
            "ticketing" | "support" => Ok(SpecialistKind::Ticketing),
            other => Err(format!(
                "unknown specialist kind '{other}': expected data or ticketing"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialistConfig {
    pub kind: SpecialistKind,
    pub bind_addr: String,
    /// URL advertised on the agent card; defaults to `http://{bind_addr}`
    pub public_url: Option<String>,
    pub gateway_url: String,
    pub gateway_timeout: Duration,
    pub gateway_retries: u32,
}

impl SpecialistConfig {
    pub fn new(kind: SpecialistKind) -> Self {
        Self {
            kind,
            bind_addr: kind.default_addr().to_string(),
            public_url: None,
            gateway_url: "http://127.0.0.1:8000".to_string(),
            gateway_timeout: Duration::from_millis(5000),
            gateway_retries: 1,
        }
    }

    pub fn from_env(kind: SpecialistKind) -> Result<Self, ConfigError> {
        let mut config = Self::new(kind);
        if let Some(addr) = get_env_string(kind.addr_var()) {
            config.bind_addr = addr;
        }
        if let Some(url) = get_env_string("CONCIERGE_GATEWAY_URL") {
            config.gateway_url = url;
        }
        if let Some(timeout) = get_env_duration_ms("CONCIERGE_GATEWAY_TIMEOUT_MS")? {
            config.gateway_timeout = timeout;
        }
        if let Some(retries) = get_env_u32("CONCIERGE_GATEWAY_RETRIES")? {
            config.gateway_retries = retries;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "gateway_timeout must be greater than 0".to_string(),
            ));
        }
        if self.gateway_retries > 5 {
            return Err(ConfigError::ValidationError(
                "gateway_retries must be <= 5".to_string(),
            ));
        }
        Ok(())
    }

    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind_addr))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.gateway_retries,
            ..RetryPolicy::default()
        }
    }

    /// Build the configured specialist, talking to the gateway over HTTP
    pub fn build(&self) -> AgentResult<Arc<dyn Specialist>> {
        let gateway = Arc::new(GatewayClient::with_timeout(
            &self.gateway_url,
            self.gateway_timeout,
        )?);
        Ok(self.assemble(gateway))
    }

    /// Like [`build`](Self::build), but first fetches the gateway's tool
    /// catalog and refuses to start if a tool the specialist needs is absent
    pub async fn connect(&self) -> AgentResult<Arc<dyn Specialist>> {
        let gateway = Arc::new(GatewayClient::with_timeout(
            &self.gateway_url,
            self.gateway_timeout,
        )?);
        verify_gateway(gateway.as_ref(), &self.gateway_url, self.kind.required_tools()).await?;
        info!(
            kind = %self.kind,
            gateway = %self.gateway_url,
            "Gateway offers every required tool"
        );
        Ok(self.assemble(gateway))
    }

    fn assemble(&self, gateway: Arc<dyn ToolGateway>) -> Arc<dyn Specialist> {
        match self.kind {
            SpecialistKind::Data => Arc::new(
                DataSpecialist::new(gateway)
                    .with_retry(self.retry_policy())
                    .with_url(self.public_url()),
            ),
            SpecialistKind::Ticketing => Arc::new(
                TicketingSpecialist::new(gateway)
                    .with_retry(self.retry_policy())
                    .with_url(self.public_url()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("data", SpecialistKind::Data)]
    #[case("Ticketing", SpecialistKind::Ticketing)]
    #[case("support", SpecialistKind::Ticketing)]
    fn test_kind_parsing(#[case] raw: &str, #[case] expected: SpecialistKind) {
        assert_eq!(raw.parse::<SpecialistKind>().unwrap(), expected);
    }

    #[test]
    fn test_defaults() {
        let config = SpecialistConfig::new(SpecialistKind::Ticketing);
        assert_eq!(config.bind_addr, "127.0.0.1:9301");
        assert_eq!(config.public_url(), "http://127.0.0.1:9301");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_build_advertises_public_url() {
        let mut config = SpecialistConfig::new(SpecialistKind::Data);
        config.public_url = Some("http://data.internal:9300".to_string());
        let specialist = config.build().unwrap();
        let card = specialist.card();
        assert_eq!(card.url, "http://data.internal:9300");
        assert_eq!(card.capabilities[0].as_str(), "customer");
    }

    #[test]
    fn test_required_tools_are_in_catalog() {
        for kind in [SpecialistKind::Data, SpecialistKind::Ticketing] {
            for tool in kind.required_tools() {
                assert!(concierge_core::ToolCall::NAMES.contains(tool), "{tool}");
            }
        }
    }

    #[tokio::test]
    async fn test_connect_fails_without_gateway() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = SpecialistConfig::new(SpecialistKind::Ticketing);
        config.gateway_url = format!("http://{addr}");
        let err = config.connect().await.err().unwrap();
        assert_eq!(err.error_code(), "TOOL_DISCOVERY_FAILED");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = SpecialistConfig::new(SpecialistKind::Data);
        config.gateway_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
