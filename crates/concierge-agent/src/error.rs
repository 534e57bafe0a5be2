//! Agent error types

use concierge_core::ConfigError;
use concierge_gateway::GatewayError;
use thiserror::Error;

/// Result type for agent transport and hosting operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors raised while reaching or hosting a specialist.
///
/// A specialist never returns these from `perform`; they only describe the
/// transport around it.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent unreachable at {address}: {message}")]
    Unreachable { address: String, message: String },

    #[error("Agent timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Agent not found: {address}")]
    NotFound { address: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Invalid agent URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Tool discovery failed at {address}: {message}")]
    ToolDiscovery { address: String, message: String },

    #[error("Gateway at {address} is missing required tools: {}", missing.join(", "))]
    MissingTools {
        address: String,
        missing: Vec<String>,
    },
}

impl AgentError {
    pub fn unreachable(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Transport-level failures where the request may never have arrived
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::Unreachable { .. } | AgentError::Timeout { .. }
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AgentError::Unreachable { .. } => "AGENT_UNREACHABLE",
            AgentError::Timeout { .. } => "AGENT_TIMEOUT",
            AgentError::NotFound { .. } => "AGENT_NOT_FOUND",
            AgentError::Protocol { .. } => "PROTOCOL_ERROR",
            AgentError::InvalidUrl(_) => "INVALID_URL",
            AgentError::HttpClient(_) => "HTTP_CLIENT_ERROR",
            AgentError::Server(_) => "SERVER_ERROR",
            AgentError::Config(_) => "CONFIG_ERROR",
            AgentError::Gateway(err) => err.error_code(),
            AgentError::ToolDiscovery { .. } => "TOOL_DISCOVERY_FAILED",
            AgentError::MissingTools { .. } => "GATEWAY_TOOLS_MISSING",
        }
    }
}
