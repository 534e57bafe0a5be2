//! Gateway error types

use concierge_core::{ConfigError, ToolError};
use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Domain-level failure of a tool operation
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GatewayError {
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Tool(err) => err.error_code(),
            GatewayError::Storage(_) | GatewayError::LockPoisoned => "STORAGE_ERROR",
            GatewayError::InvalidUrl(_) => "INVALID_URL",
            GatewayError::HttpClient(_) => "HTTP_CLIENT_ERROR",
            GatewayError::Server(_) => "SERVER_ERROR",
            GatewayError::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// Collapse into the wire-level taxonomy; storage failures become internal errors
impl From<GatewayError> for ToolError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Tool(err) => err,
            other => ToolError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_errors_pass_through() {
        let err: ToolError = GatewayError::from(ToolError::not_found("customer 3")).into();
        assert_eq!(err, ToolError::not_found("customer 3"));
    }

    #[test]
    fn test_storage_errors_become_internal() {
        let err: ToolError = GatewayError::LockPoisoned.into();
        assert!(matches!(err, ToolError::Internal { .. }));
        assert_eq!(GatewayError::LockPoisoned.error_code(), "STORAGE_ERROR");
    }
}
