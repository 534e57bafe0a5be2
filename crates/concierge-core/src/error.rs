//! Tool-level error types shared by the gateway and its callers.
//!
//! A [`ToolError`] never crosses a process boundary as a raw error: the gateway
//! turns it into a [`ToolResponse`](crate::protocol::ToolResponse) with an explicit
//! status, and clients rebuild the error from that status.

use crate::protocol::ToolStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for tool operations
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors a tool gateway operation can produce
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// Referenced entity does not exist
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Parameters were rejected
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Operation name is not in the catalog
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    /// Gateway could not be reached
    #[error("gateway unreachable: {message}")]
    Unreachable { message: String },

    /// Gateway did not answer in time
    #[error("gateway timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Gateway answered with something that is not a tool response
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Storage or other internal failure
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ToolError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Transient transport failures; only these are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolError::Unreachable { .. } | ToolError::Timeout { .. })
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            ToolError::NotFound { .. } => "NOT_FOUND",
            ToolError::Validation { .. } => "VALIDATION_ERROR",
            ToolError::UnknownTool { .. } => "UNKNOWN_TOOL",
            ToolError::Unreachable { .. } => "GATEWAY_UNREACHABLE",
            ToolError::Timeout { .. } => "GATEWAY_TIMEOUT",
            ToolError::Protocol { .. } => "PROTOCOL_ERROR",
            ToolError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Wire status for this error
    pub fn status(&self) -> ToolStatus {
        match self {
            ToolError::NotFound { .. } => ToolStatus::NotFound,
            ToolError::Validation { .. } => ToolStatus::ValidationError,
            ToolError::UnknownTool { .. } => ToolStatus::UnknownTool,
            _ => ToolStatus::InternalError,
        }
    }

    /// Message body without the variant prefix, as carried in `ToolResponse::error`
    pub fn detail(&self) -> String {
        match self {
            ToolError::NotFound { resource } => format!("{resource} not found"),
            ToolError::Validation { message }
            | ToolError::Unreachable { message }
            | ToolError::Protocol { message }
            | ToolError::Internal { message } => message.clone(),
            ToolError::UnknownTool { name } => name.clone(),
            ToolError::Timeout { timeout_ms } => format!("no answer after {timeout_ms}ms"),
        }
    }

    /// Rebuild an error from a non-ok wire status
    pub fn from_status(status: ToolStatus, detail: Option<String>) -> Self {
        let detail = detail.unwrap_or_default();
        match status {
            ToolStatus::NotFound => {
                let resource = detail
                    .strip_suffix(" not found")
                    .map(str::to_string)
                    .unwrap_or(detail);
                ToolError::NotFound { resource }
            }
            ToolStatus::ValidationError => ToolError::Validation { message: detail },
            ToolStatus::UnknownTool => ToolError::UnknownTool { name: detail },
            ToolStatus::InternalError => ToolError::Internal { message: detail },
            ToolStatus::Ok => ToolError::protocol("ok status carried as an error"),
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::protocol(err.to_string())
    }
}

/// JSON error body returned by Concierge HTTP endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code, e.g. `NO_ROUTE`
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&ToolError> for ErrorResponse {
    fn from(err: &ToolError) -> Self {
        ErrorResponse::new(err.error_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ToolError::not_found("customer 42");
        assert_eq!(err.to_string(), "customer 42 not found");
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_error_retryable() {
        assert!(ToolError::unreachable("connection refused").is_retryable());
        assert!(ToolError::Timeout { timeout_ms: 500 }.is_retryable());
        assert!(!ToolError::validation("bad email").is_retryable());
        assert!(!ToolError::not_found("customer 1").is_retryable());
    }

    #[test]
    fn test_status_round_trip_keeps_detail() {
        let err = ToolError::not_found("customer 999");
        let rebuilt = ToolError::from_status(err.status(), Some(err.detail()));
        assert_eq!(rebuilt, err);

        let err = ToolError::validation("no valid fields to update");
        let rebuilt = ToolError::from_status(err.status(), Some(err.detail()));
        assert_eq!(rebuilt, err);
    }
}
