//! Coordinator error types.
//!
//! Only classification- and routing-level problems abort a request. Everything
//! that goes wrong inside a specialist call is reported as a step result instead.

use concierge_agent::AgentError;
use concierge_core::{ConfigError, ErrorResponse, IntentKind};
use thiserror::Error;

/// Result type for coordinator operations
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Classifier found no intent
    #[error("Could not understand the request, please rephrase")]
    Unclassified { text: String },

    /// No registered specialist serves the capability
    #[error("No specialist serves capability '{capability}' needed for {intent}")]
    NoRoute {
        capability: String,
        intent: IntentKind,
    },

    /// Several specialists match equally well
    #[error("Ambiguous route for capability '{capability}': {}", .candidates.join(", "))]
    AmbiguousRoute {
        capability: String,
        candidates: Vec<String>,
    },

    /// Plan violates its structural invariants
    #[error("Invalid dispatch plan: {reason}")]
    InvalidPlan { reason: String },

    /// Classifier backend failed
    #[error("Classifier failed: {message}")]
    Classifier { message: String },

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    /// Error body returned by a remote coordinator
    #[error("Coordinator returned {status} {code}: {message}")]
    Remote {
        status: u16,
        code: String,
        message: String,
    },
}

impl CoordinatorError {
    pub fn invalid_plan(reason: impl Into<String>) -> Self {
        Self::InvalidPlan {
            reason: reason.into(),
        }
    }

    pub fn classifier(message: impl Into<String>) -> Self {
        Self::Classifier {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            CoordinatorError::Unclassified { .. } => "UNCLASSIFIED_REQUEST",
            CoordinatorError::NoRoute { .. } => "NO_ROUTE",
            CoordinatorError::AmbiguousRoute { .. } => "AMBIGUOUS_ROUTE",
            CoordinatorError::InvalidPlan { .. } => "INVALID_PLAN",
            CoordinatorError::Classifier { .. } => "CLASSIFIER_ERROR",
            CoordinatorError::Directory(err) => err.error_code(),
            CoordinatorError::Agent(err) => err.error_code(),
            CoordinatorError::Config(_) => "CONFIG_ERROR",
            CoordinatorError::Server(_) => "SERVER_ERROR",
            CoordinatorError::Remote { .. } => "REMOTE_ERROR",
        }
    }

    /// HTTP status used when this error is returned to a caller
    pub fn http_status(&self) -> u16 {
        match self {
            CoordinatorError::Unclassified { .. } => 422,
            CoordinatorError::NoRoute { .. } => 404,
            CoordinatorError::AmbiguousRoute { .. } => 409,
            CoordinatorError::Directory(DirectoryError::AgentNotFound { .. }) => 404,
            CoordinatorError::Directory(DirectoryError::Discovery { .. }) => 502,
            CoordinatorError::Directory(DirectoryError::InvalidCard { .. }) => 400,
            CoordinatorError::Remote { status, .. } => *status,
            _ => 500,
        }
    }
}

impl From<&CoordinatorError> for ErrorResponse {
    fn from(err: &CoordinatorError) -> Self {
        ErrorResponse::new(err.error_code(), err.to_string())
    }
}

/// Errors from the agent directory
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Agent not registered: {agent_id}")]
    AgentNotFound { agent_id: String },

    #[error("Discovery failed for {address}: {source}")]
    Discovery {
        address: String,
        #[source]
        source: AgentError,
    },

    #[error("Invalid agent card: {reason}")]
    InvalidCard { reason: String },
}

impl DirectoryError {
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::AgentNotFound { .. } => "AGENT_NOT_FOUND",
            DirectoryError::Discovery { .. } => "DISCOVERY_FAILED",
            DirectoryError::InvalidCard { .. } => "INVALID_AGENT_CARD",
        }
    }
}
