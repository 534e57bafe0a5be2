//! Harness setup errors.

use concierge_agent::AgentError;
use concierge_coordinator::CoordinatorError;
use concierge_gateway::GatewayError;
use thiserror::Error;

pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Specialist setup failed: {0}")]
    Agent(#[from] AgentError),

    #[error("Coordinator setup failed: {0}")]
    Coordinator(#[from] CoordinatorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
