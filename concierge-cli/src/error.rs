use concierge_agent::AgentError;
use concierge_core::ConfigError;
use concierge_coordinator::CoordinatorError;
use concierge_gateway::GatewayError;
use concierge_testing::HarnessError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error("failed to encode response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CliError>;
