//! The `Specialist` contract and the gateway session specialists use to issue tool calls.

use crate::error::{AgentError, AgentResult};
use async_trait::async_trait;
use concierge_core::{
    AgentCard, Intent, IntentKind, SpecialistResult, TaskRequest, ToolCall, ToolError, ToolResult,
};
use concierge_gateway::ToolGateway;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// A specialist agent owning one capability domain.
///
/// `perform` never fails: validation problems and gateway errors are reported
/// as `failure` or `partial` results.
#[async_trait]
pub trait Specialist: Send + Sync + 'static {
    /// Capability discovery document
    fn card(&self) -> AgentCard;

    /// Serve one task
    async fn perform(&self, task: TaskRequest) -> SpecialistResult;
}

/// Retry policy for read-only gateway calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }
}

/// Records every tool call issued while serving one task.
///
/// Read-only calls are retried on transient errors; mutating calls go out once,
/// since a lost response may still mean the write committed.
pub struct ToolSession<'a> {
    gateway: &'a dyn ToolGateway,
    retry: RetryPolicy,
    calls: Vec<String>,
}

impl<'a> ToolSession<'a> {
    pub fn new(gateway: &'a dyn ToolGateway, retry: RetryPolicy) -> Self {
        Self {
            gateway,
            retry,
            calls: Vec::new(),
        }
    }

    pub async fn run(&mut self, call: ToolCall) -> ToolResult<Value> {
        let tool = call.name();
        let attempts = if call.is_read_only() {
            self.retry.max_retries + 1
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            self.calls.push(tool.to_string());
            match self.gateway.call(call.clone()).await {
                Err(err) if err.is_retryable() && attempt < attempts => {
                    warn!(tool, attempt, error = %err, "Retrying read-only tool call");
                    tokio::time::sleep(self.retry.backoff).await;
                    attempt += 1;
                }
                result => {
                    debug!(tool, attempt, ok = result.is_ok(), "Tool call finished");
                    return result;
                }
            }
        }
    }

    /// Tool names issued so far, including retries
    pub fn into_calls(self) -> Vec<String> {
        self.calls
    }
}

/// Fetch the gateway's tool catalog and check it offers every tool in `required`
pub async fn verify_gateway(
    gateway: &dyn ToolGateway,
    address: &str,
    required: &[&str],
) -> AgentResult<()> {
    let tools = gateway
        .tools()
        .await
        .map_err(|err| AgentError::ToolDiscovery {
            address: address.to_string(),
            message: err.to_string(),
        })?;

    let missing: Vec<String> = required
        .iter()
        .filter(|name| !tools.iter().any(|tool| tool.name == **name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        warn!(address, missing = ?missing, "Gateway lacks required tools");
        return Err(AgentError::MissingTools {
            address: address.to_string(),
            missing,
        });
    }

    debug!(address, offered = tools.len(), "Gateway tool catalog verified");
    Ok(())
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Required `customer_id`, or a failure naming the missing field
pub(crate) fn require_customer_id(intent: &Intent) -> Result<i64, SpecialistResult> {
    intent
        .params
        .customer_id
        .ok_or_else(|| missing_field(intent.kind, "customer_id"))
}

pub(crate) fn missing_field(kind: IntentKind, field: &str) -> SpecialistResult {
    SpecialistResult::failure(kind, format!("{kind} is missing required field: {field}"))
}

pub(crate) fn unsupported(kind: IntentKind, agent_id: &str) -> SpecialistResult {
    SpecialistResult::failure(kind, format!("{agent_id} does not handle {kind} intents"))
}

/// Failure text for a tool error, naming the intent it broke
pub(crate) fn tool_failure(kind: IntentKind, err: &ToolError) -> SpecialistResult {
    SpecialistResult::failure(kind, format!("{kind} failed: {err}"))
}
