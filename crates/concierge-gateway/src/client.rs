//! HTTP client for a remote tool gateway.
//!
//! Transport failures are mapped onto the tool taxonomy so callers never see a
//! raw `reqwest` error:
//!
//! | Failure | Error | Retryable |
//! |---------|-------|-----------|
//! | connection refused / DNS | `Unreachable` | Yes |
//! | request exceeded timeout | `Timeout` | Yes |
//! | tool response body | rebuilt from `status` | No |
//! | anything else | `Protocol` | No |

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::ToolGateway;
use async_trait::async_trait;
use concierge_core::{ToolCall, ToolDescriptor, ToolError, ToolResponse, ToolResult};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default timeout for gateway calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct GatewayClient {
    base_url: Url,
    http: Client,
    timeout: Duration,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GatewayClient {
    pub fn new(base_url: impl AsRef<str>) -> GatewayResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl AsRef<str>, timeout: Duration) -> GatewayResult<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(format!("concierge-gateway/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url,
            http,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ToolResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ToolError::protocol(format!("invalid endpoint path: {e}")))
    }

    fn transport_error(&self, err: reqwest::Error) -> ToolError {
        if err.is_timeout() {
            ToolError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if err.is_connect() || err.is_request() {
            ToolError::unreachable(format!("{}: {err}", self.base_url))
        } else {
            ToolError::protocol(err.to_string())
        }
    }

    fn handle_error_response(status: StatusCode, body: &str) -> ToolError {
        match status {
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
                ToolError::unreachable(format!("HTTP {status}: {body}"))
            }
            StatusCode::GATEWAY_TIMEOUT => ToolError::unreachable(format!("HTTP {status}")),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ToolError::validation(body.to_string())
            }
            _ => ToolError::protocol(format!("HTTP {status}: {body}")),
        }
    }

    /// Perform one health check
    pub async fn health(&self) -> ToolResult<Value> {
        let url = self.endpoint("/health")?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::handle_error_response(status, &body));
        }
        response
            .json()
            .await
            .map_err(|e| ToolError::protocol(format!("failed to parse health response: {e}")))
    }
}

#[async_trait]
impl ToolGateway for GatewayClient {
    async fn call(&self, call: ToolCall) -> ToolResult<Value> {
        let url = self.endpoint("/call")?;
        let tool = call.name();
        debug!(url = %url, tool, "Calling remote tool");

        let response = self
            .http
            .post(url)
            .json(&call)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        // Tool outcomes carry a ToolResponse regardless of HTTP status
        match serde_json::from_str::<ToolResponse>(&body) {
            Ok(tool_response) => tool_response.into_result(),
            Err(_) => {
                warn!(tool, status = %status, "Gateway answered without a tool response");
                Err(Self::handle_error_response(status, &body))
            }
        }
    }

    async fn tools(&self) -> ToolResult<Vec<ToolDescriptor>> {
        let url = self.endpoint("/tools")?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::handle_error_response(status, &body));
        }
        response
            .json()
            .await
            .map_err(|e| ToolError::protocol(format!("failed to parse tool catalog: {e}")))
    }
}
