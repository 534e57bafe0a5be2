//! HTTP client for one specialist.
//!
//! Fetches the agent card from `/.well-known/agent.json` and submits tasks to
//! `/tasks/send`. The client does not retry; whether a task may be re-sent
//! depends on the intent and is the caller's decision.

use crate::error::{AgentError, AgentResult};
use concierge_core::{AGENT_CARD_PATH, AgentCard, SpecialistResult, TaskRequest};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default timeout for HTTP requests to a specialist
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AgentClient {
    base_url: Url,
    http: Client,
}

impl std::fmt::Debug for AgentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl AgentClient {
    pub fn new(base_url: impl AsRef<str>) -> AgentResult<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(format!("concierge-agent/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AgentError::HttpClient(e.to_string()))?;
        Self::with_http_client(base_url, http)
    }

    /// Share an existing connection pool
    pub fn with_http_client(base_url: impl AsRef<str>, http: Client) -> AgentResult<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> AgentResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AgentError::protocol(format!("Invalid endpoint path: {e}")))
    }

    fn transport_error(&self, err: reqwest::Error) -> AgentError {
        if err.is_timeout() {
            AgentError::Timeout {
                timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            }
        } else if err.is_connect() || err.is_request() {
            AgentError::unreachable(self.base_url.as_str(), err.to_string())
        } else {
            AgentError::protocol(err.to_string())
        }
    }

    /// Fetch the agent card from the well-known endpoint
    pub async fn get_agent_card(&self) -> AgentResult<AgentCard> {
        let url = self.endpoint(AGENT_CARD_PATH)?;
        debug!(url = %url, "Fetching agent card");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_response(status, response).await);
        }

        let card: AgentCard = response
            .json()
            .await
            .map_err(|e| AgentError::protocol(format!("Failed to parse agent card: {e}")))?;

        info!(
            agent_id = %card.agent_id,
            name = %card.name,
            capabilities = card.capabilities.len(),
            "Fetched agent card"
        );
        Ok(card)
    }

    /// Submit a task and wait for the specialist's result
    pub async fn send_task(&self, task: &TaskRequest) -> AgentResult<SpecialistResult> {
        let url = self.endpoint("/tasks/send")?;
        debug!(url = %url, task_id = %task.task_id, intent = %task.intent.kind, "Sending task");

        let response = self
            .http
            .post(url)
            .json(task)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_response(status, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AgentError::protocol(format!("Failed to parse specialist result: {e}")))
    }

    async fn handle_error_response(
        &self,
        status: StatusCode,
        response: reqwest::Response,
    ) -> AgentError {
        let error_text = response.text().await.unwrap_or_default();

        match status {
            StatusCode::NOT_FOUND => AgentError::NotFound {
                address: self.base_url.to_string(),
            },
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
                AgentError::unreachable(self.base_url.as_str(), error_text)
            }
            StatusCode::GATEWAY_TIMEOUT => AgentError::Timeout {
                timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            },
            _ => AgentError::protocol(format!("HTTP {status}: {error_text}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = AgentClient::new("http://127.0.0.1:9300").unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:9300/");
        assert!(AgentClient::new("::not a url::").is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let client = AgentClient::new("http://localhost:9301").unwrap();
        assert_eq!(
            client.endpoint(AGENT_CARD_PATH).unwrap().as_str(),
            "http://localhost:9301/.well-known/agent.json"
        );
    }
}
