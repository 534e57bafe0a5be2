//! HTTP client for a running coordinator, used by `concierge ask`.

use crate::directory::DirectoryEntry;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::server::AskRequest;
use concierge_agent::AgentError;
use concierge_core::{AggregatedResponse, ErrorResponse};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct CoordinatorClient {
    base_url: Url,
    http: Client,
}

impl std::fmt::Debug for CoordinatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl CoordinatorClient {
    pub fn new(base_url: impl AsRef<str>) -> CoordinatorResult<Self> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(AgentError::InvalidUrl)?;
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(format!("concierge-cli/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AgentError::HttpClient(e.to_string()))?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> CoordinatorResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AgentError::protocol(format!("Invalid endpoint path: {e}")).into())
    }

    fn transport_error(&self, err: reqwest::Error) -> CoordinatorError {
        let err = if err.is_timeout() {
            AgentError::Timeout {
                timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            }
        } else if err.is_connect() || err.is_request() {
            AgentError::unreachable(self.base_url.as_str(), err.to_string())
        } else {
            AgentError::protocol(err.to_string())
        };
        err.into()
    }

    /// Submit a request and wait for the aggregated response
    pub async fn ask(&self, body: &AskRequest) -> CoordinatorResult<AggregatedResponse> {
        let url = self.endpoint("/requests")?;
        debug!(url = %url, "Submitting request");

        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response).await
    }

    pub async fn directory(&self) -> CoordinatorResult<Vec<DirectoryEntry>> {
        let url = self.endpoint("/directory")?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> CoordinatorResult<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(body) => CoordinatorError::Remote {
                    status: status.as_u16(),
                    code: body.code,
                    message: body.message,
                },
                Err(_) => CoordinatorError::Remote {
                    status: status.as_u16(),
                    code: "HTTP_ERROR".to_string(),
                    message: text,
                },
            });
        }
        response.json().await.map_err(|e| {
            AgentError::protocol(format!("Failed to parse coordinator response: {e}")).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = CoordinatorClient::new("http://127.0.0.1:9400").unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:9400/");
        assert!(CoordinatorClient::new("not a url").is_err());
    }
}
