//! How the coordinator reaches specialists.
//!
//! Addresses are opaque strings: `http://…` base URLs for [`HttpTransport`],
//! any registered key (conventionally `local://<id>`) for [`LocalTransport`].

use crate::client::{AgentClient, DEFAULT_TIMEOUT};
use crate::error::{AgentError, AgentResult};
use crate::specialist::Specialist;
use async_trait::async_trait;
use concierge_core::{AgentCard, SpecialistResult, TaskRequest};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Fetch the capability document published at `address`
    async fn fetch_card(&self, address: &str) -> AgentResult<AgentCard>;

    /// Deliver a task and wait for the result
    async fn send_task(&self, address: &str, task: &TaskRequest) -> AgentResult<SpecialistResult>;
}

/// JSON over HTTP, sharing one connection pool across all agents
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new() -> AgentResult<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(format!("concierge-coordinator/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AgentError::HttpClient(e.to_string()))?;
        Ok(Self { http })
    }

    fn client(&self, address: &str) -> AgentResult<AgentClient> {
        AgentClient::with_http_client(address, self.http.clone())
    }
}

#[async_trait]
impl AgentTransport for HttpTransport {
    async fn fetch_card(&self, address: &str) -> AgentResult<AgentCard> {
        self.client(address)?.get_agent_card().await
    }

    async fn send_task(&self, address: &str, task: &TaskRequest) -> AgentResult<SpecialistResult> {
        self.client(address)?.send_task(task).await
    }
}

/// In-process transport: specialists are called directly
#[derive(Default, Clone)]
pub struct LocalTransport {
    agents: HashMap<String, Arc<dyn Specialist>>,
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("addresses", &self.agents.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_specialist(
        mut self,
        address: impl Into<String>,
        specialist: Arc<dyn Specialist>,
    ) -> Self {
        self.agents.insert(address.into(), specialist);
        self
    }

    fn resolve(&self, address: &str) -> AgentResult<&Arc<dyn Specialist>> {
        self.agents
            .get(address)
            .ok_or_else(|| AgentError::unreachable(address, "no in-process agent at this address"))
    }
}

#[async_trait]
impl AgentTransport for LocalTransport {
    async fn fetch_card(&self, address: &str) -> AgentResult<AgentCard> {
        let card = self.resolve(address)?.card();
        Ok(card.with_url(address))
    }

    async fn send_task(&self, address: &str, task: &TaskRequest) -> AgentResult<SpecialistResult> {
        let specialist = Arc::clone(self.resolve(address)?);
        Ok(specialist.perform(task.clone()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DATA_SPECIALIST_ID, DataSpecialist};
    use concierge_core::Intent;
    use concierge_gateway::{LocalGateway, Store};

    fn local() -> LocalTransport {
        let store = Store::open_in_memory().unwrap();
        store.seed().unwrap();
        let gateway = Arc::new(LocalGateway::new(Arc::new(store)));
        LocalTransport::new().with_specialist("local://data", Arc::new(DataSpecialist::new(gateway)))
    }

    #[tokio::test]
    async fn test_local_card_carries_address() {
        let card = local().fetch_card("local://data").await.unwrap();
        assert_eq!(card.agent_id, DATA_SPECIALIST_ID);
        assert_eq!(card.url, "local://data");
    }

    #[tokio::test]
    async fn test_local_send_task() {
        let result = local()
            .send_task("local://data", &TaskRequest::new(Intent::lookup(2)))
            .await
            .unwrap();
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_unknown_local_address_is_unreachable() {
        let err = local().fetch_card("local://nobody").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
