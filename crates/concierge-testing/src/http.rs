//! The full engine over real HTTP on ephemeral ports.
//!
//! Starts a tool gateway on a temporary SQLite file, both specialists and the
//! coordinator, each on its own `127.0.0.1:0` listener. Dropping the stack
//! stops every server.

use crate::error::HarnessResult;
use crate::harness::fast_retry;
use concierge_agent::{
    DataSpecialist, HttpTransport, SpecialistKind, SpecialistServer, TicketingSpecialist,
    verify_gateway,
};
use concierge_coordinator::{
    AgentDirectory, Classifier, Coordinator, CoordinatorClient, CoordinatorConfig,
    CoordinatorServer, RuleClassifier,
};
use concierge_gateway::{GatewayClient, GatewayServer, LocalGateway, Store};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub struct HttpStack {
    pub gateway_url: String,
    pub data_url: String,
    pub ticketing_url: String,
    pub coordinator_url: String,
    store: Arc<Store>,
    shutdown: watch::Sender<bool>,
    servers: Vec<JoinHandle<()>>,
    _db_dir: TempDir,
}

impl std::fmt::Debug for HttpStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStack")
            .field("gateway_url", &self.gateway_url)
            .field("data_url", &self.data_url)
            .field("ticketing_url", &self.ticketing_url)
            .field("coordinator_url", &self.coordinator_url)
            .finish_non_exhaustive()
    }
}

async fn bind() -> HarnessResult<(TcpListener, String)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    Ok((listener, url))
}

fn shutdown_future(mut rx: watch::Receiver<bool>) -> impl Future<Output = ()> + Send + 'static {
    async move {
        // Also resolves when the sender is dropped
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

impl HttpStack {
    /// Start with the rule classifier and default coordinator settings
    pub async fn start() -> HarnessResult<Self> {
        Self::start_with(Arc::new(RuleClassifier::new()), CoordinatorConfig::default()).await
    }

    pub async fn start_with(
        classifier: Arc<dyn Classifier>,
        config: CoordinatorConfig,
    ) -> HarnessResult<Self> {
        let db_dir = TempDir::new()?;
        let store = Store::open(db_dir.path().join("concierge.db"))?;
        store.seed()?;
        let store = Arc::new(store);

        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut servers = Vec::new();

        let (listener, gateway_url) = bind().await?;
        let gateway_server = GatewayServer::new(Arc::new(LocalGateway::new(Arc::clone(&store))));
        let signal = shutdown_future(shutdown_rx.clone());
        servers.push(tokio::spawn(async move {
            if let Err(e) = gateway_server.serve_with_shutdown(listener, signal).await {
                warn!(error = %e, "Gateway server stopped with error");
            }
        }));

        let gateway = Arc::new(GatewayClient::new(&gateway_url)?);
        for kind in [SpecialistKind::Data, SpecialistKind::Ticketing] {
            verify_gateway(gateway.as_ref(), &gateway_url, kind.required_tools()).await?;
        }

        let (listener, data_url) = bind().await?;
        let data = DataSpecialist::new(gateway.clone())
            .with_retry(fast_retry())
            .with_url(data_url.clone());
        let signal = shutdown_future(shutdown_rx.clone());
        servers.push(tokio::spawn(async move {
            if let Err(e) = SpecialistServer::new(data)
                .serve_with_shutdown(listener, signal)
                .await
            {
                warn!(error = %e, "Data specialist server stopped with error");
            }
        }));

        let (listener, ticketing_url) = bind().await?;
        let ticketing = TicketingSpecialist::new(gateway)
            .with_retry(fast_retry())
            .with_url(ticketing_url.clone());
        let signal = shutdown_future(shutdown_rx.clone());
        servers.push(tokio::spawn(async move {
            if let Err(e) = SpecialistServer::new(ticketing)
                .serve_with_shutdown(listener, signal)
                .await
            {
                warn!(error = %e, "Ticketing specialist server stopped with error");
            }
        }));

        let (listener, coordinator_url) = bind().await?;
        let transport = Arc::new(HttpTransport::new()?);
        let directory = Arc::new(AgentDirectory::new(transport.clone()));
        let config = config
            .with_bind_addr(coordinator_url.trim_start_matches("http://"))
            .with_specialists(vec![data_url.clone(), ticketing_url.clone()]);
        let coordinator = Arc::new(Coordinator::new(classifier, directory, transport, config));
        coordinator.discover_configured().await?;

        let server = CoordinatorServer::new(coordinator).with_public_url(coordinator_url.clone());
        let signal = shutdown_future(shutdown_rx);
        servers.push(tokio::spawn(async move {
            if let Err(e) = server.serve_with_shutdown(listener, signal).await {
                warn!(error = %e, "Coordinator server stopped with error");
            }
        }));

        debug!(
            gateway = %gateway_url,
            data = %data_url,
            ticketing = %ticketing_url,
            coordinator = %coordinator_url,
            "HTTP stack started"
        );

        Ok(Self {
            gateway_url,
            data_url,
            ticketing_url,
            coordinator_url,
            store,
            shutdown,
            servers,
            _db_dir: db_dir,
        })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn client(&self) -> HarnessResult<CoordinatorClient> {
        Ok(CoordinatorClient::new(&self.coordinator_url)?)
    }

    /// Stop every server, aborting any that do not drain in time
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for server in self.servers {
            let abort = server.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, server).await.is_err() {
                abort.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_coordinator::AskRequest;

    #[tokio::test]
    async fn test_stack_answers_over_http() {
        let stack = HttpStack::start().await.unwrap();
        let client = stack.client().unwrap();

        let response = client
            .ask(&AskRequest::new("Get customer information for ID 1").with_session("http"))
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(response.session_id, "http");
        assert_eq!(response.results[0].result.payload["id"], 1);

        let directory = client.directory().await.unwrap();
        assert_eq!(directory.len(), 2);

        stack.shutdown().await;
    }
}
