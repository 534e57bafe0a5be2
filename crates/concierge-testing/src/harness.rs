//! In-process wiring of the whole engine.
//!
//! [`TestHarness`] runs the coordinator, both real specialists and the tool
//! gateway in one process over [`LocalTransport`], backed by a seeded store.
//! Doubles can be added next to (or instead of) the real specialists.
//!
//! ```rust,ignore
//! let harness = TestHarness::builder().build().await?;
//! let response = harness.ask("What is the status of customer 1?").await?;
//! assert!(response.is_success());
//! ```

use crate::error::HarnessResult;
use concierge_agent::{
    DataSpecialist, LocalTransport, RetryPolicy, Specialist, TicketingSpecialist,
};
use concierge_coordinator::{
    AgentDirectory, CancelSignal, Classifier, Coordinator, CoordinatorConfig, CoordinatorResult,
    RuleClassifier,
};
use concierge_core::{AggregatedResponse, Request};
use concierge_gateway::{LocalGateway, Store, ToolGateway};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const DATA_ADDRESS: &str = "local://data";
pub const TICKETING_ADDRESS: &str = "local://ticketing";
pub const TEST_SESSION: &str = "test-session";

/// Retry policy with a negligible backoff
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 1,
        backoff: Duration::from_millis(1),
    }
}

/// Coordinator settings suited to tests: short timeouts, fast retries
pub fn test_config() -> CoordinatorConfig {
    CoordinatorConfig::default()
        .with_specialists(Vec::new())
        .with_step_timeout(Duration::from_secs(2))
        .with_retry_backoff(Duration::from_millis(1))
}

pub struct TestHarnessBuilder {
    classifier: Option<Arc<dyn Classifier>>,
    config: CoordinatorConfig,
    gateway: Option<Arc<dyn ToolGateway>>,
    specialists: Vec<(String, Arc<dyn Specialist>)>,
    default_specialists: bool,
    file_store: bool,
    seed: bool,
}

impl Default for TestHarnessBuilder {
    fn default() -> Self {
        Self {
            classifier: None,
            config: test_config(),
            gateway: None,
            specialists: Vec::new(),
            default_specialists: true,
            file_store: false,
            seed: true,
        }
    }
}

impl TestHarnessBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier to use instead of [`RuleClassifier`]
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Gateway the default specialists talk to instead of the local store
    #[must_use]
    pub fn with_gateway(mut self, gateway: Arc<dyn ToolGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Register an extra specialist at `address`
    #[must_use]
    pub fn with_specialist(
        mut self,
        address: impl Into<String>,
        specialist: Arc<dyn Specialist>,
    ) -> Self {
        self.specialists.push((address.into(), specialist));
        self
    }

    /// Leave out the real data and ticketing specialists
    #[must_use]
    pub fn without_default_specialists(mut self) -> Self {
        self.default_specialists = false;
        self
    }

    /// Back the store with a SQLite file in a temporary directory
    #[must_use]
    pub fn with_file_store(mut self) -> Self {
        self.file_store = true;
        self
    }

    #[must_use]
    pub fn unseeded(mut self) -> Self {
        self.seed = false;
        self
    }

    pub async fn build(self) -> HarnessResult<TestHarness> {
        let (store, db_dir) = if self.file_store {
            let dir = TempDir::new()?;
            let store = Store::open(dir.path().join("concierge.db"))?;
            (store, Some(dir))
        } else {
            (Store::open_in_memory()?, None)
        };
        if self.seed {
            store.seed()?;
        }
        let store = Arc::new(store);

        let gateway: Arc<dyn ToolGateway> = match self.gateway {
            Some(gateway) => gateway,
            None => Arc::new(LocalGateway::new(Arc::clone(&store))),
        };

        let mut transport = LocalTransport::new();
        let mut addresses = Vec::new();
        if self.default_specialists {
            transport = transport
                .with_specialist(
                    DATA_ADDRESS,
                    Arc::new(DataSpecialist::new(Arc::clone(&gateway)).with_retry(fast_retry())),
                )
                .with_specialist(
                    TICKETING_ADDRESS,
                    Arc::new(TicketingSpecialist::new(gateway).with_retry(fast_retry())),
                );
            addresses.push(DATA_ADDRESS.to_string());
            addresses.push(TICKETING_ADDRESS.to_string());
        }
        for (address, specialist) in self.specialists {
            transport = transport.with_specialist(address.clone(), specialist);
            addresses.push(address);
        }

        let transport = Arc::new(transport);
        let directory = Arc::new(AgentDirectory::new(transport.clone()));
        for address in &addresses {
            directory.discover(address).await?;
        }

        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(RuleClassifier::new()));
        let coordinator = Arc::new(Coordinator::new(
            classifier,
            Arc::clone(&directory),
            transport,
            self.config,
        ));

        Ok(TestHarness {
            store,
            directory,
            coordinator,
            _db_dir: db_dir,
        })
    }
}

pub struct TestHarness {
    store: Arc<Store>,
    directory: Arc<AgentDirectory>,
    coordinator: Arc<Coordinator>,
    _db_dir: Option<TempDir>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with the real specialists, a seeded in-memory store and the rule classifier
    pub async fn new() -> HarnessResult<Self> {
        Self::builder().build().await
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn directory(&self) -> &Arc<AgentDirectory> {
        &self.directory
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub async fn ask(&self, text: &str) -> CoordinatorResult<AggregatedResponse> {
        self.coordinator
            .handle(&Request::new(text, TEST_SESSION))
            .await
    }

    pub async fn ask_with_cancel(
        &self,
        text: &str,
        cancel: CancelSignal,
    ) -> CoordinatorResult<AggregatedResponse> {
        self.coordinator
            .handle_with_cancel(&Request::new(text, TEST_SESSION), cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::AggregateStatus;

    #[tokio::test]
    async fn test_default_harness_routes_lookup() {
        let harness = TestHarness::new().await.unwrap();
        assert_eq!(harness.directory().len().await, 2);

        let response = harness.ask("What is the status of customer 1?").await.unwrap();
        assert_eq!(response.status, AggregateStatus::Success);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].specialist, "data-specialist");
    }

    #[tokio::test]
    async fn test_file_store_harness() {
        let harness = TestHarness::builder().with_file_store().build().await.unwrap();
        assert_eq!(harness.store().fetch_record(5).unwrap().id, 5);
    }
}
