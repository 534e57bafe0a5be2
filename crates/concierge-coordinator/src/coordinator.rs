//! The coordinator: classify, plan, dispatch, aggregate, synthesize.

use crate::classifier::Classifier;
use crate::config::CoordinatorConfig;
use crate::directory::AgentDirectory;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::executor::{CancelSignal, Executor};
use crate::plan::DispatchPlan;
use crate::synthesis::synthesize;
use concierge_agent::AgentTransport;
use concierge_core::{AgentCard, AgentSkill, AggregatedResponse, Request};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub const COORDINATOR_ID: &str = "concierge-coordinator";

pub struct Coordinator {
    classifier: Arc<dyn Classifier>,
    directory: Arc<AgentDirectory>,
    executor: Executor,
    config: CoordinatorConfig,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        directory: Arc<AgentDirectory>,
        transport: Arc<dyn AgentTransport>,
        config: CoordinatorConfig,
    ) -> Self {
        let executor = Executor::new(transport, &config);
        Self {
            classifier,
            directory,
            executor,
            config,
        }
    }

    pub fn directory(&self) -> &Arc<AgentDirectory> {
        &self.directory
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Register every specialist in `config.specialists` by fetching its card
    pub async fn discover_configured(&self) -> CoordinatorResult<usize> {
        for address in &self.config.specialists {
            self.directory.discover(address).await?;
        }
        Ok(self.config.specialists.len())
    }

    /// Capability document for the coordinator itself
    pub fn card(&self, url: impl Into<String>) -> AgentCard {
        AgentCard::new(COORDINATOR_ID, "Concierge Coordinator", url)
            .with_description("Routes customer-service requests to specialist agents")
            .with_capability("concierge.request")
            .with_skill(
                AgentSkill::new("handle-request", "Handle request")
                    .with_description("Answer a natural-language customer-service request")
                    .with_tag("coordination"),
            )
    }

    pub async fn handle(&self, request: &Request) -> CoordinatorResult<AggregatedResponse> {
        self.handle_with_cancel(request, CancelSignal::never()).await
    }

    /// Handle a request, giving up on in-flight steps once `cancel` fires
    pub async fn handle_with_cancel(
        &self,
        request: &Request,
        cancel: CancelSignal,
    ) -> CoordinatorResult<AggregatedResponse> {
        let started = Instant::now();
        info!(
            request_id = %request.id,
            session_id = %request.session_id,
            "Handling request"
        );

        let intents = self.classifier.classify(&request.text).await?;
        if intents.is_empty() {
            warn!(request_id = %request.id, "No intent found in request");
            return Err(CoordinatorError::Unclassified {
                text: request.text.clone(),
            });
        }

        let plan = DispatchPlan::build(&intents, &self.directory).await?;
        info!(
            request_id = %request.id,
            steps = plan.len(),
            waves = plan.waves().len(),
            "Dispatch plan built"
        );

        let report = self
            .executor
            .execute(&plan, &request.session_id, cancel)
            .await;
        let response = synthesize(request, report);

        info!(
            request_id = %request.id,
            status = %response.status,
            failures = response.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request handled"
        );
        Ok(response)
    }
}
