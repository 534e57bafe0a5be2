//! Specialist doubles with predictable behaviour.

use async_trait::async_trait;
use concierge_agent::Specialist;
use concierge_core::{AgentCard, Capability, SpecialistResult, TaskRequest};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn stub_card(agent_id: &str, capabilities: &[Capability]) -> AgentCard {
    capabilities.iter().fold(
        AgentCard::new(agent_id, agent_id, format!("local://{agent_id}")),
        |card, capability| card.with_capability(capability.clone()),
    )
}

/// Records every task and answers with a success echoing the intent
#[derive(Debug, Clone)]
pub struct StubSpecialist {
    agent_id: String,
    capabilities: Vec<Capability>,
    tasks: Arc<Mutex<Vec<TaskRequest>>>,
}

impl StubSpecialist {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            capabilities: Vec::new(),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<Capability>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn tasks(&self) -> Vec<TaskRequest> {
        self.tasks.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Specialist for StubSpecialist {
    fn card(&self) -> AgentCard {
        stub_card(&self.agent_id, &self.capabilities)
    }

    async fn perform(&self, task: TaskRequest) -> SpecialistResult {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(task.clone());
        }
        let customer_id = task.intent.params.customer_id;
        SpecialistResult::success(
            task.intent.kind,
            json!({ "customer_id": customer_id, "handled_by": self.agent_id }),
            format!("{} handled {}", self.agent_id, task.intent.describe()),
        )
        .with_specialist(self.agent_id.clone())
    }
}

/// Always answers with a failure
#[derive(Debug, Clone)]
pub struct FailingSpecialist {
    agent_id: String,
    capabilities: Vec<Capability>,
    reason: String,
}

impl FailingSpecialist {
    pub fn new(agent_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            capabilities: Vec::new(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<Capability>) -> Self {
        self.capabilities.push(capability.into());
        self
    }
}

#[async_trait]
impl Specialist for FailingSpecialist {
    fn card(&self) -> AgentCard {
        stub_card(&self.agent_id, &self.capabilities)
    }

    async fn perform(&self, task: TaskRequest) -> SpecialistResult {
        let kind = task.intent.kind;
        SpecialistResult::failure(kind, format!("{kind} failed: {}", self.reason))
            .with_specialist(self.agent_id.clone())
    }
}

/// Delays every task before handing it to the wrapped specialist
pub struct SlowSpecialist {
    inner: Arc<dyn Specialist>,
    delay: Duration,
}

impl std::fmt::Debug for SlowSpecialist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlowSpecialist")
            .field("agent_id", &self.inner.card().agent_id)
            .field("delay", &self.delay)
            .finish()
    }
}

impl SlowSpecialist {
    pub fn new(inner: Arc<dyn Specialist>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl Specialist for SlowSpecialist {
    fn card(&self) -> AgentCard {
        self.inner.card()
    }

    async fn perform(&self, task: TaskRequest) -> SpecialistResult {
        tokio::time::sleep(self.delay).await;
        self.inner.perform(task).await
    }
}
