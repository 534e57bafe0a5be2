//! Customer data specialist: lookups, listings and record updates.

use crate::specialist::{
    RetryPolicy, Specialist, ToolSession, missing_field, require_customer_id, tool_failure,
    unsupported,
};
use async_trait::async_trait;
use concierge_core::{
    AgentCard, AgentSkill, Intent, IntentKind, SpecialistResult, TaskRequest, ToolCall,
};
use concierge_gateway::ToolGateway;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

pub const DATA_SPECIALIST_ID: &str = "data-specialist";

pub struct DataSpecialist {
    gateway: Arc<dyn ToolGateway>,
    retry: RetryPolicy,
    url: String,
}

impl DataSpecialist {
    pub fn new(gateway: Arc<dyn ToolGateway>) -> Self {
        Self {
            gateway,
            retry: RetryPolicy::default(),
            url: "http://127.0.0.1:9300".to_string(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Public URL advertised on the agent card
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn lookup(&self, session: &mut ToolSession<'_>, intent: &Intent) -> SpecialistResult {
        let customer_id = match require_customer_id(intent) {
            Ok(id) => id,
            Err(result) => return result,
        };
        match session.run(ToolCall::FetchRecord { customer_id }).await {
            Ok(customer) => {
                let message = format!(
                    "Customer {}: {} ({}, {})",
                    customer_id,
                    text(&customer, "name"),
                    text(&customer, "status"),
                    text(&customer, "email"),
                );
                SpecialistResult::success(intent.kind, customer, message)
            }
            Err(err) => tool_failure(intent.kind, &err),
        }
    }

    async fn list(&self, session: &mut ToolSession<'_>, intent: &Intent) -> SpecialistResult {
        let call = ToolCall::ListRecords {
            status: intent.params.status,
            limit: intent.params.limit,
        };
        match session.run(call).await {
            Ok(customers) => {
                let count = customers.as_array().map_or(0, Vec::len);
                let label = intent
                    .params
                    .status
                    .map(|status| format!("{status} "))
                    .unwrap_or_default();
                SpecialistResult::success(
                    intent.kind,
                    json!({ "customers": customers, "count": count }),
                    format!("Found {count} {label}customers"),
                )
            }
            Err(err) => tool_failure(intent.kind, &err),
        }
    }

    async fn update(&self, session: &mut ToolSession<'_>, intent: &Intent) -> SpecialistResult {
        let customer_id = match require_customer_id(intent) {
            Ok(id) => id,
            Err(result) => return result,
        };
        let changes = match &intent.params.changes {
            Some(changes) if !changes.is_empty() => changes.clone(),
            _ => return missing_field(intent.kind, "changes"),
        };
        let fields = changes.fields().join(", ");
        match session
            .run(ToolCall::UpdateRecord {
                customer_id,
                changes,
            })
            .await
        {
            Ok(customer) => SpecialistResult::success(
                intent.kind,
                customer,
                format!("Updated customer {customer_id}: {fields}"),
            ),
            Err(err) => tool_failure(intent.kind, &err),
        }
    }

    async fn history(&self, session: &mut ToolSession<'_>, intent: &Intent) -> SpecialistResult {
        let customer_id = match require_customer_id(intent) {
            Ok(id) => id,
            Err(result) => return result,
        };
        match session.run(ToolCall::FetchHistory { customer_id }).await {
            Ok(tickets) => {
                let count = tickets.as_array().map_or(0, Vec::len);
                SpecialistResult::success(
                    intent.kind,
                    json!({ "customer_id": customer_id, "tickets": tickets, "count": count }),
                    format!("Customer {customer_id} has {count} tickets"),
                )
            }
            Err(err) => tool_failure(intent.kind, &err),
        }
    }
}

#[async_trait]
impl Specialist for DataSpecialist {
    fn card(&self) -> AgentCard {
        AgentCard::new(DATA_SPECIALIST_ID, "Customer Data Specialist", &self.url)
            .with_description("Reads and updates customer records through the tool gateway")
            .with_capability("customer")
            .with_skill(
                AgentSkill::new("get_customer_info", "Get customer information")
                    .with_description("Look up a customer record by id")
                    .with_tag("customer"),
            )
            .with_skill(
                AgentSkill::new("list_customers", "List customers")
                    .with_description("List customers, optionally filtered by status")
                    .with_tag("customer"),
            )
            .with_skill(
                AgentSkill::new("update_customer", "Update customer")
                    .with_description("Change name, email, phone or status of a customer")
                    .with_tag("customer"),
            )
            .with_skill(
                AgentSkill::new("get_customer_history", "Get customer history")
                    .with_description("List the tickets a customer has raised")
                    .with_tag("customer"),
            )
    }

    async fn perform(&self, task: TaskRequest) -> SpecialistResult {
        let intent = &task.intent;
        let mut session = ToolSession::new(self.gateway.as_ref(), self.retry);

        let result = match intent.kind {
            IntentKind::Lookup => self.lookup(&mut session, intent).await,
            IntentKind::List => self.list(&mut session, intent).await,
            IntentKind::Update => self.update(&mut session, intent).await,
            IntentKind::History => self.history(&mut session, intent).await,
            IntentKind::CreateTicket | IntentKind::Compound => {
                unsupported(intent.kind, DATA_SPECIALIST_ID)
            }
        };

        info!(
            task_id = %task.task_id,
            intent = %intent.kind,
            status = %result.status,
            "Data specialist finished task"
        );
        result
            .with_specialist(DATA_SPECIALIST_ID)
            .with_tool_calls(session.into_calls())
    }
}

fn text<'a>(value: &'a Value, field: &str) -> &'a str {
    value.get(field).and_then(Value::as_str).unwrap_or("?")
}
