//! Ticketing specialist: opens support tickets and reports ticket history.

use crate::specialist::{
    RetryPolicy, Specialist, ToolSession, missing_field, require_customer_id, tool_failure,
    unsupported,
};
use async_trait::async_trait;
use concierge_core::{
    AgentCard, AgentSkill, Intent, IntentKind, SpecialistResult, TaskRequest, TicketStatus,
    ToolCall,
};
use concierge_gateway::ToolGateway;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

pub const TICKETING_SPECIALIST_ID: &str = "ticketing-specialist";

pub struct TicketingSpecialist {
    gateway: Arc<dyn ToolGateway>,
    retry: RetryPolicy,
    url: String,
}

impl TicketingSpecialist {
    pub fn new(gateway: Arc<dyn ToolGateway>) -> Self {
        Self {
            gateway,
            retry: RetryPolicy::default(),
            url: "http://127.0.0.1:9301".to_string(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn create(&self, session: &mut ToolSession<'_>, intent: &Intent) -> SpecialistResult {
        let customer_id = match require_customer_id(intent) {
            Ok(id) => id,
            Err(result) => return result,
        };
        let issue = match intent.params.issue.as_deref().map(str::trim) {
            Some(issue) if !issue.is_empty() => issue.to_string(),
            _ => return missing_field(intent.kind, "issue"),
        };
        let priority = intent.params.priority.unwrap_or_default();

        match session
            .run(ToolCall::CreateTicket {
                customer_id,
                issue,
                priority: Some(priority),
            })
            .await
        {
            Ok(ticket) => {
                let ticket_id = ticket.get("id").and_then(|id| id.as_i64()).unwrap_or_default();
                SpecialistResult::success(
                    intent.kind,
                    ticket,
                    format!(
                        "Opened {priority} priority ticket #{ticket_id} for customer {customer_id}"
                    ),
                )
            }
            Err(err) => tool_failure(intent.kind, &err),
        }
    }

    /// Confirms the customer first, then reads their tickets.
    ///
    /// If the record read succeeds but the history read fails the result is
    /// `partial`: the caller still learns the customer's current state.
    /// Without a customer id, a ticket status filter applies to the customers
    /// an upstream listing produced.
    async fn history(
        &self,
        session: &mut ToolSession<'_>,
        intent: &Intent,
        upstream: Option<&Value>,
    ) -> SpecialistResult {
        if intent.params.customer_id.is_none() {
            let listed = upstream
                .and_then(|payload| payload.get("customers"))
                .and_then(Value::as_array);
            if let (Some(status), Some(listed)) = (intent.params.ticket_status, listed) {
                return self.filter_listed(session, intent, listed, status).await;
            }
        }

        let customer_id = match require_customer_id(intent) {
            Ok(id) => id,
            Err(result) => return result,
        };

        let customer = match session.run(ToolCall::FetchRecord { customer_id }).await {
            Ok(customer) => customer,
            Err(err) => return tool_failure(intent.kind, &err),
        };

        match session.run(ToolCall::FetchHistory { customer_id }).await {
            Ok(tickets) => {
                let tickets = match intent.params.ticket_status {
                    Some(status) => Value::Array(with_status(&tickets, status)),
                    None => tickets,
                };
                let count = tickets.as_array().map_or(0, Vec::len);
                let open = with_status(&tickets, TicketStatus::Open).len();
                SpecialistResult::success(
                    intent.kind,
                    json!({
                        "customer_id": customer_id,
                        "customer": customer,
                        "tickets": tickets,
                        "count": count,
                    }),
                    format!("Customer {customer_id} has {count} tickets ({open} open)"),
                )
            }
            Err(err) => {
                warn!(customer_id, error = %err, "Ticket history unavailable after record lookup");
                SpecialistResult::partial(
                    intent.kind,
                    json!({ "customer_id": customer_id, "customer": customer }),
                    format!("history failed: {err}; customer record retrieved"),
                )
            }
        }
    }

    /// Keeps the listed customers holding at least one ticket in `status`.
    ///
    /// Customers whose history cannot be read are left out and make the
    /// result `partial`; if no history could be read at all it fails.
    async fn filter_listed(
        &self,
        session: &mut ToolSession<'_>,
        intent: &Intent,
        listed: &[Value],
        status: TicketStatus,
    ) -> SpecialistResult {
        let mut customers = Vec::new();
        let mut tickets = Vec::new();
        let mut unread = Vec::new();
        let mut last_error = None;

        for customer in listed {
            let Some(customer_id) = customer.get("id").and_then(Value::as_i64) else {
                continue;
            };
            match session.run(ToolCall::FetchHistory { customer_id }).await {
                Ok(history) => {
                    let held = with_status(&history, status);
                    if !held.is_empty() {
                        customers.push(customer.clone());
                        tickets.extend(held);
                    }
                }
                Err(err) => {
                    warn!(customer_id, error = %err, "Ticket history unavailable for listed customer");
                    unread.push(customer_id);
                    last_error = Some(err);
                }
            }
        }

        let count = customers.len();
        let payload = json!({
            "ticket_status": status,
            "customers": customers,
            "tickets": tickets,
            "count": count,
        });
        match last_error {
            None => SpecialistResult::success(
                intent.kind,
                payload,
                format!(
                    "{count} of {} customers have {status} tickets",
                    listed.len()
                ),
            ),
            Some(err) if unread.len() == listed.len() => tool_failure(intent.kind, &err),
            Some(err) => SpecialistResult::partial(
                intent.kind,
                payload,
                format!(
                    "{count} customers have {status} tickets; history failed for customers {unread:?}: {err}"
                ),
            ),
        }
    }
}

/// Tickets in `history` whose status is `status`
fn with_status(history: &Value, status: TicketStatus) -> Vec<Value> {
    history
        .as_array()
        .map(|all| {
            all.iter()
                .filter(|ticket| ticket["status"] == status.as_str())
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Specialist for TicketingSpecialist {
    fn card(&self) -> AgentCard {
        AgentCard::new(TICKETING_SPECIALIST_ID, "Ticketing Specialist", &self.url)
            .with_description("Opens support tickets and reports ticket history")
            .with_capability("ticket")
            .with_capability("customer.history")
            .with_skill(
                AgentSkill::new("create_ticket", "Create ticket")
                    .with_description("Open a support ticket with low, medium or high priority")
                    .with_tag("support"),
            )
            .with_skill(
                AgentSkill::new("escalate_issue", "Escalate issue")
                    .with_description("Open a high priority ticket for urgent billing or outage issues")
                    .with_tag("support"),
            )
            .with_skill(
                AgentSkill::new("get_customer_history", "Get ticket history")
                    .with_description("Customer record plus every ticket, oldest first")
                    .with_tag("support"),
            )
    }

    async fn perform(&self, task: TaskRequest) -> SpecialistResult {
        let intent = &task.intent;
        let mut session = ToolSession::new(self.gateway.as_ref(), self.retry);

        let result = match intent.kind {
            IntentKind::CreateTicket => self.create(&mut session, intent).await,
            IntentKind::History => {
                self.history(&mut session, intent, task.upstream.as_ref())
                    .await
            }
            other => unsupported(other, TICKETING_SPECIALIST_ID),
        };

        info!(
            task_id = %task.task_id,
            intent = %intent.kind,
            status = %result.status,
            "Ticketing specialist finished task"
        );
        result
            .with_specialist(TICKETING_SPECIALIST_ID)
            .with_tool_calls(session.into_calls())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::{Priority, ResultStatus, ToolDescriptor, ToolError, ToolResult};
    use concierge_gateway::{LocalGateway, Store};
    use serde_json::Value;

    fn seeded_gateway() -> Arc<LocalGateway> {
        let store = Store::open_in_memory().unwrap();
        store.seed().unwrap();
        Arc::new(LocalGateway::new(Arc::new(store)))
    }

    /// Serves records but loses the ticket table
    struct HistoryOutage(Arc<LocalGateway>);

    #[async_trait]
    impl ToolGateway for HistoryOutage {
        async fn call(&self, call: ToolCall) -> ToolResult<Value> {
            match call {
                ToolCall::FetchHistory { .. } => Err(ToolError::unreachable("ticket db offline")),
                other => self.0.call(other).await,
            }
        }

        async fn tools(&self) -> ToolResult<Vec<ToolDescriptor>> {
            self.0.tools().await
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_medium() {
        let specialist = TicketingSpecialist::new(seeded_gateway());
        let intent = Intent::create_ticket(2, "Need help upgrading my account", None);
        let result = specialist.perform(TaskRequest::new(intent)).await;
        assert_eq!(result.status, ResultStatus::Success);
        assert_eq!(result.payload["priority"], "medium");
        assert_eq!(result.payload["status"], "open");
        assert_eq!(result.tool_calls, vec!["create_ticket"]);
    }

    #[tokio::test]
    async fn test_create_high_priority() {
        let specialist = TicketingSpecialist::new(seeded_gateway());
        let intent = Intent::create_ticket(1, "Charged twice", Some(Priority::High));
        let result = specialist.perform(TaskRequest::new(intent)).await;
        assert!(result.is_success());
        assert!(result.message.starts_with("Opened high priority ticket"));
    }

    #[tokio::test]
    async fn test_create_requires_issue() {
        let specialist = TicketingSpecialist::new(seeded_gateway());
        let mut intent = Intent::create_ticket(1, "  ", None);
        intent.params.issue = Some("  ".to_string());
        let result = specialist.perform(TaskRequest::new(intent)).await;
        assert!(result.is_failure());
        assert!(result.message.contains("issue"));
    }

    #[tokio::test]
    async fn test_create_for_unknown_customer() {
        let specialist = TicketingSpecialist::new(seeded_gateway());
        let intent = Intent::create_ticket(888, "Lost", None);
        let result = specialist.perform(TaskRequest::new(intent)).await;
        assert!(result.is_failure());
        assert!(result.message.contains("not found"));
    }

    #[tokio::test]
    async fn test_history_reads_record_then_tickets() {
        let specialist = TicketingSpecialist::new(seeded_gateway());
        let result = specialist
            .perform(TaskRequest::new(Intent::history(1)))
            .await;
        assert!(result.is_success());
        assert_eq!(result.tool_calls, vec!["fetch_record", "fetch_history"]);
        assert_eq!(result.payload["count"], 2);
        assert_eq!(result.payload["customer"]["name"], "Alice Premium");
        assert_eq!(result.message, "Customer 1 has 2 tickets (1 open)");
    }

    #[tokio::test]
    async fn test_history_outage_after_record_is_partial() {
        let gateway = Arc::new(HistoryOutage(seeded_gateway()));
        let specialist = TicketingSpecialist::new(gateway).with_retry(RetryPolicy::none());
        let result = specialist
            .perform(TaskRequest::new(Intent::history(4)))
            .await;
        assert_eq!(result.status, ResultStatus::Partial);
        assert_eq!(result.payload["customer"]["id"], 4);
        assert!(result.message.contains("unreachable"));
    }

    fn listed(ids: &[i64]) -> Value {
        let customers: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
        json!({"customers": customers, "count": ids.len()})
    }

    #[tokio::test]
    async fn test_filter_listed_customers_by_open_tickets() {
        let specialist = TicketingSpecialist::new(seeded_gateway());
        // Charlie has no tickets at all
        let task = TaskRequest::new(Intent::customers_with_tickets(TicketStatus::Open))
            .with_upstream(listed(&[1, 3, 2]));
        let result = specialist.perform(task).await;

        assert_eq!(result.status, ResultStatus::Success);
        assert_eq!(result.payload["count"], 2);
        let ids: Vec<i64> = result.payload["customers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(result.payload["tickets"]
            .as_array()
            .unwrap()
            .iter()
            .all(|t| t["status"] == "open"));
        assert_eq!(result.tool_calls.len(), 3);
        assert_eq!(result.message, "2 of 3 customers have open tickets");
    }

    #[tokio::test]
    async fn test_filter_listed_with_history_outage_fails() {
        let gateway = Arc::new(HistoryOutage(seeded_gateway()));
        let specialist = TicketingSpecialist::new(gateway).with_retry(RetryPolicy::none());
        let task = TaskRequest::new(Intent::customers_with_tickets(TicketStatus::Open))
            .with_upstream(listed(&[1, 2]));
        let result = specialist.perform(task).await;
        assert!(result.is_failure());
    }

    #[tokio::test]
    async fn test_status_filter_without_listing_needs_customer() {
        let specialist = TicketingSpecialist::new(seeded_gateway());
        let task = TaskRequest::new(Intent::customers_with_tickets(TicketStatus::Open));
        let result = specialist.perform(task).await;
        assert!(result.is_failure());
        assert!(result.message.contains("customer_id"), "{}", result.message);
    }

    #[tokio::test]
    async fn test_single_customer_history_honours_status_filter() {
        let specialist = TicketingSpecialist::new(seeded_gateway());
        let mut intent = Intent::history(1);
        intent.params.ticket_status = Some(TicketStatus::Open);
        let result = specialist.perform(TaskRequest::new(intent)).await;
        assert!(result.is_success());
        assert_eq!(result.payload["count"], 1);
        assert_eq!(result.message, "Customer 1 has 1 tickets (1 open)");
    }

    #[tokio::test]
    async fn test_rejects_lookup() {
        let specialist = TicketingSpecialist::new(seeded_gateway());
        let result = specialist.perform(TaskRequest::new(Intent::lookup(1))).await;
        assert!(result.is_failure());
        assert!(result.tool_calls.is_empty());
    }
}
