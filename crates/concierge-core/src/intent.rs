//! Requests and the intents classification extracts from them.

use crate::capability::Capability;
use crate::model::{CustomerStatus, CustomerUpdate, Priority, TicketStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// An end-user request; immutable once received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    pub session_id: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl Request {
    pub fn new(text: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// Closed set of things a request can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentKind {
    Lookup,
    Update,
    CreateTicket,
    History,
    List,
    Compound,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Lookup => "lookup",
            IntentKind::Update => "update",
            IntentKind::CreateTicket => "create-ticket",
            IntentKind::History => "history",
            IntentKind::List => "list",
            IntentKind::Compound => "compound",
        }
    }

    /// Capability a specialist must declare to serve this intent.
    ///
    /// `Compound` has none; it is flattened before routing.
    pub fn capability(&self) -> Option<Capability> {
        let name = match self {
            IntentKind::Lookup => "customer.lookup",
            IntentKind::List => "customer.list",
            IntentKind::Update => "customer.update",
            IntentKind::History => "customer.history",
            IntentKind::CreateTicket => "ticket.create",
            IntentKind::Compound => return None,
        };
        Some(Capability::new(name))
    }

    /// Read-only intents may be re-issued safely
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            IntentKind::Lookup | IntentKind::List | IntentKind::History
        )
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters extracted alongside an intent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<CustomerUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Status filter for `list`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CustomerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Ticket status filter for `history`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_status: Option<TicketStatus>,
}

/// A classified intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    #[serde(default)]
    pub params: IntentParams,
    /// Sub-intents of a `compound` intent, executed as a sequential pipeline
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<Intent>,
    /// Index of an earlier intent in the same sequence whose output this one consumes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<usize>,
}

impl Intent {
    pub fn new(kind: IntentKind, params: IntentParams) -> Self {
        Self {
            kind,
            params,
            parts: Vec::new(),
            depends_on: None,
        }
    }

    pub fn lookup(customer_id: i64) -> Self {
        Self::new(
            IntentKind::Lookup,
            IntentParams {
                customer_id: Some(customer_id),
                ..Default::default()
            },
        )
    }

    pub fn list(status: Option<CustomerStatus>, limit: Option<u32>) -> Self {
        Self::new(
            IntentKind::List,
            IntentParams {
                status,
                limit,
                ..Default::default()
            },
        )
    }

    pub fn update(customer_id: i64, changes: CustomerUpdate) -> Self {
        Self::new(
            IntentKind::Update,
            IntentParams {
                customer_id: Some(customer_id),
                changes: Some(changes),
                ..Default::default()
            },
        )
    }

    pub fn history(customer_id: i64) -> Self {
        Self::new(
            IntentKind::History,
            IntentParams {
                customer_id: Some(customer_id),
                ..Default::default()
            },
        )
    }

    /// History over the customers a prerequisite listed, keeping only those
    /// holding a ticket in `status`
    pub fn customers_with_tickets(status: TicketStatus) -> Self {
        Self::new(
            IntentKind::History,
            IntentParams {
                ticket_status: Some(status),
                ..Default::default()
            },
        )
    }

    pub fn create_ticket(
        customer_id: i64,
        issue: impl Into<String>,
        priority: Option<Priority>,
    ) -> Self {
        Self::new(
            IntentKind::CreateTicket,
            IntentParams {
                customer_id: Some(customer_id),
                issue: Some(issue.into()),
                priority,
                ..Default::default()
            },
        )
    }

    pub fn compound(parts: Vec<Intent>) -> Self {
        Self {
            kind: IntentKind::Compound,
            params: IntentParams::default(),
            parts,
            depends_on: None,
        }
    }

    #[must_use]
    pub fn with_depends_on(mut self, step: usize) -> Self {
        self.depends_on = Some(step);
        self
    }

    /// Short human-readable label, e.g. `history(customer 5)`
    pub fn describe(&self) -> String {
        match (self.kind, self.params.customer_id) {
            (IntentKind::Compound, _) => format!("compound({} parts)", self.parts.len()),
            (kind, Some(id)) => format!("{kind}(customer {id})"),
            (IntentKind::List, None) => match self.params.status {
                Some(status) => format!("list({status} customers)"),
                None => "list(all customers)".to_string(),
            },
            (IntentKind::History, None) => match self.params.ticket_status {
                Some(status) => format!("history(customers with {status} tickets)"),
                None => "history".to_string(),
            },
            (kind, None) => kind.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_table() {
        assert_eq!(
            IntentKind::Lookup.capability().unwrap().as_str(),
            "customer.lookup"
        );
        assert_eq!(
            IntentKind::CreateTicket.capability().unwrap().as_str(),
            "ticket.create"
        );
        assert!(IntentKind::Compound.capability().is_none());
    }

    #[test]
    fn test_idempotence() {
        assert!(IntentKind::Lookup.is_idempotent());
        assert!(IntentKind::History.is_idempotent());
        assert!(IntentKind::List.is_idempotent());
        assert!(!IntentKind::Update.is_idempotent());
        assert!(!IntentKind::CreateTicket.is_idempotent());
    }

    #[test]
    fn test_intent_serialization() {
        let intent = Intent::create_ticket(1, "Charged twice", Some(Priority::High));
        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(value["kind"], "create-ticket");
        assert_eq!(value["params"]["priority"], "high");
        assert!(value.get("parts").is_none());

        let back: Intent = serde_json::from_value(value).unwrap();
        assert_eq!(back, intent);
    }

    #[test]
    fn test_describe() {
        assert_eq!(Intent::history(5).describe(), "history(customer 5)");
        assert_eq!(
            Intent::list(Some(CustomerStatus::Active), None).describe(),
            "list(active customers)"
        );
        assert_eq!(
            Intent::customers_with_tickets(TicketStatus::Open).describe(),
            "history(customers with open tickets)"
        );
        assert_eq!(
            Intent::compound(vec![Intent::lookup(1), Intent::history(1)]).describe(),
            "compound(2 parts)"
        );
    }
}
