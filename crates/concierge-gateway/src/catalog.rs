//! The fixed tool catalog and its dispatch onto the store.

use crate::error::GatewayResult;
use crate::store::Store;
use concierge_core::{ToolCall, ToolDescriptor, ToolError};
use serde_json::{Value, json};

/// Discovery document served at `GET /tools`
pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "fetch_record".to_string(),
            description: "Fetch one customer record by id".to_string(),
            parameters: json!({ "customer_id": "integer, required" }),
            read_only: true,
        },
        ToolDescriptor {
            name: "list_records".to_string(),
            description: "List customers ordered by id, optionally filtered by status".to_string(),
            parameters: json!({
                "status": "active | disabled, optional",
                "limit": "integer, optional, default 100"
            }),
            read_only: true,
        },
        ToolDescriptor {
            name: "update_record".to_string(),
            description: "Partially update a customer record (name, email, phone, status)"
                .to_string(),
            parameters: json!({
                "customer_id": "integer, required",
                "changes": "object with any of name, email, phone, status"
            }),
            read_only: false,
        },
        ToolDescriptor {
            name: "create_ticket".to_string(),
            description: "Open a support ticket for an existing customer".to_string(),
            parameters: json!({
                "customer_id": "integer, required",
                "issue": "string, required",
                "priority": "low | medium | high, optional, default medium"
            }),
            read_only: false,
        },
        ToolDescriptor {
            name: "fetch_history".to_string(),
            description: "All tickets of a customer, oldest first".to_string(),
            parameters: json!({ "customer_id": "integer, required" }),
            read_only: true,
        },
    ]
}

pub fn is_known(name: &str) -> bool {
    ToolCall::NAMES.iter().any(|known| *known == name)
}

/// Run one call against the store and serialize its output
pub fn execute(store: &Store, call: &ToolCall) -> GatewayResult<Value> {
    let value = match call {
        ToolCall::FetchRecord { customer_id } => {
            serde_json::to_value(store.fetch_record(*customer_id)?)
        }
        ToolCall::ListRecords { status, limit } => {
            serde_json::to_value(store.list_records(*status, *limit)?)
        }
        ToolCall::UpdateRecord {
            customer_id,
            changes,
        } => serde_json::to_value(store.update_record(*customer_id, changes)?),
        ToolCall::CreateTicket {
            customer_id,
            issue,
            priority,
        } => serde_json::to_value(store.create_ticket(*customer_id, issue, *priority)?),
        ToolCall::FetchHistory { customer_id } => {
            serde_json::to_value(store.fetch_history(*customer_id)?)
        }
    };
    value.map_err(|e| ToolError::internal(format!("failed to encode result: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_matches_tool_names() {
        let names: Vec<_> = descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ToolCall::NAMES.to_vec());
        assert!(is_known("fetch_history"));
        assert!(!is_known("drop_tables"));
    }

    #[test]
    fn test_execute_returns_json() {
        let store = Store::open_in_memory().unwrap();
        store.seed().unwrap();

        let value = execute(&store, &ToolCall::FetchRecord { customer_id: 2 }).unwrap();
        assert_eq!(value["name"], "Bob Standard");
        assert_eq!(value["status"], "active");

        let value = execute(&store, &ToolCall::FetchHistory { customer_id: 1 }).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }
}
