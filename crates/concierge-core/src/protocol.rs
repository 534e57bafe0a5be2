//! Wire protocol between Concierge processes.
//!
//! ```text
//! specialist ──POST /call {"tool": "...", "params": {...}}──▶ gateway
//!            ◀── {"status": "ok" | "not_found" | ..., "data"?, "error"?}
//!
//! coordinator ──POST /tasks/send TaskRequest──▶ specialist
//!             ◀── SpecialistResult
//! ```

use crate::error::{ToolError, ToolResult};
use crate::intent::Intent;
use crate::model::{CustomerStatus, CustomerUpdate, Priority};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// Tool calls
// ============================================================================

/// A call to one gateway operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "params", rename_all = "snake_case")]
pub enum ToolCall {
    FetchRecord {
        customer_id: i64,
    },
    ListRecords {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<CustomerStatus>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    },
    UpdateRecord {
        customer_id: i64,
        changes: CustomerUpdate,
    },
    CreateTicket {
        customer_id: i64,
        issue: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        priority: Option<Priority>,
    },
    FetchHistory {
        customer_id: i64,
    },
}

impl ToolCall {
    /// Names of every operation in the catalog
    pub const NAMES: [&'static str; 5] = [
        "fetch_record",
        "list_records",
        "update_record",
        "create_ticket",
        "fetch_history",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::FetchRecord { .. } => "fetch_record",
            ToolCall::ListRecords { .. } => "list_records",
            ToolCall::UpdateRecord { .. } => "update_record",
            ToolCall::CreateTicket { .. } => "create_ticket",
            ToolCall::FetchHistory { .. } => "fetch_history",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            ToolCall::FetchRecord { .. } | ToolCall::ListRecords { .. } | ToolCall::FetchHistory { .. }
        )
    }
}

/// Wire status of a tool response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    NotFound,
    ValidationError,
    UnknownTool,
    InternalError,
}

/// Response to a [`ToolCall`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            status: ToolStatus::Ok,
            data: Some(data),
            error: None,
        }
    }

    pub fn from_error(err: &ToolError) -> Self {
        Self {
            status: err.status(),
            data: None,
            error: Some(err.detail()),
        }
    }

    pub fn into_result(self) -> ToolResult<Value> {
        match self.status {
            ToolStatus::Ok => Ok(self.data.unwrap_or(Value::Null)),
            status => Err(ToolError::from_status(status, self.error)),
        }
    }
}

impl From<ToolResult<Value>> for ToolResponse {
    fn from(result: ToolResult<Value>) -> Self {
        match result {
            Ok(data) => ToolResponse::ok(data),
            Err(err) => ToolResponse::from_error(&err),
        }
    }
}

/// Catalog entry describing one gateway operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Parameter name to a short type/description string
    pub parameters: Value,
    pub read_only: bool,
}

// ============================================================================
// Specialist tasks
// ============================================================================

/// A task sent from the coordinator to a specialist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task_id: Uuid,
    pub intent: Intent,
    /// Payload of the prerequisite step, when this step depends on one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl TaskRequest {
    pub fn new(intent: Intent) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            intent,
            upstream: None,
            session_id: None,
        }
    }

    #[must_use]
    pub fn with_upstream(mut self, upstream: Value) -> Self {
        self.upstream = Some(upstream);
        self
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}
