//! Results produced by specialists and the aggregated response returned to callers.

use crate::intent::IntentKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Outcome of one specialist invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Partial,
    Failure,
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResultStatus::Success => "success",
            ResultStatus::Partial => "partial",
            ResultStatus::Failure => "failure",
        })
    }
}

/// Structured result of a specialist serving one intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistResult {
    pub status: ResultStatus,
    pub intent: IntentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialist: Option<String>,
    #[serde(default)]
    pub payload: Value,
    pub message: String,
    /// Gateway operations issued while serving the intent, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<String>,
}

impl SpecialistResult {
    fn new(status: ResultStatus, intent: IntentKind, payload: Value, message: String) -> Self {
        Self {
            status,
            intent,
            specialist: None,
            payload,
            message,
            tool_calls: Vec::new(),
        }
    }

    pub fn success(intent: IntentKind, payload: Value, message: impl Into<String>) -> Self {
        Self::new(ResultStatus::Success, intent, payload, message.into())
    }

    pub fn partial(intent: IntentKind, payload: Value, message: impl Into<String>) -> Self {
        Self::new(ResultStatus::Partial, intent, payload, message.into())
    }

    pub fn failure(intent: IntentKind, message: impl Into<String>) -> Self {
        Self::new(ResultStatus::Failure, intent, Value::Null, message.into())
    }

    #[must_use]
    pub fn with_specialist(mut self, specialist: impl Into<String>) -> Self {
        self.specialist = Some(specialist.into());
        self
    }

    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<String>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    pub fn is_failure(&self) -> bool {
        self.status == ResultStatus::Failure
    }
}

/// Overall status of an aggregated response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    Success,
    Partial,
    Failure,
    Cancelled,
}

impl AggregateStatus {
    /// Fold step statuses: all success is success, all failure is failure,
    /// anything else is partial. No steps counts as failure.
    pub fn from_steps<'a>(statuses: impl IntoIterator<Item = &'a ResultStatus>) -> Self {
        let mut any = false;
        let mut all_success = true;
        let mut all_failure = true;
        for status in statuses {
            any = true;
            all_success &= *status == ResultStatus::Success;
            all_failure &= *status == ResultStatus::Failure;
        }
        match (any, all_success, all_failure) {
            (false, _, _) => AggregateStatus::Failure,
            (true, true, _) => AggregateStatus::Success,
            (true, _, true) => AggregateStatus::Failure,
            _ => AggregateStatus::Partial,
        }
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggregateStatus::Success => "success",
            AggregateStatus::Partial => "partial",
            AggregateStatus::Failure => "failure",
            AggregateStatus::Cancelled => "cancelled",
        })
    }
}

/// One executed plan step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: usize,
    pub intent: IntentKind,
    pub specialist: String,
    pub result: SpecialistResult,
}

/// A step that did not succeed, listed explicitly in the response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: usize,
    pub intent: IntentKind,
    pub reason: String,
}

/// Final answer to one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResponse {
    pub request_id: Uuid,
    pub session_id: String,
    pub status: AggregateStatus,
    /// One entry per plan step, in plan order
    pub results: Vec<StepOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<StepFailure>,
    pub narrative: String,
}

impl AggregatedResponse {
    pub fn is_success(&self) -> bool {
        self.status == AggregateStatus::Success
    }

    pub fn result_for(&self, step: usize) -> Option<&SpecialistResult> {
        self.results
            .iter()
            .find(|outcome| outcome.step == step)
            .map(|outcome| &outcome.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_status_folding() {
        use ResultStatus::*;
        assert_eq!(
            AggregateStatus::from_steps(&[Success, Success]),
            AggregateStatus::Success
        );
        assert_eq!(
            AggregateStatus::from_steps(&[Success, Failure]),
            AggregateStatus::Partial
        );
        assert_eq!(
            AggregateStatus::from_steps(&[Failure, Failure]),
            AggregateStatus::Failure
        );
        assert_eq!(
            AggregateStatus::from_steps(&[Success, Partial]),
            AggregateStatus::Partial
        );
        assert_eq!(AggregateStatus::from_steps(&[]), AggregateStatus::Failure);
    }

    #[test]
    fn test_failure_result_has_null_payload() {
        let result = SpecialistResult::failure(IntentKind::Lookup, "missing field customer_id")
            .with_specialist("data-specialist");
        assert!(result.is_failure());
        assert_eq!(result.payload, Value::Null);
        assert_eq!(result.specialist.as_deref(), Some("data-specialist"));
    }
}
