//! Aggregation of step outcomes into one response.

use crate::executor::ExecutionReport;
use concierge_core::{
    AggregateStatus, AggregatedResponse, Request, ResultStatus, StepFailure, StepOutcome,
};

/// Fold an execution report into the response for `request`.
///
/// Every failed step appears in `failures` and is called out in the narrative
/// by its intent; nothing is dropped silently.
pub fn synthesize(request: &Request, report: ExecutionReport) -> AggregatedResponse {
    let status = if report.cancelled {
        AggregateStatus::Cancelled
    } else {
        AggregateStatus::from_steps(report.outcomes.iter().map(|o| &o.result.status))
    };

    let failures = report
        .outcomes
        .iter()
        .filter(|o| o.result.is_failure())
        .map(|o| StepFailure {
            step: o.step,
            intent: o.intent,
            reason: o.result.message.clone(),
        })
        .collect();

    let narrative = narrate(status, &report.outcomes);

    AggregatedResponse {
        request_id: request.id,
        session_id: request.session_id.clone(),
        status,
        results: report.outcomes,
        failures,
        narrative,
    }
}

fn narrate(status: AggregateStatus, outcomes: &[StepOutcome]) -> String {
    let completed = outcomes.iter().filter(|o| !o.result.is_failure()).count();
    let mut lines = Vec::with_capacity(outcomes.len() + 1);

    match status {
        AggregateStatus::Success => {}
        AggregateStatus::Partial => {
            lines.push("Some parts of your request could not be completed.".to_string())
        }
        AggregateStatus::Failure => lines.push("Your request could not be completed.".to_string()),
        AggregateStatus::Cancelled => lines.push(format!(
            "Request cancelled after {completed} of {} steps.",
            outcomes.len()
        )),
    }

    for outcome in outcomes {
        let result = &outcome.result;
        let line = match result.status {
            ResultStatus::Success => result.message.clone(),
            ResultStatus::Partial => format!("{} (incomplete)", result.message),
            ResultStatus::Failure => format!(
                "Step {} ({}) failed: {}",
                outcome.step + 1,
                outcome.intent,
                result.message
            ),
        };
        lines.push(line);
    }

    lines.join("\n")
}
