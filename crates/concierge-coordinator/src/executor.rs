//! Plan execution.
//!
//! Steps are scheduled by their dependencies: every step without a
//! prerequisite starts at once, and a dependent step starts as soon as its
//! own prerequisite lands, whatever else is still in flight. Concurrency is
//! bounded by `max_concurrent_steps`. A dependent step receives the
//! prerequisite's customer id and payload as input.
//!
//! Transport trouble never escapes as an error. Timeouts, unreachable
//! specialists and skipped dependents all become `failure` results naming the
//! intent they belonged to.

use crate::config::CoordinatorConfig;
use crate::plan::{DispatchPlan, PlanStep};
use concierge_agent::{AgentError, AgentTransport};
use concierge_core::{SpecialistResult, StepOutcome, TaskRequest};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, info, warn};

// ============================================================================
// Cancellation
// ============================================================================

/// Caller side of a cancellation pair
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may already be gone
        let _ = self.tx.send(true);
    }
}

/// Observed by the executor; resolves once the caller cancels
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn channel() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx: Arc::new(tx) }, CancelSignal { rx })
    }

    /// A signal that never fires
    pub fn never() -> Self {
        let (_, signal) = Self::channel();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until cancelled. Pends forever if the handle is dropped first.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

// ============================================================================
// Executor
// ============================================================================

/// What a plan run produced, one outcome per step in step order
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub outcomes: Vec<StepOutcome>,
    pub cancelled: bool,
}

pub struct Executor {
    transport: Arc<dyn AgentTransport>,
    step_timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    limiter: Arc<Semaphore>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("step_timeout", &self.step_timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new(transport: Arc<dyn AgentTransport>, config: &CoordinatorConfig) -> Self {
        Self {
            transport,
            step_timeout: config.step_timeout,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
            limiter: Arc::new(Semaphore::new(config.max_concurrent_steps.max(1))),
        }
    }

    pub async fn execute(
        &self,
        plan: &DispatchPlan,
        session_id: &str,
        mut cancel: CancelSignal,
    ) -> ExecutionReport {
        let steps = plan.steps();
        let mut slots: Vec<Option<StepOutcome>> = vec![None; plan.len()];
        let mut cancelled = cancel.is_cancelled();

        let mut in_flight = FuturesUnordered::new();
        if !cancelled {
            for step in steps.iter().filter(|step| step.depends_on.is_none()) {
                in_flight.push(self.run_step(step, None, session_id));
            }
        }

        while !cancelled {
            tokio::select! {
                next = in_flight.next() => match next {
                    Some(outcome) => {
                        let index = outcome.step;
                        for dependent in steps.iter().filter(|step| step.depends_on == Some(index)) {
                            in_flight.push(self.run_step(dependent, Some(outcome.clone()), session_id));
                        }
                        slots[index] = Some(outcome);
                    }
                    None => break,
                },
                _ = cancel.cancelled() => cancelled = true,
            }
        }

        if cancelled {
            info!(
                completed = slots.iter().filter(|s| s.is_some()).count(),
                total = plan.len(),
                "Execution cancelled"
            );
        }

        let outcomes = plan
            .steps()
            .iter()
            .zip(slots)
            .map(|(step, slot)| {
                slot.unwrap_or_else(|| {
                    outcome(
                        step,
                        SpecialistResult::failure(
                            step.intent.kind,
                            format!("{} cancelled before completion", step.intent.describe()),
                        ),
                    )
                })
            })
            .collect();

        ExecutionReport {
            outcomes,
            cancelled,
        }
    }

    /// `upstream` is the finished prerequisite, if the step has one
    async fn run_step(
        &self,
        step: &PlanStep,
        upstream: Option<StepOutcome>,
        session_id: &str,
    ) -> StepOutcome {
        let mut task = TaskRequest::new(step.intent.clone()).with_session(session_id);

        if let Some(prior) = upstream {
            if prior.result.is_failure() {
                debug!(step = step.index, prerequisite = prior.step, "Skipping dependent step");
                return outcome(
                    step,
                    SpecialistResult::failure(
                        step.intent.kind,
                        format!(
                            "{} skipped: prerequisite step {} ({}) failed",
                            step.intent.describe(),
                            prior.step,
                            prior.intent
                        ),
                    ),
                );
            }
            if task.intent.params.customer_id.is_none() {
                task.intent.params.customer_id = customer_id_of(&prior.result.payload);
            }
            task = task.with_upstream(prior.result.payload);
        }

        let Ok(_permit) = self.limiter.acquire().await else {
            return outcome(
                step,
                SpecialistResult::failure(step.intent.kind, "dispatcher is shutting down"),
            );
        };

        let result = self.dispatch(step, &task).await;
        outcome(step, result)
    }

    /// Send one task, retrying idempotent intents on transport failure
    async fn dispatch(&self, step: &PlanStep, task: &TaskRequest) -> SpecialistResult {
        let kind = step.intent.kind;
        let retries = if kind.is_idempotent() {
            self.max_retries
        } else {
            0
        };

        let mut attempt = 0u32;
        loop {
            info!(
                step = step.index,
                intent = %kind,
                agent_id = %step.agent_id,
                attempt,
                "Dispatching step"
            );

            let sent = tokio::time::timeout(
                self.step_timeout,
                self.transport.send_task(&step.address, task),
            )
            .await;

            let err = match sent {
                Ok(Ok(mut result)) => {
                    if result.specialist.is_none() {
                        result.specialist = Some(step.agent_id.clone());
                    }
                    debug!(step = step.index, status = %result.status, "Step finished");
                    return result;
                }
                Ok(Err(err)) => err,
                Err(_) => AgentError::Timeout {
                    timeout_ms: self.step_timeout.as_millis() as u64,
                },
            };

            if err.is_retryable() && attempt < retries {
                attempt += 1;
                warn!(
                    step = step.index,
                    intent = %kind,
                    error = %err,
                    attempt,
                    "Retrying idempotent step"
                );
                tokio::time::sleep(self.retry_backoff).await;
                continue;
            }

            warn!(step = step.index, intent = %kind, error = %err, "Step failed");
            return SpecialistResult::failure(
                kind,
                format!(
                    "{} failed at {}: {err}",
                    step.intent.describe(),
                    step.agent_id
                ),
            )
            .with_specialist(step.agent_id.clone());
        }
    }
}

fn outcome(step: &PlanStep, result: SpecialistResult) -> StepOutcome {
    StepOutcome {
        step: step.index,
        intent: step.intent.kind,
        specialist: step.agent_id.clone(),
        result,
    }
}

/// Customer id carried by a prerequisite's payload.
///
/// Checks `customer_id` before `id` so a ticket payload yields its customer,
/// then the nested `customer` and `record` objects.
pub(crate) fn customer_id_of(payload: &Value) -> Option<i64> {
    payload
        .get("customer_id")
        .and_then(Value::as_i64)
        .or_else(|| payload.get("id").and_then(Value::as_i64))
        .or_else(|| {
            ["customer", "record"].iter().find_map(|key| {
                let nested = payload.get(*key)?;
                nested
                    .get("customer_id")
                    .and_then(Value::as_i64)
                    .or_else(|| nested.get("id").and_then(Value::as_i64))
            })
        })
}
