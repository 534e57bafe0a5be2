//! Dispatch plans.
//!
//! A [`DispatchPlan`] is the ordered list of specialist calls for one
//! request. Each step names the specialist that serves it and, optionally, the
//! earlier step whose output it consumes. Compound intents are flattened into
//! a sequential pipeline before routing.

use crate::directory::{AgentDirectory, DirectoryEntry};
use crate::error::{CoordinatorError, CoordinatorResult};
use concierge_core::{Intent, IntentKind};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub index: usize,
    pub intent: Intent,
    pub agent_id: String,
    pub address: String,
    pub depends_on: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchPlan {
    steps: Vec<PlanStep>,
}

impl DispatchPlan {
    /// Flatten and route `intents`.
    ///
    /// Every intent kind is resolved once per plan, so all steps with the
    /// same kind go to the same specialist. Any unroutable step fails the
    /// whole plan before anything is dispatched.
    pub async fn build(intents: &[Intent], directory: &AgentDirectory) -> CoordinatorResult<Self> {
        let leaves = flatten(intents)?;

        let mut routes: HashMap<IntentKind, DirectoryEntry> = HashMap::new();
        let mut steps = Vec::with_capacity(leaves.len());
        for (index, (intent, depends_on)) in leaves.into_iter().enumerate() {
            let entry = match routes.get(&intent.kind) {
                Some(entry) => entry.clone(),
                None => {
                    let entry = directory.route(intent.kind).await?;
                    routes.insert(intent.kind, entry.clone());
                    entry
                }
            };
            steps.push(PlanStep {
                index,
                intent,
                agent_id: entry.agent_id,
                address: entry.address,
                depends_on,
            });
        }

        Self::from_steps(steps)
    }

    /// Wrap already-routed steps, checking the plan invariants
    pub fn from_steps(steps: Vec<PlanStep>) -> CoordinatorResult<Self> {
        let plan = Self { steps };
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> CoordinatorResult<()> {
        if self.steps.is_empty() {
            return Err(CoordinatorError::invalid_plan("plan has no steps"));
        }
        for (position, step) in self.steps.iter().enumerate() {
            if step.index != position {
                return Err(CoordinatorError::invalid_plan(format!(
                    "step at position {position} has index {}",
                    step.index
                )));
            }
            if step.intent.kind == IntentKind::Compound {
                return Err(CoordinatorError::invalid_plan(format!(
                    "step {position} is an unflattened compound intent"
                )));
            }
            if step.depends_on.is_some_and(|dep| dep >= position) {
                return Err(CoordinatorError::invalid_plan(format!(
                    "step {position} depends on a step that does not precede it"
                )));
            }
        }
        Ok(())
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Group step indexes by dependency depth.
    ///
    /// A step with no prerequisite is in wave 0; otherwise it is one wave
    /// after its prerequisite. The number of waves is the longest chain of
    /// calls the plan needs.
    pub fn waves(&self) -> Vec<Vec<usize>> {
        let mut level = vec![0usize; self.steps.len()];
        let mut waves: Vec<Vec<usize>> = Vec::new();
        for step in &self.steps {
            let wave = step.depends_on.map(|dep| level[dep] + 1).unwrap_or(0);
            level[step.index] = wave;
            if waves.len() <= wave {
                waves.resize_with(wave + 1, Vec::new);
            }
            waves[wave].push(step.index);
        }
        waves
    }
}

/// Flatten compound intents into leaf steps with absolute dependencies.
///
/// Parts of a compound run as a pipeline: each part depends on the one
/// before it, and the first part inherits the compound's own dependency.
/// A `depends_on` pointing at a compound refers to its last part.
pub(crate) fn flatten(intents: &[Intent]) -> CoordinatorResult<Vec<(Intent, Option<usize>)>> {
    let mut out = Vec::new();
    flatten_into(intents, false, None, &mut out)?;
    Ok(out)
}

fn flatten_into(
    intents: &[Intent],
    chained: bool,
    inherited: Option<usize>,
    out: &mut Vec<(Intent, Option<usize>)>,
) -> CoordinatorResult<Option<usize>> {
    // ends[i] is the flattened index whose output stands for intents[i]
    let mut ends: Vec<usize> = Vec::with_capacity(intents.len());

    for (position, intent) in intents.iter().enumerate() {
        let depends_on = match intent.depends_on {
            Some(dep) => Some(*ends.get(dep).ok_or_else(|| {
                CoordinatorError::invalid_plan(format!(
                    "intent {position} ({}) depends on intent {dep}, which does not precede it",
                    intent.kind
                ))
            })?),
            None if chained => ends.last().copied().or(inherited),
            None => None,
        };

        if intent.kind == IntentKind::Compound {
            if intent.parts.is_empty() {
                return Err(CoordinatorError::invalid_plan(format!(
                    "compound intent {position} has no parts"
                )));
            }
            match flatten_into(&intent.parts, true, depends_on, out)? {
                Some(end) => ends.push(end),
                None => {
                    return Err(CoordinatorError::invalid_plan(format!(
                        "compound intent {position} has no parts"
                    )));
                }
            }
        } else {
            let mut leaf = intent.clone();
            leaf.depends_on = None;
            out.push((leaf, depends_on));
            ends.push(out.len() - 1);
        }
    }

    Ok(ends.last().copied())
}
