//! Step graph resolver
//!
//! Pure, side-effect-free lookups over an execution's step snapshot. An
//! absent successor edge is a valid terminal condition; an edge naming a
//! step id that is not in the snapshot is structural corruption and is
//! reported as a distinct error.

use std::collections::HashMap;
use uuid::Uuid;

use crate::workflow::definition::WorkflowStep;
use crate::workflow::execution::StepOutcome;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("step '{step}' references missing step {target} on its {outcome} edge")]
    MissingStep {
        step: String,
        target: Uuid,
        outcome: StepOutcome,
    },
}

/// Successor/entry lookup over a fixed step set
pub struct StepGraph<'a> {
    by_id: HashMap<Uuid, &'a WorkflowStep>,
    steps: &'a [WorkflowStep],
}

impl<'a> StepGraph<'a> {
    pub fn new(steps: &'a [WorkflowStep]) -> Self {
        Self {
            by_id: steps.iter().map(|s| (s.id, s)).collect(),
            steps,
        }
    }

    /// The graph's start node: the step with the lowest step number
    pub fn entry_step(&self) -> Option<&'a WorkflowStep> {
        self.steps.iter().min_by_key(|s| s.number)
    }

    pub fn step(&self, id: Uuid) -> Option<&'a WorkflowStep> {
        self.by_id.get(&id).copied()
    }

    /// The next step for a given outcome. `Ok(None)` means the branch
    /// terminates; `Err` means the edge points outside the snapshot.
    pub fn successor(
        &self,
        step: &WorkflowStep,
        outcome: StepOutcome,
    ) -> Result<Option<&'a WorkflowStep>, GraphError> {
        let edge = match outcome {
            StepOutcome::Success => step.on_success,
            StepOutcome::Failure => step.on_failure,
        };

        match edge {
            None => Ok(None),
            Some(target) => self
                .step(target)
                .map(Some)
                .ok_or_else(|| GraphError::MissingStep {
                    step: step.name.clone(),
                    target,
                    outcome,
                }),
        }
    }
}
