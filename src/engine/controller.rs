//! Execution controller
//!
//! Walks one execution's step snapshot from the entry step to a terminal
//! status:
//! - adapter-backed steps interpolate their config, resolve an adapter from
//!   the registry, and merge the returned context patch on success
//! - condition steps succeed or fail based on the structured expression
//! - delay steps suspend the task for the configured duration
//! - failures consume the step's retry budget before the failure edge is
//!   taken; an exhausted budget with no failure edge fails the run
//! - the cancellation flag is honored at resume points (between steps,
//!   after a retry backoff, after a delay)
//!
//! Step-level errors never escape the controller; they become step log rows
//! and branch decisions. Only store failures abort the walk, leaving the
//! execution record untouched.

use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapter::{AdapterError, AdapterRegistry};
use crate::engine::error::EngineError;
use crate::engine::graph::StepGraph;
use crate::engine::store::WorkflowStore;
use crate::workflow::context::{ContextPatch, ExecutionContext};
use crate::workflow::definition::{parse_duration, StepAction, WorkflowStep};
use crate::workflow::execution::{ExecutionStatus, StepOutcome, WorkflowStepLog};
use crate::workflow::expressions::interpolate_value;

/// Error message recorded when a run is stopped by a cancellation request
pub const CANCELLATION_ERROR: &str = "execution cancelled";

/// Outcome of a single attempt at a step
enum Attempt {
    Success(ContextPatch),
    Failure(String),
    Cancelled,
}

/// Outcome of a step after its retry budget is applied
enum StepRun {
    Success,
    Failure(String),
    Cancelled,
}

/// Drives executions to a terminal status
pub struct ExecutionController {
    store: Arc<dyn WorkflowStore>,
    adapters: AdapterRegistry,
}

impl ExecutionController {
    pub fn new(store: Arc<dyn WorkflowStore>, adapters: AdapterRegistry) -> Self {
        Self { store, adapters }
    }

    /// Run an execution to completion. Store failures are logged and leave
    /// the execution record as-is; everything else finalizes it.
    #[instrument(skip(self), fields(execution_id = %execution_id))]
    pub async fn run(&self, execution_id: Uuid) {
        if let Err(err) = self.drive(execution_id).await {
            error!(error = %err, "execution aborted on store failure");
        }
    }

    async fn drive(&self, execution_id: Uuid) -> Result<(), EngineError> {
        let execution = self.store.execution(execution_id).await?;
        let mut context = ExecutionContext::from_map(execution.context.clone());
        let graph = StepGraph::new(&execution.steps);

        let Some(mut current) = graph.entry_step() else {
            self.finalize(
                execution_id,
                ExecutionStatus::Failed,
                Some("workflow has no steps".to_string()),
                context,
            )
            .await?;
            return Ok(());
        };

        loop {
            if self.store.cancel_requested(execution_id).await? {
                self.finalize(
                    execution_id,
                    ExecutionStatus::Failed,
                    Some(CANCELLATION_ERROR.to_string()),
                    context,
                )
                .await?;
                return Ok(());
            }

            let (outcome, step_error) =
                match self.run_step(execution_id, current, &mut context).await? {
                    StepRun::Success => (StepOutcome::Success, None),
                    StepRun::Failure(err) => (StepOutcome::Failure, Some(err)),
                    StepRun::Cancelled => {
                        self.finalize(
                            execution_id,
                            ExecutionStatus::Failed,
                            Some(CANCELLATION_ERROR.to_string()),
                            context,
                        )
                        .await?;
                        return Ok(());
                    }
                };

            match graph.successor(current, outcome) {
                Ok(Some(next)) => current = next,
                Ok(None) => {
                    let status = match outcome {
                        StepOutcome::Success => ExecutionStatus::Completed,
                        StepOutcome::Failure => ExecutionStatus::Failed,
                    };
                    self.finalize(execution_id, status, step_error, context)
                        .await?;
                    return Ok(());
                }
                Err(err) => {
                    self.finalize(
                        execution_id,
                        ExecutionStatus::Failed,
                        Some(err.to_string()),
                        context,
                    )
                    .await?;
                    return Ok(());
                }
            }
        }
    }

    /// Run one step, retrying on failure per its retry policy. Every attempt
    /// appends exactly one step log row.
    #[instrument(skip(self, context), fields(step = %step.name, kind = step.action.kind_name()))]
    async fn run_step(
        &self,
        execution_id: Uuid,
        step: &WorkflowStep,
        context: &mut ExecutionContext,
    ) -> Result<StepRun, EngineError> {
        let budget = step.retry.attempts;
        let mut attempt = 1u32;

        loop {
            let started_at = chrono::Utc::now();

            match self.attempt_step(execution_id, step, context).await? {
                Attempt::Success(patch) => {
                    info!(attempt, "step succeeded");
                    self.store
                        .append_step_log(WorkflowStepLog::success(
                            execution_id,
                            step,
                            attempt,
                            &patch,
                            started_at,
                        ))
                        .await?;
                    context.merge_patch(patch);
                    return Ok(StepRun::Success);
                }
                Attempt::Cancelled => {
                    self.store
                        .append_step_log(WorkflowStepLog::failure(
                            execution_id,
                            step,
                            attempt,
                            CANCELLATION_ERROR,
                            started_at,
                        ))
                        .await?;
                    return Ok(StepRun::Cancelled);
                }
                Attempt::Failure(err) => {
                    warn!(attempt, error = %err, "step attempt failed");
                    self.store
                        .append_step_log(WorkflowStepLog::failure(
                            execution_id,
                            step,
                            attempt,
                            &err,
                            started_at,
                        ))
                        .await?;

                    if attempt > budget {
                        return Ok(StepRun::Failure(err));
                    }
                    attempt += 1;
                    sleep(Duration::from_millis(step.retry.delay_ms)).await;
                    if self.store.cancel_requested(execution_id).await? {
                        return Ok(StepRun::Cancelled);
                    }
                }
            }
        }
    }

    /// One attempt at a step's action
    async fn attempt_step(
        &self,
        execution_id: Uuid,
        step: &WorkflowStep,
        context: &ExecutionContext,
    ) -> Result<Attempt, EngineError> {
        match &step.action {
            StepAction::Action { subtype, config }
            | StepAction::Integration { subtype, config }
            | StepAction::Notification { subtype, config }
            | StepAction::Approval { subtype, config } => {
                let config = match interpolate_value(config, context) {
                    Ok(config) => config,
                    Err(err) => return Ok(Attempt::Failure(err.to_string())),
                };

                let Some(adapter) = self.adapters.resolve(subtype) else {
                    return Ok(Attempt::Failure(
                        AdapterError::NoAdapter(subtype.clone()).to_string(),
                    ));
                };

                match adapter.execute(subtype, &config, context).await {
                    Ok(patch) => Ok(Attempt::Success(patch)),
                    Err(err) => Ok(Attempt::Failure(err.to_string())),
                }
            }

            StepAction::Condition { condition } => {
                if condition.evaluate(context) {
                    Ok(Attempt::Success(ContextPatch::new()))
                } else {
                    Ok(Attempt::Failure(format!(
                        "condition not satisfied: {}",
                        condition.describe()
                    )))
                }
            }

            StepAction::Delay { duration } => {
                let parsed = match parse_duration(duration) {
                    Ok(parsed) => parsed,
                    Err(reason) => {
                        return Ok(Attempt::Failure(format!(
                            "invalid delay '{}': {}",
                            duration, reason
                        )))
                    }
                };

                sleep(parsed).await;

                if self.store.cancel_requested(execution_id).await? {
                    return Ok(Attempt::Cancelled);
                }
                Ok(Attempt::Success(ContextPatch::new()))
            }
        }
    }

    async fn finalize(
        &self,
        execution_id: Uuid,
        status: ExecutionStatus,
        error: Option<String>,
        context: ExecutionContext,
    ) -> Result<(), EngineError> {
        info!(?status, "execution finalized");
        self.store
            .finalize_execution(execution_id, status, error, context.into_map())
            .await?;
        Ok(())
    }
}
