//! Execution and step-log records
//!
//! A `WorkflowExecution` is one triggered run of a workflow against a
//! concrete input context. It carries a snapshot of the step graph taken at
//! trigger time, so an in-flight run is deterministic against the definition
//! that existed when it started. `WorkflowStepLog` rows are the append-only
//! audit trail of individual step attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::context::ContextPatch;
use super::definition::{TriggerKind, WorkflowStep};

/// Execution lifecycle status; transitions are one-directional
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// Outcome of a single step attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    Failure,
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepOutcome::Success => write!(f, "success"),
            StepOutcome::Failure => write!(f, "failure"),
        }
    }
}

/// Who or what started an execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSource {
    pub kind: TriggerKind,

    /// Actor name for manual triggers, producer label otherwise
    /// (e.g. "timer:weekly-review", "event:candidate.status_changed")
    pub triggered_by: String,
}

impl TriggerSource {
    pub fn manual(actor: &str) -> Self {
        Self {
            kind: TriggerKind::Manual,
            triggered_by: actor.to_string(),
        }
    }

    pub fn scheduled(label: &str) -> Self {
        Self {
            kind: TriggerKind::Scheduled,
            triggered_by: label.to_string(),
        }
    }

    pub fn event(label: &str) -> Self {
        Self {
            kind: TriggerKind::Event,
            triggered_by: label.to_string(),
        }
    }

    pub fn condition(label: &str) -> Self {
        Self {
            kind: TriggerKind::Condition,
            triggered_by: label.to_string(),
        }
    }
}

/// One run instance of a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub status: ExecutionStatus,
    pub source: TriggerSource,

    /// Input context, updated with adapter patches as the run progresses;
    /// the final accumulated context is persisted at finalization
    pub context: Map<String, Value>,

    /// Step graph snapshot taken at trigger time
    pub steps: Vec<WorkflowStep>,

    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Set only when the execution finalizes as failed
    pub error: Option<String>,

    /// Cancellation flag, honored at the controller's resume points
    #[serde(default)]
    pub cancel_requested: bool,
}

impl WorkflowExecution {
    /// Create a new running execution with a step snapshot
    pub fn new(
        workflow_id: Uuid,
        context: Value,
        source: TriggerSource,
        steps: Vec<WorkflowStep>,
    ) -> Self {
        let context = match context {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("input".to_string(), other);
                map
            }
        };

        Self {
            id: Uuid::new_v4(),
            workflow_id,
            status: ExecutionStatus::Running,
            source,
            context,
            steps,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            cancel_requested: false,
        }
    }
}

/// Append-only record of one attempt at one step within one execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStepLog {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub step_id: Uuid,
    pub step_name: String,

    /// 1-based attempt counter; retries append further rows
    pub attempt: u32,

    pub outcome: StepOutcome,

    /// Context patch returned by a successful attempt
    pub output: Option<Value>,

    /// Error message captured from a failed attempt
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl WorkflowStepLog {
    pub fn success(
        execution_id: Uuid,
        step: &WorkflowStep,
        attempt: u32,
        patch: &ContextPatch,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            execution_id,
            step_id: step.id,
            step_name: step.name.clone(),
            attempt,
            outcome: StepOutcome::Success,
            output: if patch.is_empty() {
                None
            } else {
                Some(Value::Object(patch.clone()))
            },
            error: None,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn failure(
        execution_id: Uuid,
        step: &WorkflowStep,
        attempt: u32,
        error: &str,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            execution_id,
            step_id: step.id,
            step_name: step.name.clone(),
            attempt,
            outcome: StepOutcome::Failure,
            output: None,
            error: Some(error.to_string()),
            started_at,
            finished_at: Utc::now(),
        }
    }
}
