//! Workflow and step definitions
//!
//! This module contains the persisted process-definition types and the
//! authoring form (`WorkflowDefinition`) used by the YAML loader and the
//! create/instantiate APIs. Authoring references steps by name; the
//! materialized records reference them by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use uuid::Uuid;

use super::expressions::Condition;

// ============================================================================
// Closed sets
// ============================================================================

/// Business domain a workflow belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowDomain {
    Recruitment,
    Onboarding,
    Performance,
    Document,
    Custom,
}

/// What kind of event starts this workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Manual,
    Scheduled,
    Event,
    Condition,
}

/// Workflow lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Draft,
    Active,
    Paused,
    Archived,
}

// ============================================================================
// Steps
// ============================================================================

/// Retry policy for a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure (0 = no retries)
    #[serde(default)]
    pub attempts: u32,

    /// Delay between attempts in milliseconds
    #[serde(default = "default_retry_delay")]
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 0,
            delay_ms: default_retry_delay(),
        }
    }
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_config() -> Value {
    Value::Object(serde_json::Map::new())
}

/// The behavior of a step, one tagged variant per step kind.
///
/// Adapter-backed kinds carry a free-form `subtype` (e.g. `mail/send`)
/// interpreted by the Action Adapter, plus an opaque configuration payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    /// Generic side effect performed by an adapter
    Action {
        subtype: String,
        #[serde(default = "default_config")]
        config: Value,
    },

    /// Call into an external system (same contract as `Action`)
    Integration {
        subtype: String,
        #[serde(default = "default_config")]
        config: Value,
    },

    /// Send a notification through an adapter
    Notification {
        subtype: String,
        #[serde(default = "default_config")]
        config: Value,
    },

    /// Request an approval; the adapter resolves it and reports the outcome
    Approval {
        subtype: String,
        #[serde(default = "default_config")]
        config: Value,
    },

    /// Branch on a structured condition, no side effect
    Condition { condition: Condition },

    /// Suspend this execution for a duration (e.g. "2d", "1h30m", "500ms")
    Delay { duration: String },
}

impl StepAction {
    /// The adapter subtype, if this kind is adapter-backed
    pub fn subtype(&self) -> Option<&str> {
        match self {
            StepAction::Action { subtype, .. }
            | StepAction::Integration { subtype, .. }
            | StepAction::Notification { subtype, .. }
            | StepAction::Approval { subtype, .. } => Some(subtype),
            StepAction::Condition { .. } | StepAction::Delay { .. } => None,
        }
    }

    /// Stable name of the step kind (for logs)
    pub fn kind_name(&self) -> &'static str {
        match self {
            StepAction::Action { .. } => "action",
            StepAction::Integration { .. } => "integration",
            StepAction::Notification { .. } => "notification",
            StepAction::Approval { .. } => "approval",
            StepAction::Condition { .. } => "condition",
            StepAction::Delay { .. } => "delay",
        }
    }
}

/// One node in a workflow's step graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: Uuid,
    pub workflow_id: Uuid,

    /// Display/ordering aid; the step with the lowest number is the entry
    pub number: u32,

    pub name: String,

    pub action: StepAction,

    /// Next step when this one succeeds; `None` ends the branch successfully
    pub on_success: Option<Uuid>,

    /// Next step when the retry budget is exhausted; `None` fails the run
    pub on_failure: Option<Uuid>,

    #[serde(default)]
    pub retry: RetryPolicy,
}

// ============================================================================
// Workflow
// ============================================================================

/// A named, persisted process definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub domain: WorkflowDomain,
    pub trigger: TriggerKind,

    /// Opaque payload interpreted by whatever fires the trigger
    #[serde(default)]
    pub trigger_config: Value,

    pub status: WorkflowStatus,

    /// Incremented exactly once per triggered run, independent of outcome
    pub execution_count: u64,

    pub last_executed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Authoring form
// ============================================================================

/// A step as authored in YAML or an API payload; successors by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,

    /// Optional explicit ordering; 0 means "use the position in the list"
    #[serde(default)]
    pub number: u32,

    pub action: StepAction,

    #[serde(default)]
    pub on_success: Option<String>,

    #[serde(default)]
    pub on_failure: Option<String>,

    #[serde(default)]
    pub retry: RetryPolicy,
}

/// A complete workflow definition as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub domain: WorkflowDomain,

    #[serde(default = "default_trigger")]
    pub trigger: TriggerKind,

    #[serde(default)]
    pub trigger_config: Value,

    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

fn default_trigger() -> TriggerKind {
    TriggerKind::Manual
}

/// Problems found while validating a workflow definition
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("Duplicate step name: {0}")]
    DuplicateStepName(String),

    #[error("Step '{step}' references unknown step '{target}'")]
    UnknownSuccessor { step: String, target: String },

    #[error("Step graph contains a cycle: {0:?}")]
    CyclicStepGraph(Vec<String>),

    #[error("Invalid duration '{input}' in step '{step}': {reason}")]
    InvalidDuration {
        step: String,
        input: String,
        reason: String,
    },
}

impl WorkflowDefinition {
    /// Validate the authored step graph: unique names, resolvable successor
    /// references, parseable delay durations, and no cycles. Cycles are a
    /// configuration error rejected at save time.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let mut names = HashSet::new();
        for step in &self.steps {
            if !names.insert(step.name.as_str()) {
                return Err(DefinitionError::DuplicateStepName(step.name.clone()));
            }
        }

        for step in &self.steps {
            for target in [&step.on_success, &step.on_failure].into_iter().flatten() {
                if !names.contains(target.as_str()) {
                    return Err(DefinitionError::UnknownSuccessor {
                        step: step.name.clone(),
                        target: target.clone(),
                    });
                }
            }

            if let StepAction::Delay { duration } = &step.action {
                parse_duration(duration).map_err(|reason| DefinitionError::InvalidDuration {
                    step: step.name.clone(),
                    input: duration.clone(),
                    reason,
                })?;
            }
        }

        self.check_cycles()
    }

    /// DFS over success/failure edges; reports the path when a back edge is hit
    fn check_cycles(&self) -> Result<(), DefinitionError> {
        let by_name: HashMap<&str, &StepDefinition> =
            self.steps.iter().map(|s| (s.name.as_str(), s)).collect();

        fn visit<'a>(
            name: &'a str,
            by_name: &HashMap<&'a str, &'a StepDefinition>,
            visited: &mut HashSet<&'a str>,
            in_progress: &mut HashSet<&'a str>,
            path: &mut Vec<String>,
        ) -> Result<(), DefinitionError> {
            if in_progress.contains(name) {
                path.push(name.to_string());
                return Err(DefinitionError::CyclicStepGraph(path.clone()));
            }
            if visited.contains(name) {
                return Ok(());
            }

            in_progress.insert(name);
            path.push(name.to_string());

            if let Some(step) = by_name.get(name) {
                for target in [&step.on_success, &step.on_failure].into_iter().flatten() {
                    visit(target.as_str(), by_name, visited, in_progress, path)?;
                }
            }

            path.pop();
            in_progress.remove(name);
            visited.insert(name);
            Ok(())
        }

        let mut visited = HashSet::new();
        for step in &self.steps {
            visit(
                step.name.as_str(),
                &by_name,
                &mut visited,
                &mut HashSet::new(),
                &mut Vec::new(),
            )?;
        }

        Ok(())
    }

    /// Turn the authored definition into persisted records: fresh ids,
    /// name references resolved, missing numbers filled from list position.
    pub fn materialize(
        &self,
        created_by: &str,
    ) -> Result<(Workflow, Vec<WorkflowStep>), DefinitionError> {
        self.validate()?;

        let workflow_id = Uuid::new_v4();
        let ids: HashMap<&str, Uuid> = self
            .steps
            .iter()
            .map(|s| (s.name.as_str(), Uuid::new_v4()))
            .collect();

        let steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(idx, step)| WorkflowStep {
                id: ids[step.name.as_str()],
                workflow_id,
                number: if step.number == 0 {
                    idx as u32 + 1
                } else {
                    step.number
                },
                name: step.name.clone(),
                action: step.action.clone(),
                on_success: step.on_success.as_deref().map(|n| ids[n]),
                on_failure: step.on_failure.as_deref().map(|n| ids[n]),
                retry: step.retry.clone(),
            })
            .collect();

        let workflow = Workflow {
            id: workflow_id,
            name: self.name.clone(),
            description: self.description.clone(),
            domain: self.domain,
            trigger: self.trigger,
            trigger_config: self.trigger_config.clone(),
            status: WorkflowStatus::Draft,
            execution_count: 0,
            last_executed_at: None,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };

        Ok((workflow, steps))
    }
}

// ============================================================================
// Durations
// ============================================================================

/// Parse a compound duration string like "2d", "1h30m", "45s" or "500ms"
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty string".to_string());
    }

    let mut total_ms = 0.0f64;
    let mut chars = input.chars().peekable();

    while chars.peek().is_some() {
        let mut number = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() || *c == '.' {
                number.push(*c);
                chars.next();
            } else {
                break;
            }
        }

        let value: f64 = number
            .parse()
            .map_err(|_| format!("expected a number, got '{}'", number))?;

        let unit = match chars.next() {
            Some('d') => 24.0 * 60.0 * 60.0 * 1000.0,
            Some('h') => 60.0 * 60.0 * 1000.0,
            Some('m') => {
                if chars.peek() == Some(&'s') {
                    chars.next();
                    1.0
                } else {
                    60.0 * 1000.0
                }
            }
            Some('s') => 1000.0,
            Some(c) => return Err(format!("unknown unit '{}'", c)),
            None => return Err("missing unit".to_string()),
        };

        total_ms += value * unit;
    }

    Ok(Duration::from_millis(total_ms as u64))
}
