//! Workflow data model and authoring surface
//!
//! This module contains all types for defining workflows and recording runs:
//! - `definition` - Workflow, WorkflowStep, StepAction, and the authoring form
//! - `template` - serialized blueprints for on-demand instantiation
//! - `execution` - execution and step-log records
//! - `context` - the JSON context a run carries between steps
//! - `expressions` - `${{ context.* }}` interpolation and condition evaluation
//! - `loader` - load workflow definitions from YAML files and directories

pub mod context;
pub mod definition;
pub mod execution;
pub mod expressions;
pub mod loader;
pub mod template;

pub use context::{ContextPatch, ExecutionContext};
pub use definition::{
    parse_duration, DefinitionError, RetryPolicy, StepAction, StepDefinition, TriggerKind,
    Workflow, WorkflowDefinition, WorkflowDomain, WorkflowStatus, WorkflowStep,
};
pub use execution::{
    ExecutionStatus, StepOutcome, TriggerSource, WorkflowExecution, WorkflowStepLog,
};
pub use expressions::{Condition, ConditionOp, ExpressionError};
pub use loader::{DefinitionLoader, LoadError};
pub use template::{TemplateOverrides, WorkflowTemplate};
