//! Engine error types

use uuid::Uuid;

use crate::engine::graph::GraphError;
use crate::workflow::definition::DefinitionError;

/// Errors surfaced by the engine's public operations.
///
/// Step-level execution errors are never propagated to the triggering
/// caller; they are recovered by the retry/branch policy and only visible
/// through the execution record and its step logs.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(Uuid),

    #[error("Execution not found: {0}")]
    ExecutionNotFound(Uuid),

    #[error("Template not found: {0}")]
    TemplateNotFound(Uuid),

    #[error("Workflow {0} is archived")]
    WorkflowArchived(Uuid),

    #[error("Trigger rejected for workflow {workflow}: {reason}")]
    TriggerNotAllowed { workflow: Uuid, reason: String },

    #[error("Invalid workflow definition: {0}")]
    InvalidDefinition(#[from] DefinitionError),

    #[error("Step graph integrity error: {0}")]
    Graph(#[from] GraphError),

    #[error("Execution {0} already reached a terminal status")]
    ExecutionFinished(Uuid),

    #[error("Store error: {0}")]
    Store(String),
}
