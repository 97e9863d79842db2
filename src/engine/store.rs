//! Workflow store boundary
//!
//! The engine reads and writes all persisted state through this trait; the
//! surrounding application owns the actual storage. `MemoryStore` is the
//! in-crate implementation used by the CLI, demos, and tests.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::engine::error::EngineError;
use crate::workflow::definition::{Workflow, WorkflowStatus, WorkflowStep};
use crate::workflow::execution::{ExecutionStatus, WorkflowExecution, WorkflowStepLog};
use crate::workflow::template::WorkflowTemplate;

/// Persistence contract for workflows, templates, executions, and step logs
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn insert_workflow(
        &self,
        workflow: Workflow,
        steps: Vec<WorkflowStep>,
    ) -> Result<(), EngineError>;

    async fn workflow(&self, id: Uuid) -> Result<Workflow, EngineError>;

    async fn workflows(&self) -> Result<Vec<Workflow>, EngineError>;

    async fn set_workflow_status(
        &self,
        id: Uuid,
        status: WorkflowStatus,
    ) -> Result<Workflow, EngineError>;

    /// Replace a workflow's step set (definition editing). Executions
    /// already in flight keep their snapshot and are unaffected.
    async fn update_steps(&self, id: Uuid, steps: Vec<WorkflowStep>) -> Result<(), EngineError>;

    async fn steps(&self, workflow_id: Uuid) -> Result<Vec<WorkflowStep>, EngineError>;

    /// Atomically bump the execution counter and last-executed timestamp.
    /// Called exactly once per triggered run; must stay correct under
    /// concurrent triggers of the same workflow.
    async fn record_trigger(&self, id: Uuid) -> Result<Workflow, EngineError>;

    async fn insert_template(&self, template: WorkflowTemplate) -> Result<(), EngineError>;

    async fn template(&self, id: Uuid) -> Result<WorkflowTemplate, EngineError>;

    async fn insert_execution(&self, execution: WorkflowExecution) -> Result<(), EngineError>;

    async fn execution(&self, id: Uuid) -> Result<WorkflowExecution, EngineError>;

    /// Move an execution to a terminal status, recording the completion
    /// timestamp, final context, and (on failure) the error message.
    /// First writer wins: finalizing an already-terminal execution is a
    /// no-op that returns the stored record.
    async fn finalize_execution(
        &self,
        id: Uuid,
        status: ExecutionStatus,
        error: Option<String>,
        context: Map<String, Value>,
    ) -> Result<WorkflowExecution, EngineError>;

    /// Flag an execution for cancellation; no-op once terminal
    async fn request_cancel(&self, id: Uuid) -> Result<(), EngineError>;

    async fn cancel_requested(&self, id: Uuid) -> Result<bool, EngineError>;

    /// Append one step-attempt log row. Rejected with `ExecutionFinished`
    /// once the owning execution is terminal (logs are append-only and
    /// frozen at finalization).
    async fn append_step_log(&self, log: WorkflowStepLog) -> Result<(), EngineError>;

    /// Step logs for an execution, in append order
    async fn step_logs(&self, execution_id: Uuid) -> Result<Vec<WorkflowStepLog>, EngineError>;
}

/// In-memory store backed by `tokio::sync::RwLock` tables
#[derive(Default)]
pub struct MemoryStore {
    workflows: RwLock<HashMap<Uuid, Workflow>>,
    steps: RwLock<HashMap<Uuid, Vec<WorkflowStep>>>,
    templates: RwLock<HashMap<Uuid, WorkflowTemplate>>,
    executions: RwLock<HashMap<Uuid, WorkflowExecution>>,
    logs: RwLock<HashMap<Uuid, Vec<WorkflowStepLog>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn insert_workflow(
        &self,
        workflow: Workflow,
        steps: Vec<WorkflowStep>,
    ) -> Result<(), EngineError> {
        self.steps.write().await.insert(workflow.id, steps);
        self.workflows.write().await.insert(workflow.id, workflow);
        Ok(())
    }

    async fn workflow(&self, id: Uuid) -> Result<Workflow, EngineError> {
        self.workflows
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(EngineError::WorkflowNotFound(id))
    }

    async fn workflows(&self) -> Result<Vec<Workflow>, EngineError> {
        Ok(self.workflows.read().await.values().cloned().collect())
    }

    async fn set_workflow_status(
        &self,
        id: Uuid,
        status: WorkflowStatus,
    ) -> Result<Workflow, EngineError> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows
            .get_mut(&id)
            .ok_or(EngineError::WorkflowNotFound(id))?;
        workflow.status = status;
        Ok(workflow.clone())
    }

    async fn update_steps(&self, id: Uuid, steps: Vec<WorkflowStep>) -> Result<(), EngineError> {
        if !self.workflows.read().await.contains_key(&id) {
            return Err(EngineError::WorkflowNotFound(id));
        }
        self.steps.write().await.insert(id, steps);
        Ok(())
    }

    async fn steps(&self, workflow_id: Uuid) -> Result<Vec<WorkflowStep>, EngineError> {
        Ok(self
            .steps
            .read()
            .await
            .get(&workflow_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_trigger(&self, id: Uuid) -> Result<Workflow, EngineError> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows
            .get_mut(&id)
            .ok_or(EngineError::WorkflowNotFound(id))?;
        workflow.execution_count += 1;
        workflow.last_executed_at = Some(Utc::now());
        Ok(workflow.clone())
    }

    async fn insert_template(&self, template: WorkflowTemplate) -> Result<(), EngineError> {
        self.templates.write().await.insert(template.id, template);
        Ok(())
    }

    async fn template(&self, id: Uuid) -> Result<WorkflowTemplate, EngineError> {
        self.templates
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(EngineError::TemplateNotFound(id))
    }

    async fn insert_execution(&self, execution: WorkflowExecution) -> Result<(), EngineError> {
        self.executions
            .write()
            .await
            .insert(execution.id, execution);
        Ok(())
    }

    async fn execution(&self, id: Uuid) -> Result<WorkflowExecution, EngineError> {
        self.executions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(EngineError::ExecutionNotFound(id))
    }

    async fn finalize_execution(
        &self,
        id: Uuid,
        status: ExecutionStatus,
        error: Option<String>,
        context: Map<String, Value>,
    ) -> Result<WorkflowExecution, EngineError> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&id)
            .ok_or(EngineError::ExecutionNotFound(id))?;

        if execution.status.is_terminal() {
            return Ok(execution.clone());
        }

        execution.status = status;
        execution.completed_at = Some(Utc::now());
        execution.error = error;
        execution.context = context;
        Ok(execution.clone())
    }

    async fn request_cancel(&self, id: Uuid) -> Result<(), EngineError> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&id)
            .ok_or(EngineError::ExecutionNotFound(id))?;

        if !execution.status.is_terminal() {
            execution.cancel_requested = true;
        }
        Ok(())
    }

    async fn cancel_requested(&self, id: Uuid) -> Result<bool, EngineError> {
        self.executions
            .read()
            .await
            .get(&id)
            .map(|e| e.cancel_requested)
            .ok_or(EngineError::ExecutionNotFound(id))
    }

    async fn append_step_log(&self, log: WorkflowStepLog) -> Result<(), EngineError> {
        let executions = self.executions.read().await;
        let execution = executions
            .get(&log.execution_id)
            .ok_or(EngineError::ExecutionNotFound(log.execution_id))?;
        if execution.status.is_terminal() {
            return Err(EngineError::ExecutionFinished(log.execution_id));
        }
        drop(executions);

        self.logs
            .write()
            .await
            .entry(log.execution_id)
            .or_default()
            .push(log);
        Ok(())
    }

    async fn step_logs(&self, execution_id: Uuid) -> Result<Vec<WorkflowStepLog>, EngineError> {
        Ok(self
            .logs
            .read()
            .await
            .get(&execution_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::definition::{RetryPolicy, StepAction};
    use crate::workflow::execution::TriggerSource;
    use serde_json::json;

    fn running_execution() -> WorkflowExecution {
        WorkflowExecution::new(
            Uuid::new_v4(),
            json!({}),
            TriggerSource::manual("tests"),
            vec![],
        )
    }

    fn log_for(execution: &WorkflowExecution) -> WorkflowStepLog {
        let step = WorkflowStep {
            id: Uuid::new_v4(),
            workflow_id: execution.workflow_id,
            number: 1,
            name: "step".to_string(),
            action: StepAction::Action {
                subtype: "test/noop".to_string(),
                config: json!({}),
            },
            on_success: None,
            on_failure: None,
            retry: RetryPolicy::default(),
        };
        WorkflowStepLog::failure(execution.id, &step, 1, "boom", Utc::now())
    }

    #[tokio::test]
    async fn test_finalize_is_first_writer_wins() {
        let store = MemoryStore::new();
        let execution = running_execution();
        let id = execution.id;
        store.insert_execution(execution).await.unwrap();

        let first = store
            .finalize_execution(id, ExecutionStatus::Completed, None, Map::new())
            .await
            .unwrap();
        assert_eq!(first.status, ExecutionStatus::Completed);

        let second = store
            .finalize_execution(
                id,
                ExecutionStatus::Failed,
                Some("late".to_string()),
                Map::new(),
            )
            .await
            .unwrap();
        assert_eq!(second.status, ExecutionStatus::Completed);
        assert!(second.error.is_none());
    }

    #[tokio::test]
    async fn test_append_log_rejected_after_terminal() {
        let store = MemoryStore::new();
        let execution = running_execution();
        let id = execution.id;
        store.insert_execution(execution.clone()).await.unwrap();

        store.append_step_log(log_for(&execution)).await.unwrap();
        store
            .finalize_execution(id, ExecutionStatus::Failed, Some("x".to_string()), Map::new())
            .await
            .unwrap();

        let result = store.append_step_log(log_for(&execution)).await;
        assert!(matches!(result, Err(EngineError::ExecutionFinished(_))));
        assert_eq!(store.step_logs(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_after_terminal_is_noop() {
        let store = MemoryStore::new();
        let execution = running_execution();
        let id = execution.id;
        store.insert_execution(execution).await.unwrap();

        store
            .finalize_execution(id, ExecutionStatus::Completed, None, Map::new())
            .await
            .unwrap();
        store.request_cancel(id).await.unwrap();
        assert!(!store.cancel_requested(id).await.unwrap());
    }
}
