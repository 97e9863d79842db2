//! Trigger dispatch
//!
//! Turns a trigger into a running execution: checks the trigger policy
//! against the workflow status, bumps the execution counter, snapshots the
//! step graph into a new execution record, and spawns the controller on it.
//! Each trigger gets its own task; concurrent triggers of the same workflow
//! produce independent executions.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::engine::controller::ExecutionController;
use crate::engine::error::EngineError;
use crate::engine::store::WorkflowStore;
use crate::workflow::definition::{TriggerKind, Workflow, WorkflowStatus};
use crate::workflow::execution::{TriggerSource, WorkflowExecution};

/// Starts executions and tracks their tasks
pub struct TriggerDispatcher {
    store: Arc<dyn WorkflowStore>,
    controller: Arc<ExecutionController>,
    handles: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl TriggerDispatcher {
    pub fn new(store: Arc<dyn WorkflowStore>, controller: Arc<ExecutionController>) -> Self {
        Self {
            store,
            controller,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Start an execution for a trigger. Returns the execution id as soon as
    /// the record is persisted and the run is spawned; the run itself
    /// proceeds in the background.
    #[instrument(skip(self, context), fields(workflow_id = %workflow_id, kind = ?source.kind))]
    pub async fn trigger(
        &self,
        workflow_id: Uuid,
        context: Value,
        source: TriggerSource,
    ) -> Result<Uuid, EngineError> {
        let workflow = self.store.workflow(workflow_id).await?;
        check_trigger_policy(&workflow, &source)?;

        self.store.record_trigger(workflow_id).await?;
        let steps = self.store.steps(workflow_id).await?;

        let execution = WorkflowExecution::new(workflow_id, context, source, steps);
        let execution_id = execution.id;
        self.store.insert_execution(execution).await?;

        info!(%execution_id, "execution started");

        let controller = Arc::clone(&self.controller);
        let handle = tokio::spawn(async move {
            controller.run(execution_id).await;
        });

        let mut handles = self.handles.lock().await;
        handles.retain(|_, h| !h.is_finished());
        handles.insert(execution_id, handle);

        Ok(execution_id)
    }

    pub async fn trigger_manual(
        &self,
        workflow_id: Uuid,
        context: Value,
        actor: &str,
    ) -> Result<Uuid, EngineError> {
        self.trigger(workflow_id, context, TriggerSource::manual(actor))
            .await
    }

    pub async fn trigger_scheduled(
        &self,
        workflow_id: Uuid,
        context: Value,
        label: &str,
    ) -> Result<Uuid, EngineError> {
        self.trigger(workflow_id, context, TriggerSource::scheduled(label))
            .await
    }

    pub async fn trigger_event(
        &self,
        workflow_id: Uuid,
        context: Value,
        label: &str,
    ) -> Result<Uuid, EngineError> {
        self.trigger(workflow_id, context, TriggerSource::event(label))
            .await
    }

    pub async fn trigger_condition(
        &self,
        workflow_id: Uuid,
        context: Value,
        label: &str,
    ) -> Result<Uuid, EngineError> {
        self.trigger(workflow_id, context, TriggerSource::condition(label))
            .await
    }

    /// Request cancellation of a running execution. The controller observes
    /// the flag at its next resume point; already-terminal runs are left
    /// alone.
    pub async fn cancel(&self, execution_id: Uuid) -> Result<(), EngineError> {
        self.store.request_cancel(execution_id).await
    }

    /// Wait for an execution's task to finish and return the terminal record
    pub async fn await_terminal(
        &self,
        execution_id: Uuid,
    ) -> Result<WorkflowExecution, EngineError> {
        let handle = self.handles.lock().await.remove(&execution_id);
        if let Some(handle) = handle {
            if handle.await.is_err() {
                warn!(%execution_id, "execution task panicked");
            }
        }
        self.store.execution(execution_id).await
    }
}

/// Whether a trigger source may start this workflow.
///
/// Manual triggers are allowed for any non-archived workflow (so drafts can
/// be exercised before activation). Automated triggers require an active
/// workflow whose configured trigger kind matches the source.
fn check_trigger_policy(workflow: &Workflow, source: &TriggerSource) -> Result<(), EngineError> {
    if workflow.status == WorkflowStatus::Archived {
        return Err(EngineError::WorkflowArchived(workflow.id));
    }

    if source.kind == TriggerKind::Manual {
        return Ok(());
    }

    if workflow.status != WorkflowStatus::Active {
        return Err(EngineError::TriggerNotAllowed {
            workflow: workflow.id,
            reason: format!("workflow is not active (status: {:?})", workflow.status),
        });
    }

    if workflow.trigger != source.kind {
        return Err(EngineError::TriggerNotAllowed {
            workflow: workflow.id,
            reason: format!(
                "workflow is configured for {:?} triggers, got {:?}",
                workflow.trigger, source.kind
            ),
        });
    }

    Ok(())
}
