//! Engine facade
//!
//! `WorkflowEngine` is the single entry point applications use: it owns the
//! store, the adapter registry (through the controller), and the trigger
//! dispatcher, and exposes the workflow, template, and execution operations.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::adapter::AdapterRegistry;
use crate::engine::controller::ExecutionController;
use crate::engine::dispatcher::TriggerDispatcher;
use crate::engine::error::EngineError;
use crate::engine::store::{MemoryStore, WorkflowStore};
use crate::workflow::definition::{
    StepDefinition, Workflow, WorkflowDefinition, WorkflowStatus, WorkflowStep,
};
use crate::workflow::execution::{TriggerSource, WorkflowExecution, WorkflowStepLog};
use crate::workflow::template::{TemplateOverrides, WorkflowTemplate};

/// The workflow automation engine
pub struct WorkflowEngine {
    store: Arc<dyn WorkflowStore>,
    dispatcher: TriggerDispatcher,
}

impl WorkflowEngine {
    /// Build an engine over an existing store
    pub fn new(store: Arc<dyn WorkflowStore>, adapters: AdapterRegistry) -> Self {
        let controller = Arc::new(ExecutionController::new(Arc::clone(&store), adapters));
        let dispatcher = TriggerDispatcher::new(Arc::clone(&store), controller);
        Self { store, dispatcher }
    }

    /// Build an engine over a fresh in-memory store
    pub fn in_memory(adapters: AdapterRegistry) -> Self {
        Self::new(Arc::new(MemoryStore::new()), adapters)
    }

    // ========================================================================
    // Workflows
    // ========================================================================

    /// Validate and persist an authored definition. The workflow starts in
    /// draft status.
    #[instrument(skip(self, definition), fields(name = %definition.name))]
    pub async fn create_workflow(
        &self,
        definition: &WorkflowDefinition,
        created_by: &str,
    ) -> Result<Workflow, EngineError> {
        let (workflow, steps) = definition.materialize(created_by)?;
        info!(workflow_id = %workflow.id, steps = steps.len(), "workflow created");
        self.store.insert_workflow(workflow.clone(), steps).await?;
        Ok(workflow)
    }

    pub async fn workflow(&self, id: Uuid) -> Result<Workflow, EngineError> {
        self.store.workflow(id).await
    }

    pub async fn workflows(&self) -> Result<Vec<Workflow>, EngineError> {
        self.store.workflows().await
    }

    pub async fn steps(&self, workflow_id: Uuid) -> Result<Vec<WorkflowStep>, EngineError> {
        self.store.steps(workflow_id).await
    }

    /// Change a workflow's lifecycle status. Archived is terminal: archived
    /// workflows cannot move to any other status.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: WorkflowStatus,
    ) -> Result<Workflow, EngineError> {
        let workflow = self.store.workflow(id).await?;
        if workflow.status == WorkflowStatus::Archived {
            return Err(EngineError::WorkflowArchived(id));
        }
        self.store.set_workflow_status(id, status).await
    }

    /// Replace a workflow's step graph with a new authored one. In-flight
    /// executions keep the snapshot they started with.
    pub async fn replace_steps(
        &self,
        workflow_id: Uuid,
        steps: Vec<StepDefinition>,
    ) -> Result<Vec<WorkflowStep>, EngineError> {
        let workflow = self.store.workflow(workflow_id).await?;
        if workflow.status == WorkflowStatus::Archived {
            return Err(EngineError::WorkflowArchived(workflow_id));
        }

        let definition = WorkflowDefinition {
            name: workflow.name.clone(),
            description: workflow.description.clone(),
            domain: workflow.domain,
            trigger: workflow.trigger,
            trigger_config: workflow.trigger_config.clone(),
            steps,
        };
        let (_, mut steps) = definition.materialize(&workflow.created_by)?;
        for step in &mut steps {
            step.workflow_id = workflow_id;
        }

        self.store.update_steps(workflow_id, steps.clone()).await?;
        Ok(steps)
    }

    // ========================================================================
    // Templates
    // ========================================================================

    /// Persist a reusable blueprint. The embedded definition is validated up
    /// front so instantiation cannot fail structurally later.
    pub async fn create_template(
        &self,
        name: &str,
        description: &str,
        definition: WorkflowDefinition,
    ) -> Result<WorkflowTemplate, EngineError> {
        definition.validate()?;
        let template = WorkflowTemplate::new(name, description, definition);
        self.store.insert_template(template.clone()).await?;
        Ok(template)
    }

    pub async fn template(&self, id: Uuid) -> Result<WorkflowTemplate, EngineError> {
        self.store.template(id).await
    }

    /// Create a new workflow from a template, with overrides applied
    pub async fn instantiate_template(
        &self,
        template_id: Uuid,
        overrides: TemplateOverrides,
        created_by: &str,
    ) -> Result<Workflow, EngineError> {
        let template = self.store.template(template_id).await?;
        let definition = template.apply(overrides);
        self.create_workflow(&definition, created_by).await
    }

    // ========================================================================
    // Triggers and executions
    // ========================================================================

    pub async fn trigger(
        &self,
        workflow_id: Uuid,
        context: Value,
        source: TriggerSource,
    ) -> Result<Uuid, EngineError> {
        self.dispatcher.trigger(workflow_id, context, source).await
    }

    pub async fn trigger_manual(
        &self,
        workflow_id: Uuid,
        context: Value,
        actor: &str,
    ) -> Result<Uuid, EngineError> {
        self.dispatcher
            .trigger_manual(workflow_id, context, actor)
            .await
    }

    pub async fn trigger_scheduled(
        &self,
        workflow_id: Uuid,
        context: Value,
        label: &str,
    ) -> Result<Uuid, EngineError> {
        self.dispatcher
            .trigger_scheduled(workflow_id, context, label)
            .await
    }

    pub async fn trigger_event(
        &self,
        workflow_id: Uuid,
        context: Value,
        label: &str,
    ) -> Result<Uuid, EngineError> {
        self.dispatcher
            .trigger_event(workflow_id, context, label)
            .await
    }

    pub async fn trigger_condition(
        &self,
        workflow_id: Uuid,
        context: Value,
        label: &str,
    ) -> Result<Uuid, EngineError> {
        self.dispatcher
            .trigger_condition(workflow_id, context, label)
            .await
    }

    pub async fn execution(&self, id: Uuid) -> Result<WorkflowExecution, EngineError> {
        self.store.execution(id).await
    }

    pub async fn step_logs(&self, execution_id: Uuid) -> Result<Vec<WorkflowStepLog>, EngineError> {
        self.store.step_logs(execution_id).await
    }

    /// Request cancellation of a running execution
    pub async fn cancel(&self, execution_id: Uuid) -> Result<(), EngineError> {
        self.dispatcher.cancel(execution_id).await
    }

    /// Block until the execution's task finishes and return the terminal
    /// record
    pub async fn await_terminal(
        &self,
        execution_id: Uuid,
    ) -> Result<WorkflowExecution, EngineError> {
        self.dispatcher.await_terminal(execution_id).await
    }
}
