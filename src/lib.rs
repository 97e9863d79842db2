//! # hrflow
//!
//! A workflow automation engine for HR processes: persisted step graphs with
//! typed step kinds, success/failure branching, bounded retries, append-only
//! step logs, and asynchronous execution.
//!
//! ## Features
//!
//! - **Step graphs** - each step names its on-success and on-failure
//!   successor; branches end by omission
//! - **Typed steps** - adapter-backed actions, notifications, integrations,
//!   approvals, plus in-engine condition and delay steps
//! - **Bounded retries** - per-step retry budget with a fixed backoff, every
//!   attempt logged
//! - **Snapshot isolation** - an execution runs against the step graph as it
//!   existed at trigger time
//! - **Expression syntax** - `${{ context.* }}` interpolation in step
//!   configuration
//! - **Templates** - reusable blueprints instantiated into fresh workflows
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hrflow::adapter::{AdapterRegistry, NoopAdapter};
//! use hrflow::engine::WorkflowEngine;
//! use hrflow::workflow::WorkflowDefinition;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let yaml = r#"
//! name: welcome
//! domain: onboarding
//! trigger: manual
//! steps:
//!   - name: send welcome mail
//!     action:
//!       kind: notification
//!       subtype: mail/send
//!       config:
//!         to: "${{ context.employee.email }}"
//! "#;
//!
//!     let definition: WorkflowDefinition = serde_yaml::from_str(yaml)?;
//!     let registry = AdapterRegistry::new().with_fallback(Arc::new(NoopAdapter));
//!     let engine = WorkflowEngine::in_memory(registry);
//!
//!     let workflow = engine.create_workflow(&definition, "hr-admin").await?;
//!     let execution_id = engine
//!         .trigger_manual(
//!             workflow.id,
//!             json!({ "employee": { "email": "dana@example.com" } }),
//!             "hr-admin",
//!         )
//!         .await?;
//!
//!     let execution = engine.await_terminal(execution_id).await?;
//!     println!("finished: {:?}", execution.status);
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod engine;
pub mod workflow;

// Re-export main types
pub use adapter::{ActionAdapter, AdapterError, AdapterRegistry, NoopAdapter, ScriptedAdapter};
pub use engine::{
    EngineError, ExecutionController, GraphError, MemoryStore, StepGraph, TriggerDispatcher,
    WorkflowEngine, WorkflowStore,
};
pub use workflow::{
    Condition, ConditionOp, ContextPatch, DefinitionError, DefinitionLoader, ExecutionContext,
    ExecutionStatus, ExpressionError, LoadError, RetryPolicy, StepAction, StepDefinition,
    StepOutcome, TemplateOverrides, TriggerKind, TriggerSource, Workflow, WorkflowDefinition,
    WorkflowDomain, WorkflowExecution, WorkflowStatus, WorkflowStep, WorkflowStepLog,
    WorkflowTemplate,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapter::{ActionAdapter, AdapterError, AdapterRegistry, NoopAdapter};
    pub use crate::engine::{EngineError, MemoryStore, WorkflowEngine, WorkflowStore};
    pub use crate::workflow::{
        Condition, ConditionOp, ContextPatch, ExecutionContext, ExecutionStatus, StepAction,
        StepDefinition, StepOutcome, TriggerKind, TriggerSource, Workflow, WorkflowDefinition,
        WorkflowDomain, WorkflowExecution, WorkflowStatus, WorkflowStep, WorkflowStepLog,
        WorkflowTemplate,
    };
}
