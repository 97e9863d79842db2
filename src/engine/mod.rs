//! Workflow execution engine
//!
//! Runtime half of the crate:
//! - `service` - `WorkflowEngine`, the facade applications talk to
//! - `dispatcher` - trigger policy and execution spawning
//! - `controller` - the step walker (branching, retries, cancellation)
//! - `graph` - successor/entry lookups over a step snapshot
//! - `store` - the persistence trait and the in-memory implementation
//! - `error` - `EngineError`, the error type of every public operation

pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod graph;
pub mod service;
pub mod store;

pub use controller::{ExecutionController, CANCELLATION_ERROR};
pub use dispatcher::TriggerDispatcher;
pub use error::EngineError;
pub use graph::{GraphError, StepGraph};
pub use service::WorkflowEngine;
pub use store::{MemoryStore, WorkflowStore};
