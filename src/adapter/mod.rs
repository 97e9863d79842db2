//! Action adapter boundary
//!
//! Adapters perform the actual side effect of adapter-backed steps (send
//! mail, create a task, request an approval, call an integration). The
//! engine is adapter-agnostic: it resolves an adapter from the registry by
//! subtype and treats any error uniformly as a step failure.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::workflow::context::{ContextPatch, ExecutionContext};

pub mod noop;
pub mod scripted;

pub use noop::NoopAdapter;
pub use scripted::{RecordedCall, ScriptedAdapter};

/// Errors an adapter can report. All variants are folded into the failing
/// step's retry/branch path; none of them aborts the controller.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("action failed: {0}")]
    Failed(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("no adapter registered for subtype: {0}")]
    NoAdapter(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// The one boundary the engine depends on for side effects.
///
/// `subtype` is the step's free-form action subtype (e.g. `mail/send`),
/// `config` the step configuration after expression interpolation. On
/// success the adapter returns a context patch merged into the execution
/// context; approval adapters resolve the approval before returning.
#[async_trait]
pub trait ActionAdapter: Send + Sync {
    async fn execute(
        &self,
        subtype: &str,
        config: &Value,
        context: &ExecutionContext,
    ) -> Result<ContextPatch, AdapterError>;
}

/// The category of a subtype: everything before the first `/`
/// (`mail/send-welcome` belongs to `mail`).
pub fn subtype_category(subtype: &str) -> &str {
    subtype.split('/').next().unwrap_or(subtype)
}

/// Explicit adapter registry, injected into the execution controller at
/// construction time. Keyed by subtype category, with an optional fallback
/// for anything unmatched.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn ActionAdapter>>,
    fallback: Option<Arc<dyn ActionAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter for a subtype category (builder form)
    pub fn with(mut self, category: &str, adapter: Arc<dyn ActionAdapter>) -> Self {
        self.adapters.insert(category.to_string(), adapter);
        self
    }

    /// Set the adapter used when no category matches
    pub fn with_fallback(mut self, adapter: Arc<dyn ActionAdapter>) -> Self {
        self.fallback = Some(adapter);
        self
    }

    pub fn register(&mut self, category: &str, adapter: Arc<dyn ActionAdapter>) {
        self.adapters.insert(category.to_string(), adapter);
    }

    /// Resolve the adapter for a full subtype string
    pub fn resolve(&self, subtype: &str) -> Option<Arc<dyn ActionAdapter>> {
        self.adapters
            .get(subtype_category(subtype))
            .or(self.fallback.as_ref())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtype_category() {
        assert_eq!(subtype_category("mail/send"), "mail");
        assert_eq!(subtype_category("calendar/meeting/create"), "calendar");
        assert_eq!(subtype_category("bare"), "bare");
    }

    #[test]
    fn test_resolve_prefers_category_over_fallback() {
        let mail: Arc<dyn ActionAdapter> = Arc::new(NoopAdapter);
        let fallback: Arc<dyn ActionAdapter> = Arc::new(NoopAdapter);

        let registry = AdapterRegistry::new()
            .with("mail", Arc::clone(&mail))
            .with_fallback(Arc::clone(&fallback));

        assert!(Arc::ptr_eq(&registry.resolve("mail/send").unwrap(), &mail));
        assert!(Arc::ptr_eq(
            &registry.resolve("tasks/create").unwrap(),
            &fallback
        ));
    }

    #[test]
    fn test_resolve_without_fallback() {
        let registry = AdapterRegistry::new();
        assert!(registry.resolve("mail/send").is_none());
    }
}
