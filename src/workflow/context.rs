//! Execution context for workflow runs
//!
//! The context is the JSON document an execution carries from step to step.
//! Triggers seed it, adapters extend it through context patches, condition
//! steps and `${{ context.* }}` expressions read it.

use serde_json::{Map, Value};

/// A set of top-level keys an adapter wants merged into the context.
pub type ContextPatch = Map<String, Value>;

/// Runtime context for one workflow execution
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    values: Map<String, Value>,
}

impl ExecutionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from an arbitrary JSON value.
    ///
    /// Objects become the context as-is; any other value (including null)
    /// is stored under the `input` key so it stays addressable.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(values) => Self { values },
            Value::Null => Self::new(),
            other => {
                let mut values = Map::new();
                values.insert("input".to_string(), other);
                Self { values }
            }
        }
    }

    /// Build a context directly from a JSON object map
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Look up a value by dot-separated path (e.g. `employee.email`)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.values.get(parts.next()?)?;

        for part in parts {
            current = current.as_object()?.get(part)?;
        }

        Some(current)
    }

    /// Set a top-level key
    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    /// Merge an adapter's context patch. Top-level keys overwrite.
    pub fn merge_patch(&mut self, patch: ContextPatch) {
        for (key, value) in patch {
            self.values.insert(key, value);
        }
    }

    /// View the underlying object map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Consume the context, returning the object map
    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    /// Render the context as a JSON value (for logs and recorded calls)
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}
