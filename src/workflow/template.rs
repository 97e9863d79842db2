//! Workflow templates
//!
//! A template is a serialized (workflow + steps) blueprint, read-only once
//! defined. Instantiation applies optional overrides and materializes a
//! fresh workflow with a topologically identical step graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::definition::{TriggerKind, WorkflowDefinition};

/// A reusable workflow blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: Uuid,
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub definition: WorkflowDefinition,
    pub created_at: DateTime<Utc>,
}

impl WorkflowTemplate {
    pub fn new(name: &str, description: &str, definition: WorkflowDefinition) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            definition,
            created_at: Utc::now(),
        }
    }

    /// Produce the definition to instantiate, with overrides applied.
    /// The step graph itself is never overridden.
    pub fn apply(&self, overrides: TemplateOverrides) -> WorkflowDefinition {
        let mut definition = self.definition.clone();

        if let Some(name) = overrides.name {
            definition.name = name;
        }
        if let Some(description) = overrides.description {
            definition.description = description;
        }
        if let Some(trigger) = overrides.trigger {
            definition.trigger = trigger;
        }
        if let Some(trigger_config) = overrides.trigger_config {
            definition.trigger_config = trigger_config;
        }

        definition
    }
}

/// Fields a caller may replace when instantiating from a template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateOverrides {
    pub name: Option<String>,
    pub description: Option<String>,
    pub trigger: Option<TriggerKind>,
    pub trigger_config: Option<Value>,
}
