use std::sync::Arc;

use serde_json::json;

use hrflow::adapter::{AdapterRegistry, ScriptedAdapter};
use hrflow::engine::WorkflowEngine;
use hrflow::workflow::{
    RetryPolicy, StepAction, StepDefinition, WorkflowDefinition, WorkflowDomain,
};

/// Engine whose every adapter-backed step is served by one scripted adapter
pub fn scripted_engine() -> (WorkflowEngine, Arc<ScriptedAdapter>) {
    let adapter = Arc::new(ScriptedAdapter::new());
    let registry = AdapterRegistry::new().with_fallback(adapter.clone());
    (WorkflowEngine::in_memory(registry), adapter)
}

/// Engine with an empty adapter registry
#[allow(dead_code)]
pub fn bare_engine() -> WorkflowEngine {
    WorkflowEngine::in_memory(AdapterRegistry::new())
}

pub fn definition(name: &str, steps: Vec<StepDefinition>) -> WorkflowDefinition {
    WorkflowDefinition {
        name: name.to_string(),
        description: String::new(),
        domain: WorkflowDomain::Custom,
        trigger: hrflow::workflow::TriggerKind::Manual,
        trigger_config: json!({}),
        steps,
    }
}

pub fn action_step(name: &str, subtype: &str) -> StepDefinition {
    StepDefinition {
        name: name.to_string(),
        number: 0,
        action: StepAction::Action {
            subtype: subtype.to_string(),
            config: json!({}),
        },
        on_success: None,
        on_failure: None,
        retry: RetryPolicy::default(),
    }
}

/// Link each step's success edge to the next one in the list
#[allow(dead_code)]
pub fn chain(mut steps: Vec<StepDefinition>) -> Vec<StepDefinition> {
    let names: Vec<String> = steps.iter().map(|s| s.name.clone()).collect();
    for (i, step) in steps.iter_mut().enumerate() {
        if i + 1 < names.len() {
            step.on_success = Some(names[i + 1].clone());
        }
    }
    steps
}

/// Retry policy with a short backoff so tests stay fast
#[allow(dead_code)]
pub fn quick_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        attempts,
        delay_ms: 10,
    }
}
