//! Scripted adapter for tests
//!
//! Outcomes are queued per subtype; every call is recorded. When a subtype's
//! queue is empty the adapter succeeds with an empty patch, so tests only
//! script the interesting failures.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::{ActionAdapter, AdapterError};
use crate::workflow::context::{ContextPatch, ExecutionContext};

/// One observed adapter call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub subtype: String,
    pub config: Value,
    pub context: Value,
}

#[derive(Default)]
pub struct ScriptedAdapter {
    outcomes: Mutex<HashMap<String, VecDeque<Result<ContextPatch, String>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an explicit outcome for the next call with this subtype
    pub fn push_outcome(&self, subtype: &str, outcome: Result<ContextPatch, String>) {
        self.outcomes
            .lock()
            .unwrap()
            .entry(subtype.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Fail the next call with this subtype
    pub fn fail_once(&self, subtype: &str, error: &str) {
        self.push_outcome(subtype, Err(error.to_string()));
    }

    /// Fail the next `n` calls with this subtype
    pub fn fail_times(&self, subtype: &str, n: usize, error: &str) {
        for _ in 0..n {
            self.fail_once(subtype, error);
        }
    }

    /// Succeed the next call with this subtype, returning the given patch
    pub fn succeed_with(&self, subtype: &str, patch: ContextPatch) {
        self.push_outcome(subtype, Ok(patch));
    }

    /// All calls observed so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// How many calls were made with this subtype
    pub fn call_count(&self, subtype: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.subtype == subtype)
            .count()
    }
}

#[async_trait]
impl ActionAdapter for ScriptedAdapter {
    async fn execute(
        &self,
        subtype: &str,
        config: &Value,
        context: &ExecutionContext,
    ) -> Result<ContextPatch, AdapterError> {
        self.calls.lock().unwrap().push(RecordedCall {
            subtype: subtype.to_string(),
            config: config.clone(),
            context: context.to_value(),
        });

        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .get_mut(subtype)
            .and_then(VecDeque::pop_front);

        match outcome {
            Some(Ok(patch)) => Ok(patch),
            Some(Err(error)) => Err(AdapterError::Failed(error)),
            None => Ok(ContextPatch::new()),
        }
    }
}
