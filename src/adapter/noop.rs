//! No-op adapter
//!
//! Logs the call and succeeds. Used by the CLI and demos where no real
//! mail/calendar/task backends are wired up.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{ActionAdapter, AdapterError};
use crate::workflow::context::{ContextPatch, ExecutionContext};

/// Adapter that performs no side effect.
///
/// If the step configuration carries a `patch` object, it is returned as the
/// context patch, which lets YAML-only demos thread values between steps.
pub struct NoopAdapter;

#[async_trait]
impl ActionAdapter for NoopAdapter {
    async fn execute(
        &self,
        subtype: &str,
        config: &Value,
        _context: &ExecutionContext,
    ) -> Result<ContextPatch, AdapterError> {
        info!(subtype, "executing action (noop)");

        match config.get("patch").and_then(Value::as_object) {
            Some(patch) => Ok(patch.clone()),
            None => Ok(ContextPatch::new()),
        }
    }
}
