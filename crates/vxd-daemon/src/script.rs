//! The embedded script runtime (§4.4, `execute_script`).
//!
//! Scripts are small JSON programs: an array of `{method, params}` steps
//! dispatched back through the same [`vxd_core::Engine`] the RPC layer
//! uses, with each step's result collected into a JSON array. This keeps
//! the runtime itself dependency-free while still giving scripts access
//! to every engine operation, and is why the script pool exists (§4.5):
//! the runtime is a single, non-reentrant executor serialized by its own
//! dedicated worker pool.

use std::sync::Arc;

use serde_json::Value;

use vxd_core::{DaemonError, DaemonResult, Engine, ScriptEngine};

use crate::registry;

/// One script step: call `method` with `params` against the engine.
#[derive(serde::Deserialize)]
struct Step {
    method: String,
    #[serde(default = "Value::default")]
    params: Value,
}

/// Executes scripts by dispatching each step through the shared method
/// registry (§C4), reusing the same lock/engine wiring request handling
/// does.
pub struct StepScriptEngine {
    engine: Arc<dyn Engine>,
}

impl StepScriptEngine {
    /// Build a runtime dispatching against `engine`.
    #[must_use]
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    fn run_steps(&self, code: &str, attribution: &str) -> DaemonResult<Value> {
        let steps: Vec<Step> = serde_json::from_str(code)
            .map_err(|e| DaemonError::InvalidParams(format!("{attribution}: malformed script: {e}")))?;

        let mut results = Vec::with_capacity(steps.len());
        for step in steps {
            let result = registry::dispatch_engine_method(self.engine.as_ref(), &step.method, &step.params)
                .map_err(|e| DaemonError::Engine(format!("{attribution}: step {}: {e}", step.method)))?;
            results.push(result);
        }
        Ok(Value::Array(results))
    }
}

impl ScriptEngine for StepScriptEngine {
    fn run_from_string(&self, code: &str, name: &str) -> DaemonResult<Value> {
        self.run_steps(code, name)
    }

    fn run_from_file(&self, path: &str) -> DaemonResult<Value> {
        let code = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::InvalidParams(format!("{path}: {e}")))?;
        self.run_steps(&code, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vxd_core::InMemoryEngine;

    #[test]
    fn runs_a_single_step_script() {
        let engine = Arc::new(InMemoryEngine::new());
        let runtime = StepScriptEngine::new(engine);
        let code = r#"[{"method": "create_project", "params": {"name": "s", "width": 4, "height": 4, "depth": 4}}]"#;
        let result = runtime.run_from_string(code, "test").unwrap();
        assert!(result.is_array());
    }

    #[test]
    fn rejects_malformed_script() {
        let engine = Arc::new(InMemoryEngine::new());
        let runtime = StepScriptEngine::new(engine);
        let err = runtime.run_from_string("not json", "test");
        assert!(matches!(err, Err(DaemonError::InvalidParams(_))));
    }

    #[test]
    fn propagates_a_failing_step() {
        let engine = Arc::new(InMemoryEngine::new());
        let runtime = StepScriptEngine::new(engine);
        let code = r#"[{"method": "get_voxel", "params": {"x": 0, "y": 0, "z": 0}}]"#;
        let err = runtime.run_from_string(code, "test");
        assert!(err.is_err());
    }
}
