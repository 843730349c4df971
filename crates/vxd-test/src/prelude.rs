//! Prelude module - commonly used test helpers for convenient import.
//!
//! Use `use vxd_test::prelude::*;` to import all essential helpers.

pub use crate::fixtures::{test_config, test_daemon_paths, test_rgba};
pub use crate::mocks::{FailingEngine, FailingScriptEngine, MockEngine, MockScriptEngine};
