//! Prelude module - commonly used types for convenient import.
//!
//! Use `use vxd_core::prelude::*;` to import all essential types.

pub use crate::{
    ColorCount, Coord, DaemonError, DaemonPaths, DaemonResult, Engine, InMemoryEngine, LastError,
    Layer, ProjectInfo, Rgba, ScriptEngine,
};
