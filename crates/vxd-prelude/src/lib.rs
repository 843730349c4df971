//! Unified prelude for the voxel daemon runtime.
//!
//! A single import that brings in the commonly used types from across the
//! workspace: core error/engine types, configuration, and telemetry. The
//! daemon's own C1-C10 types live in `vxd_daemon` and are re-exported here
//! too so a consumer crate only ever needs one `use`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vxd_prelude::*;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub use vxd_core::prelude::*;
pub use vxd_config::{Config, ProtocolMode, RenderConfig, ScriptPoolConfig, WorkerPoolConfig};
pub use vxd_daemon::prelude::*;
pub use vxd_telemetry::prelude::*;
