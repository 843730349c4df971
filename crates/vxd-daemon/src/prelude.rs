//! Prelude module - commonly used daemon types for convenient import.
//!
//! Use `use vxd_daemon::prelude::*;` to import all essential types.

pub use crate::codec::{Request, Response};
pub use crate::context::DaemonContext;
pub use crate::lifecycle::{Lifecycle, SignalFlags, State};
pub use crate::registry::dispatch_engine_method;
pub use crate::router::Protocol;
