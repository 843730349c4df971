//! The voxel daemon: wire codec, protocol router, method registry,
//! worker pools, project lock, render artifact manager, and the
//! signal-driven lifecycle controller that ties them together.
//!
//! # Architecture
//!
//! ```text
//! vxd-daemon
//! ├── codec       (C1)  JSON-RPC 2.0 parse/serialize
//! ├── mcp              MCP tool-call envelope
//! ├── router      (C3)  protocol auto-detection
//! ├── registry    (C4)  method table & dispatch
//! ├── workers     (C5)  bounded worker pools
//! ├── lock        (C6)  process-wide project lock
//! ├── render      (C7)  render artifact manager
//! ├── lifecycle   (C8)  signals & state machine
//! ├── daemonize   (C9)  fork/detach/pid-file/privilege-drop
//! ├── script            embedded script runtime
//! ├── context           wires the above into one `DaemonContext`
//! └── server      (C2)  the socket accept loop
//! ```
//!
//! `vxd-core` supplies the `Engine`/`ScriptEngine` capability traits and
//! the error taxonomy (C10); `vxd-kernel` supplies the raw framed-socket
//! transport this crate's `server` module drives.
//!
//! Unsafe code is confined to [`daemonize`], which needs raw `fork()`;
//! every other module is safe, so the crate-level lint only warns
//! rather than denies and `daemonize` carries the sole exception.

#![warn(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod codec;
pub mod color;
pub mod context;
#[allow(unsafe_code)]
pub mod daemonize;
pub mod lifecycle;
pub mod lock;
pub mod mcp;
pub mod prelude;
pub mod registry;
pub mod render;
pub mod router;
pub mod script;
pub mod server;
pub mod workers;

pub use context::DaemonContext;
pub use lifecycle::{Lifecycle, SignalFlags, State};
