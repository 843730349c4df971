//! Foundation types and traits for the voxel daemon runtime.
//!
//! This crate provides:
//! - The daemon-wide error taxonomy and last-error slot ([`error`])
//! - Filesystem locations for the PID file, socket, and render cache ([`dirs`])
//! - The `Engine`/`ScriptEngine` collaborator traits plus a reference
//!   in-process implementation ([`engine`])

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod dirs;
pub mod engine;
pub mod error;

pub use dirs::DaemonPaths;
pub use engine::{ColorCount, Coord, Engine, InMemoryEngine, Layer, ProjectInfo, Rgba, ScriptEngine};
pub use error::{DaemonError, DaemonResult, LastError};
