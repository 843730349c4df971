#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

//! Low-level Unix domain socket transport primitives for the voxel daemon.
//!
//! This crate knows how to bind a listening socket and how to read/write
//! length-prefixed frames on it. It has no knowledge of JSON-RPC, MCP, or
//! the method registry — those live in `vxd-daemon`, built on top of this
//! one.

pub mod prelude;

pub mod frame;
pub mod socket;

pub use frame::{Frame, FrameHeader, HEADER_LEN, read_frame, write_frame};
pub use socket::bind_listener;
