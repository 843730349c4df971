//! Shared test utilities for the voxel daemon runtime.
//!
//! This crate provides fixtures and mock collaborators that can be used
//! across the workspace as a dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! vxd-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! #[cfg(test)]
//! mod tests {
//!     use vxd_test::{MockEngine, test_config};
//!
//!     #[test]
//!     fn dispatch_uses_the_engine() {
//!         let engine = MockEngine::new();
//!         let config = test_config();
//!         // ...
//!     }
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
