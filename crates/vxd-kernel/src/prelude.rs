//! Prelude module - commonly used types for convenient import.
//!
//! Use `use vxd_kernel::prelude::*;` to import all essential types.

pub use crate::frame::{Frame, FrameHeader, HEADER_LEN, read_frame, write_frame};
pub use crate::socket::bind_listener;
