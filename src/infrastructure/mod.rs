//! Infrastructure Layer
//!
//! Process-level plumbing around the scheduler.

pub mod shutdown;

pub use shutdown::shutdown_signal;
