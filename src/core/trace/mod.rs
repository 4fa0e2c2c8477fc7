//! Lock event tracing for interlock
//!
//! Records handle lifecycle and lock acquisition events as JSON lines,
//! one object per line, written by a background thread so lock paths
//! never block on file I/O. Disabled by default; [`init_trace`] turns it
//! on for the whole process.

mod event_log;

pub use event_log::{emit, init_trace, is_trace_enabled};
