//! Utility Module
//!
//! - [`WorkQueue`]: fixed-size FIFO worker pool
//! - [`ConsoleLog`]: in-memory log sink shown by the debug console
//! - [`LogSink`]: where user-visible build failures are reported

pub mod console;
pub mod work_queue;

pub use console::{ConsoleLog, LogCrateSink, LogSink};
pub use work_queue::WorkQueue;
