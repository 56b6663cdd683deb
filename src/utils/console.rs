//! Log Sinks
//!
//! Build failures are reported through an injected [`LogSink`] rather than a
//! process-wide console pointer. The render loop owns the sink (usually a
//! [`ConsoleLog`] shown in an overlay) and hands an `Arc` to the build cache.

use parking_lot::Mutex;

/// Best-effort message sink. Implementations must not fail.
pub trait LogSink: Send + Sync {
    fn add_log(&self, message: &str);
}

/// Thread-safe in-memory line buffer, typically drawn by a debug console.
#[derive(Debug, Default)]
pub struct ConsoleLog {
    items: Mutex<Vec<String>>,
}

impl ConsoleLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line added so far.
    #[must_use]
    pub fn items(&self) -> Vec<String> {
        self.items.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }
}

impl LogSink for ConsoleLog {
    fn add_log(&self, message: &str) {
        self.items.lock().push(message.to_owned());
    }
}

/// Forwards every message to `log::error!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn add_log(&self, message: &str) {
        log::error!("{message}");
    }
}
