//! Sink for user-facing report lines.
//!
//! Components receive a `Reporter` when they are built instead of writing to
//! a process-wide logger. The binary forwards lines to `tracing`; tests keep
//! them in memory.

use std::sync::{Arc, Mutex};

pub use tracing::Level;

/// Receives human-readable report lines.
pub trait Reporter: Send + Sync {
    fn emit(&self, level: Level, line: &str);
}

/// Shared handle passed to every component of a run.
pub type SharedReporter = Arc<dyn Reporter>;

/// Reporter that keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All lines emitted so far.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Lines emitted at exactly `level`.
    pub fn lines_at(&self, level: Level) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line)
            .collect()
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|(_, line)| line.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn emit(&self, level: Level, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, line.to_string()));
        }
    }
}
