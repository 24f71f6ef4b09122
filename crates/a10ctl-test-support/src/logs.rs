//! Capturing log sink for assertions on operator output.

use std::sync::{Mutex, PoisonError};

use a10ctl_telemetry::{LogLevel, LogSink};

/// Sink that records every emitted line.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded line, in emission order.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, line)| line).collect()
    }

    /// Lines recorded at `level`.
    #[must_use]
    pub fn lines_at(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(recorded, _)| *recorded == level)
            .map(|(_, line)| line)
            .collect()
    }

    /// Whether any line equals `expected`.
    #[must_use]
    pub fn contains(&self, expected: &str) -> bool {
        self.entries().iter().any(|(_, line)| line == expected)
    }

    fn entries(&self) -> Vec<(LogLevel, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, level: LogLevel, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, line.to_string()));
    }
}
