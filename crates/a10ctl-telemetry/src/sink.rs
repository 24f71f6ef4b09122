//! Explicit log sink handed to the session layer.
//!
//! The session and dispatcher never reach for a global logger; they receive a
//! `LogSink` at construction and emit formatted operator lines through it.

use tracing::Span;

/// Severity of an operator log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal operator output.
    Info,
    /// Failure report.
    Error,
}

/// Receiver of formatted operator log lines.
pub trait LogSink: Send + Sync {
    /// Record one line at `level`.
    fn emit(&self, level: LogLevel, line: &str);

    /// Record an informational line.
    fn info(&self, line: &str) {
        self.emit(LogLevel::Info, line);
    }

    /// Record a diagnostic line.
    fn debug(&self, line: &str) {
        self.emit(LogLevel::Debug, line);
    }

    /// Record a failure line.
    fn error(&self, line: &str) {
        self.emit(LogLevel::Error, line);
    }
}

/// Sink forwarding lines to `tracing` inside an invocation span.
#[derive(Debug, Clone)]
pub struct TracingSink {
    span: Span,
}

impl TracingSink {
    /// Create the sink for one invocation against `host`.
    #[must_use]
    pub fn new(host: &str, trace_id: &str) -> Self {
        Self {
            span: tracing::info_span!("a10ctl", host = %host, trace_id = %trace_id),
        }
    }
}

impl LogSink for TracingSink {
    fn emit(&self, level: LogLevel, line: &str) {
        let _entered = self.span.enter();
        match level {
            LogLevel::Debug => tracing::debug!("{line}"),
            LogLevel::Info => tracing::info!("{line}"),
            LogLevel::Error => tracing::error!("{line}"),
        }
    }
}
