#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Logging primitives shared across the `a10ctl` workspace.
//!
//! Layout: `init.rs` (subscriber installation), `sink.rs` (the explicit log
//! sink handed to the session layer), `error.rs` (error taxonomy).

pub mod error;
pub mod init;
pub mod sink;

pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
pub use sink::{LogLevel, LogSink, TracingSink};
