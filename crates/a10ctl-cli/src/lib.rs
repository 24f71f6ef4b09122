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
#![allow(clippy::redundant_pub_crate)]

//! Operator CLI for servers behind an A10 load-balancer partition.
//!
//! Layout:
//! - `session.rs`: partition-scoped session over one device connection
//! - `dispatch.rs`: static command table and argument binding
//! - `error.rs`: operator error taxonomy
//! - `cli.rs`: argument parsing, option layering, and reporting
//! - `client.rs`: HTTP client, credentials, and CLI-level errors
//! - `output.rs`: result renderers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub mod dispatch;
pub mod error;
pub(crate) mod output;
pub mod session;

pub use cli::run;
pub use dispatch::{CommandOutput, Dispatcher};
pub use error::{OperatorError, OperatorResult};
pub use session::{Session, SessionParams, with_session};
