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

//! Client for the A10 aXAPI management interface.
//!
//! Layout: `model.rs` (device records and statistic bags), `api.rs` (the
//! `Connector`/`LbApi` seams consumed by the session layer), `client.rs`
//! (aXAPI v2.1 implementation over `reqwest`), `error.rs` (error taxonomy).

pub mod api;
pub mod client;
pub mod error;
pub mod model;

pub use api::{Connector, LbApi};
pub use client::{AxapiConnector, AxapiSession};
pub use error::{ApiError, ApiResult};
pub use model::{AdmissionStatus, Credentials, PORT_STAT_LIST, ServerRecord, ServerUpdate, StatBag};
