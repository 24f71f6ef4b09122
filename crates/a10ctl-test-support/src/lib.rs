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

//! Shared test helpers used across the workspace.
//! Layout: device.rs (in-memory load balancer), logs.rs (capturing log sink).

pub mod device;
pub mod logs;

pub use device::{FakeDevice, LOGOFF_REFUSED_CODE, PARTITION_MISSING_CODE};
pub use logs::MemorySink;
