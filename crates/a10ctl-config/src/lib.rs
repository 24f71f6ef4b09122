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

//! Configuration source for `a10ctl`.
//!
//! Layout: `bag.rs` (the flat option bag shared by the argument and config
//! sources), `file.rs` (TOML defaults on disk), `paths.rs` (home expansion),
//! `error.rs` (error taxonomy).

pub mod bag;
pub mod error;
pub mod file;
pub mod paths;

pub use bag::{OptionBag, keys};
pub use error::{ConfigError, ConfigResult};
pub use file::{DEFAULT_CONFIG_FILE, FileDefaults, load, read};
pub use paths::{default_config_path, expand_home};
