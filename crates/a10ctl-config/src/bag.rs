//! Flat option bag shared by the argument and configuration sources.
//!
//! # Design
//! - Both sources reduce to `name -> string` pairs so the command layer never
//!   needs to know where a value came from.
//! - Layering is explicit: the argument bag is placed over the config bag and
//!   keeps every key it already has.

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};

/// Well-known option names.
pub mod keys {
    /// Device host name, address, or URL.
    pub const HOST: &str = "host";
    /// Account name.
    pub const USERNAME: &str = "username";
    /// Account secret.
    pub const PASSWORD: &str = "password";
    /// Partition to activate.
    pub const PARTITION: &str = "partition";
    /// Server name argument.
    pub const SERVER: &str = "server";
    /// Statistic name argument.
    pub const STAT: &str = "stat";
    /// Server name filter argument.
    pub const NFILTER: &str = "nfilter";
    /// Backup target argument.
    pub const FILENAME: &str = "filename";
    /// Log file destination.
    pub const LOG_FILE: &str = "log_file";
    /// Log level.
    pub const LOG_LEVEL: &str = "log_level";
    /// Log format (`pretty` or `json`).
    pub const LOG_FORMAT: &str = "log_format";
    /// Skip TLS certificate verification.
    pub const INSECURE: &str = "insecure";
    /// HTTP timeout in seconds.
    pub const TIMEOUT: &str = "timeout";
}

/// Named option values merged from every source.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct OptionBag {
    values: BTreeMap<String, String>,
}

impl OptionBag {
    /// Create an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Set `key` only when a value is present.
    pub fn insert_opt<V: Into<String>>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value stored under `key`, treating an empty string as absent.
    #[must_use]
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.trim().is_empty())
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Place `self` over `defaults`: keys already present in `self` win.
    #[must_use]
    pub fn layered_over(mut self, defaults: Self) -> Self {
        for (key, value) in defaults.values {
            self.values.entry(key).or_insert(value);
        }
        self
    }
}

impl Debug for OptionBag {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_map()
            .entries(self.values.iter().map(|(key, value)| {
                let shown = if key == keys::PASSWORD {
                    "<redacted>"
                } else {
                    value.as_str()
                };
                (key.as_str(), shown)
            }))
            .finish()
    }
}
