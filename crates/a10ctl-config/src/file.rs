//! TOML defaults loaded from disk.

use std::fmt::{self, Debug, Formatter};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::bag::{OptionBag, keys};
use crate::error::{ConfigError, ConfigResult};
use crate::paths::{default_config_path, expand_home};

/// File name of the per-user defaults, relative to the home directory.
pub const DEFAULT_CONFIG_FILE: &str = ".a10ctl.toml";

/// Defaults read from the configuration file. Every field is optional.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileDefaults {
    /// Device host name, address, or URL.
    pub host: Option<String>,
    /// Account name.
    pub username: Option<String>,
    /// Account secret.
    pub password: Option<String>,
    /// Partition to activate.
    pub partition: Option<String>,
    /// Log file destination.
    pub log_file: Option<PathBuf>,
    /// Log level.
    pub log_level: Option<String>,
    /// Log format (`pretty` or `json`).
    pub log_format: Option<String>,
    /// Skip TLS certificate verification.
    pub insecure: Option<bool>,
    /// HTTP timeout in seconds.
    pub timeout: Option<u64>,
}

impl FileDefaults {
    /// Flatten into an option bag for layering under the argument source.
    #[must_use]
    pub fn into_bag(self) -> OptionBag {
        let mut bag = OptionBag::new();
        bag.insert_opt(keys::HOST, self.host);
        bag.insert_opt(keys::USERNAME, self.username);
        bag.insert_opt(keys::PASSWORD, self.password);
        bag.insert_opt(keys::PARTITION, self.partition);
        bag.insert_opt(
            keys::LOG_FILE,
            self.log_file.map(|path| path.to_string_lossy().into_owned()),
        );
        bag.insert_opt(keys::LOG_LEVEL, self.log_level);
        bag.insert_opt(keys::LOG_FORMAT, self.log_format);
        bag.insert_opt(keys::INSECURE, self.insecure.map(|flag| flag.to_string()));
        bag.insert_opt(keys::TIMEOUT, self.timeout.map(|secs| secs.to_string()));
        bag
    }
}

impl Debug for FileDefaults {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FileDefaults")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("partition", &self.partition)
            .field("log_file", &self.log_file)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("insecure", &self.insecure)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Load defaults from `explicit`, or from `~/.a10ctl.toml` when not given.
///
/// A missing default file, or a missing home directory, yields empty
/// defaults; a missing explicit file is an error.
///
/// # Errors
///
/// Returns an error when the file cannot be read or parsed.
pub fn load(explicit: Option<&Path>) -> ConfigResult<FileDefaults> {
    match explicit {
        Some(path) => read(&expand_home(path)?),
        None => load_default(default_config_path().ok().as_deref()),
    }
}

fn load_default(path: Option<&Path>) -> ConfigResult<FileDefaults> {
    match path {
        Some(path) if path.is_file() => read(path),
        Some(path) => {
            tracing::debug!(path = %path.display(), "no configuration file; using built-in defaults");
            Ok(FileDefaults::default())
        }
        None => {
            tracing::debug!("home directory unavailable; using built-in defaults");
            Ok(FileDefaults::default())
        }
    }
}

/// Read and parse a specific configuration file.
///
/// # Errors
///
/// Returns `ConfigError::Read` or `ConfigError::Parse`.
pub fn read(path: &Path) -> ConfigResult<FileDefaults> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
