//! Error types for configuration loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{}'", path.display())]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The configuration file is not valid TOML or contains unknown keys.
    #[error("invalid configuration file '{}'", path.display())]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Source TOML error.
        source: toml::de::Error,
    },
    /// No home directory could be determined for `~` expansion.
    #[error("home directory is unavailable")]
    HomeUnavailable,
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
