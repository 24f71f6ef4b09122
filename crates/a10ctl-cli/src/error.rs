//! Error taxonomy shared by the session and the dispatcher.

use std::io;
use std::path::PathBuf;

use a10ctl_axapi::ApiError;
use a10ctl_config::ConfigError;
use thiserror::Error;

/// Failures surfaced by session operations and command dispatch.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// The command name is not in the command table.
    #[error("unknown command '{name}'")]
    CommandNotFound {
        /// Name requested by the caller.
        name: String,
    },
    /// A declared required argument is absent from the option bag.
    #[error("command '{command}' requires a value for '{argument}'")]
    MissingArgument {
        /// Command being bound.
        command: &'static str,
        /// Missing argument name.
        argument: &'static str,
    },
    /// Transport or authentication failure against the device.
    #[error("connection to {host} failed")]
    Connection {
        /// Device host.
        host: String,
        /// Underlying device error.
        source: ApiError,
    },
    /// The device rejected a call for a reason other than connectivity.
    #[error("failed to {operation}")]
    Remote {
        /// Operation being attempted.
        operation: &'static str,
        /// Underlying device error.
        source: ApiError,
    },
    /// The referenced server does not exist.
    #[error("server '{server}' not found")]
    NotFound {
        /// Server name.
        server: String,
        /// Underlying device error.
        source: ApiError,
    },
    /// The requested statistic is not part of the server's statistic bag.
    #[error("unknown statistic '{stat}' for server '{server}'")]
    UnknownStatistic {
        /// Server name.
        server: String,
        /// Requested statistic.
        stat: String,
    },
    /// The server's raw status is neither `0` nor `1`.
    #[error("server '{server}' reports unrecognized status {value}")]
    UnrecognizedStatus {
        /// Server name.
        server: String,
        /// Raw status as sent by the device.
        value: String,
    },
    /// The backup target already exists.
    #[error("'{}' already exists", path.display())]
    AlreadyExists {
        /// Backup target.
        path: PathBuf,
    },
    /// The server name filter is not a valid regular expression.
    #[error("invalid server filter '{pattern}'")]
    InvalidFilter {
        /// Pattern supplied by the operator.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },
    /// Local file access failed.
    #[error("failed to {operation} '{}'", path.display())]
    Io {
        /// Operation being attempted.
        operation: &'static str,
        /// File involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A local path could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl OperatorError {
    /// Whether the error is a caller mistake rather than an operational fault.
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::CommandNotFound { .. } | Self::MissingArgument { .. }
        )
    }
}

/// Convenience alias for operator results.
pub type OperatorResult<T> = Result<T, OperatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_are_distinguished() {
        assert!(
            OperatorError::CommandNotFound {
                name: "reboot".into()
            }
            .is_usage()
        );
        assert!(
            OperatorError::MissingArgument {
                command: "up",
                argument: "server"
            }
            .is_usage()
        );
        assert!(
            !OperatorError::AlreadyExists {
                path: PathBuf::from("/tmp/backup.tgz")
            }
            .is_usage()
        );
    }

    #[test]
    fn messages_name_the_subject() {
        let err = OperatorError::UnrecognizedStatus {
            server: "web-1".into(),
            value: "\"maint\"".into(),
        };
        assert_eq!(
            err.to_string(),
            "server 'web-1' reports unrecognized status \"maint\""
        );
        let err = OperatorError::AlreadyExists {
            path: PathBuf::from("/tmp/lb1.tgz"),
        };
        assert_eq!(err.to_string(), "'/tmp/lb1.tgz' already exists");
    }
}
