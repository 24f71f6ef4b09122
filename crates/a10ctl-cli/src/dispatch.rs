//! Static command table and the dispatcher that binds it to a live session.
//!
//! # Design
//! - `COMMANDS` is the complete set of operator commands; lookup is a linear
//!   scan over a handful of entries.
//! - Binding pulls only the declared parameters out of the option bag. Extra
//!   keys are ignored and blank values count as absent.
//! - Errors from the session propagate unchanged.

use std::sync::Arc;

use a10ctl_axapi::{ServerRecord, StatBag};
use a10ctl_config::{OptionBag, keys};
use a10ctl_telemetry::LogSink;
use serde::Serialize;
use serde_json::Value;

use crate::error::{OperatorError, OperatorResult};
use crate::session::{BackupReport, Session};

/// Session operation a command is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Enable a server.
    ServerUp,
    /// Disable a server.
    ServerDown,
    /// Report a server's state and connection count.
    ServerStatus,
    /// Report a server's statistics.
    ServerStats,
    /// List servers, optionally filtered by name.
    ListServers,
    /// Export the running configuration.
    Backup,
}

impl Operation {
    /// Symbolic operation name.
    #[must_use]
    pub const fn method_name(self) -> &'static str {
        match self {
            Self::ServerUp => "server_up",
            Self::ServerDown => "server_down",
            Self::ServerStatus => "server_status",
            Self::ServerStats => "server_stats",
            Self::ListServers => "list_servers",
            Self::Backup => "backup",
        }
    }
}

/// Declared parameter of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    /// Option bag key.
    pub name: &'static str,
    /// Whether binding fails when the key is absent.
    pub required: bool,
}

const SERVER: Param = Param {
    name: keys::SERVER,
    required: true,
};
const STAT: Param = Param {
    name: keys::STAT,
    required: false,
};
const NFILTER: Param = Param {
    name: keys::NFILTER,
    required: false,
};
const FILENAME: Param = Param {
    name: keys::FILENAME,
    required: true,
};

/// One entry of the command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Name the operator types.
    pub name: &'static str,
    /// Bound session operation.
    pub operation: Operation,
    /// Parameters in positional order.
    pub params: &'static [Param],
}

/// Every command the dispatcher knows.
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "up",
        operation: Operation::ServerUp,
        params: &[SERVER],
    },
    CommandSpec {
        name: "down",
        operation: Operation::ServerDown,
        params: &[SERVER],
    },
    CommandSpec {
        name: "status",
        operation: Operation::ServerStatus,
        params: &[SERVER],
    },
    CommandSpec {
        name: "stats",
        operation: Operation::ServerStats,
        params: &[SERVER, STAT],
    },
    CommandSpec {
        name: "list",
        operation: Operation::ListServers,
        params: &[NFILTER],
    },
    CommandSpec {
        name: "backup",
        operation: Operation::Backup,
        params: &[FILENAME],
    },
];

/// Find a command by name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// Arguments extracted for one command, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundArgs {
    command: &'static str,
    values: Vec<(&'static str, Option<String>)>,
}

impl BoundArgs {
    /// Value bound to `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .and_then(|(_, value)| value.as_deref())
    }

    fn require(&self, name: &'static str) -> OperatorResult<&str> {
        self.get(name).ok_or(OperatorError::MissingArgument {
            command: self.command,
            argument: name,
        })
    }
}

/// Pull the declared parameters of `spec` out of `bag`.
///
/// # Errors
///
/// Returns `OperatorError::MissingArgument` for the first absent required
/// parameter.
pub fn extract(spec: &CommandSpec, bag: &OptionBag) -> OperatorResult<BoundArgs> {
    let values = spec
        .params
        .iter()
        .map(|param| {
            let value = bag.get_non_empty(param.name).map(str::to_string);
            if param.required && value.is_none() {
                return Err(OperatorError::MissingArgument {
                    command: spec.name,
                    argument: param.name,
                });
            }
            Ok((param.name, value))
        })
        .collect::<OperatorResult<Vec<_>>>()?;
    Ok(BoundArgs {
        command: spec.name,
        values,
    })
}

/// Result of a dispatched command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    /// Listed servers.
    Servers(Vec<ServerRecord>),
    /// Device response to an enable/disable update.
    Updated(Value),
    /// Full statistic bag.
    Stats(StatBag),
    /// Raw admission status.
    Status(Value),
    /// Written backup.
    Backup(BackupReport),
}

/// Resolves command names against a live session.
pub struct Dispatcher<'s> {
    session: &'s Session,
    log: Arc<dyn LogSink>,
}

impl<'s> Dispatcher<'s> {
    /// Bind the dispatcher to `session`.
    #[must_use]
    pub fn new(session: &'s Session, log: Arc<dyn LogSink>) -> Self {
        Self { session, log }
    }

    /// Resolve `name` to a command bound to the session.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::CommandNotFound` for a name outside the table.
    pub fn resolve(&self, name: &str) -> OperatorResult<BoundCommand<'s>> {
        let spec = lookup(name).ok_or_else(|| OperatorError::CommandNotFound {
            name: name.to_string(),
        })?;
        self.log.debug(&format!(
            "Resolved command {name} to {}",
            spec.operation.method_name()
        ));
        Ok(BoundCommand {
            spec,
            session: self.session,
        })
    }
}

/// A command ready to run against a session.
#[derive(Clone, Copy)]
pub struct BoundCommand<'s> {
    spec: &'static CommandSpec,
    session: &'s Session,
}

impl BoundCommand<'_> {
    /// Extract the declared arguments from `bag` and run the operation.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::MissingArgument`, or the session error as is.
    pub async fn invoke(self, bag: &OptionBag) -> OperatorResult<CommandOutput> {
        let args = extract(self.spec, bag)?;
        let session = self.session;
        match self.spec.operation {
            Operation::ServerUp => session
                .enable_server(args.require(keys::SERVER)?)
                .await
                .map(CommandOutput::Updated),
            Operation::ServerDown => session
                .disable_server(args.require(keys::SERVER)?)
                .await
                .map(CommandOutput::Updated),
            Operation::ServerStatus => session
                .server_status(args.require(keys::SERVER)?)
                .await
                .map(CommandOutput::Status),
            Operation::ServerStats => session
                .server_stats(args.require(keys::SERVER)?, args.get(keys::STAT))
                .await
                .map(CommandOutput::Stats),
            Operation::ListServers => session
                .list_servers(args.get(keys::NFILTER))
                .await
                .map(CommandOutput::Servers),
            Operation::Backup => session
                .backup_configuration(args.require(keys::FILENAME)?)
                .await
                .map(CommandOutput::Backup),
        }
    }
}
