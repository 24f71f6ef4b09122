//! Partition-scoped session over one device connection.
//!
//! # Design
//! - A `Session` only exists once the initial partition switch succeeded; a
//!   failed switch releases the connection before the error is returned.
//! - `with_session` is the scoped entry point: the connection is released
//!   exactly once, whatever the operation returned.
//! - Enable/disable is a read-modify-write and backup is check-then-write.
//!   Neither guards against concurrent external changes: the last writer wins
//!   and a half-written backup file is left in place when a write fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use a10ctl_axapi::{
    AdmissionStatus, ApiError, Connector, Credentials, LbApi, ServerRecord, ServerUpdate, StatBag,
};
use a10ctl_config::expand_home;
use a10ctl_telemetry::LogSink;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{OperatorError, OperatorResult};

/// Partition used when none is configured.
pub const DEFAULT_PARTITION: &str = "shared";

/// Statistic reporting the current connection count.
pub const CURRENT_CONNECTIONS: &str = "cur_conns";

/// Inputs needed to open a session.
#[derive(Debug, Clone)]
pub struct SessionParams {
    /// Device host name, address, or URL.
    pub host: String,
    /// Login credentials.
    pub credentials: Credentials,
    /// Partition activated during construction.
    pub partition: String,
}

impl SessionParams {
    /// Parameters targeting the shared partition.
    #[must_use]
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            credentials,
            partition: DEFAULT_PARTITION.to_string(),
        }
    }

    /// Target a specific partition instead of the shared one.
    #[must_use]
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }
}

/// Result of a configuration backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupReport {
    /// File the configuration was written to.
    pub path: PathBuf,
    /// Number of bytes written.
    pub bytes: usize,
}

/// One authenticated connection bound to one partition.
pub struct Session {
    host: String,
    credentials: Credentials,
    partition: String,
    api: Box<dyn LbApi>,
    log: Arc<dyn LogSink>,
}

/// Open a session, run `operation` against it, and close it.
///
/// The connection is released exactly once on every path out of this
/// function, including when `operation` fails.
///
/// # Errors
///
/// Returns the construction error, or whatever `operation` returned.
pub async fn with_session<T>(
    connector: &dyn Connector,
    params: SessionParams,
    log: Arc<dyn LogSink>,
    operation: impl AsyncFnOnce(&mut Session) -> OperatorResult<T>,
) -> OperatorResult<T> {
    let mut session = Session::open(connector, params, log).await?;
    let outcome = operation(&mut session).await;
    session.close().await;
    outcome
}

impl Session {
    /// Connect, authenticate, and activate the requested partition.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::Connection` when the device cannot be reached,
    /// refuses the credentials, or rejects the partition.
    pub async fn open(
        connector: &dyn Connector,
        params: SessionParams,
        log: Arc<dyn LogSink>,
    ) -> OperatorResult<Self> {
        let SessionParams {
            host,
            credentials,
            partition,
        } = params;

        log.info(&format!(
            "Connecting to {host} as {}",
            credentials.username()
        ));
        let api = match connector.connect(&host, &credentials).await {
            Ok(api) => api,
            Err(source) => return Err(OperatorError::Connection { host, source }),
        };

        log.debug(&format!("Activating partition {partition}"));
        if let Err(source) = api.activate_partition(&partition).await {
            release(api.as_ref(), log.as_ref()).await;
            return Err(OperatorError::Connection { host, source });
        }

        Ok(Self {
            host,
            credentials,
            partition,
            api,
            log,
        })
    }

    /// Device host this session talks to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Account the session authenticated as.
    #[must_use]
    pub fn username(&self) -> &str {
        self.credentials.username()
    }

    /// Currently active partition.
    #[must_use]
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Switch the active partition on the device, then record it locally.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::Remote` when the device rejects the partition;
    /// the recorded partition is left unchanged.
    pub async fn set_partition(&mut self, partition: &str) -> OperatorResult<()> {
        self.log.info(&format!("Switching to partition {partition}"));
        self.api
            .activate_partition(partition)
            .await
            .map_err(|err| self.remote("activate partition", err))?;
        self.partition = partition.to_string();
        Ok(())
    }

    /// List servers sorted by name, optionally keeping only names matching
    /// `filter` (regular expression, search semantics).
    ///
    /// # Errors
    ///
    /// Fails on an invalid filter, a device error, or a server whose status
    /// is not recognised.
    pub async fn list_servers(&self, filter: Option<&str>) -> OperatorResult<Vec<ServerRecord>> {
        let pattern = filter
            .filter(|pattern| !pattern.is_empty())
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| OperatorError::InvalidFilter {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()?;

        self.log.info(&format!(
            "Listing servers on {} (partition {})",
            self.host, self.partition
        ));
        let mut servers = self
            .api
            .list_servers()
            .await
            .map_err(|err| self.remote("list servers", err))?;
        servers.sort_by(|left, right| left.name.cmp(&right.name));
        servers.retain(|server| {
            pattern
                .as_ref()
                .is_none_or(|pattern| pattern.is_match(&server.name))
        });

        let labels = servers
            .iter()
            .map(|server| admission_of(server).map(AdmissionStatus::label))
            .collect::<OperatorResult<Vec<_>>>()?;
        for (server, label) in servers.iter().zip(labels) {
            self.log.info(&format!(
                "{} [{}:{}]: {label}",
                server.name,
                server.host,
                server.port_summary(),
            ));
        }
        Ok(servers)
    }

    /// Put a server into rotation.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::NotFound` for an unknown server, or the device
    /// failure.
    pub async fn enable_server(&self, name: &str) -> OperatorResult<Value> {
        self.set_admission(name, AdmissionStatus::Enabled).await
    }

    /// Take a server out of rotation.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::NotFound` for an unknown server, or the device
    /// failure.
    pub async fn disable_server(&self, name: &str) -> OperatorResult<Value> {
        self.set_admission(name, AdmissionStatus::Disabled).await
    }

    /// Fetch and log a server's statistics, optionally only `stat`.
    ///
    /// The full bag is returned even when `stat` narrows what is logged.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::UnknownStatistic` when `stat` is not in the bag.
    pub async fn server_stats(&self, name: &str, stat: Option<&str>) -> OperatorResult<StatBag> {
        self.log
            .info(&format!("Fetching statistics for server {name}"));
        let stats = self.fetch_stats(name).await?;

        if let Some(stat) = stat.filter(|stat| !stats.contains(stat)) {
            return Err(OperatorError::UnknownStatistic {
                server: name.to_string(),
                stat: stat.to_string(),
            });
        }

        for (key, value) in stats
            .scalars()
            .filter(|(key, _)| stat.is_none_or(|stat| stat == *key))
        {
            self.log.info(&format!("{key}: {}", display_value(value)));
        }
        Ok(stats)
    }

    /// Log a server's Up/Down state and connection count; returns the raw
    /// status value.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::UnrecognizedStatus` when the raw status is not
    /// `0` or `1`.
    pub async fn server_status(&self, name: &str) -> OperatorResult<Value> {
        let server = self.fetch_server(name).await?;
        let status = admission_of(&server)?;
        let stats = self.fetch_stats(name).await?;
        let connections =
            stats
                .get(CURRENT_CONNECTIONS)
                .ok_or_else(|| OperatorError::UnknownStatistic {
                    server: name.to_string(),
                    stat: CURRENT_CONNECTIONS.to_string(),
                })?;

        self.log.info(&format!("{name}: {}", status.label()));
        self.log.info(&format!(
            "{name} current connections: {}",
            display_value(connections)
        ));
        Ok(server.status)
    }

    /// Write the device's running configuration to `filename`.
    ///
    /// `~` is expanded. An existing file aborts the backup untouched; the
    /// existence check is not atomic with the write.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::AlreadyExists`, a device failure, or
    /// `OperatorError::Io` when writing fails.
    pub async fn backup_configuration(&self, filename: &str) -> OperatorResult<BackupReport> {
        let path = expand_home(Path::new(filename))?;
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|source| OperatorError::Io {
                operation: "inspect",
                path: path.clone(),
                source,
            })?;
        if exists {
            return Err(OperatorError::AlreadyExists { path });
        }

        self.log.info(&format!(
            "Backing up configuration of {} to {}",
            self.host,
            path.display()
        ));
        let payload = self
            .api
            .backup_configuration()
            .await
            .map_err(|err| self.remote("back up configuration", err))?;

        let io_error = |operation: &'static str| {
            let path = path.clone();
            move |source: std::io::Error| OperatorError::Io {
                operation,
                path,
                source,
            }
        };
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(io_error("create"))?;
        file.write_all(&payload).await.map_err(io_error("write"))?;
        file.flush().await.map_err(io_error("flush"))?;

        self.log.info(&format!(
            "Wrote {} bytes to {}",
            payload.len(),
            path.display()
        ));
        Ok(BackupReport {
            path,
            bytes: payload.len(),
        })
    }

    /// Release the device connection.
    pub async fn close(self) {
        release(self.api.as_ref(), self.log.as_ref()).await;
    }

    async fn set_admission(&self, name: &str, status: AdmissionStatus) -> OperatorResult<Value> {
        let server = self.fetch_server(name).await?;
        let verb = match status {
            AdmissionStatus::Enabled => "Enabling",
            AdmissionStatus::Disabled => "Disabling",
        };
        self.log
            .info(&format!("{verb} server {} ({})", server.name, server.host));

        let update = ServerUpdate {
            name: server.name,
            host: server.host,
            status,
        };
        let result = self
            .api
            .update_server(&update)
            .await
            .map_err(|err| self.server_error(name, "update server", err))?;
        self.log
            .info(&format!("Server {name} is now {}", status.label()));
        Ok(result)
    }

    async fn fetch_server(&self, name: &str) -> OperatorResult<ServerRecord> {
        self.api
            .get_server(name)
            .await
            .map_err(|err| self.server_error(name, "fetch server", err))
    }

    async fn fetch_stats(&self, name: &str) -> OperatorResult<StatBag> {
        self.api
            .server_stats(name)
            .await
            .map_err(|err| self.server_error(name, "fetch statistics", err))
    }

    fn server_error(&self, name: &str, operation: &'static str, err: ApiError) -> OperatorError {
        if err.is_not_found() {
            OperatorError::NotFound {
                server: name.to_string(),
                source: err,
            }
        } else {
            self.remote(operation, err)
        }
    }

    fn remote(&self, operation: &'static str, err: ApiError) -> OperatorError {
        if err.is_connection() {
            OperatorError::Connection {
                host: self.host.clone(),
                source: err,
            }
        } else {
            OperatorError::Remote {
                operation,
                source: err,
            }
        }
    }
}

async fn release(api: &dyn LbApi, log: &dyn LogSink) {
    match api.logoff().await {
        Ok(()) => log.debug("Device session closed"),
        Err(err) => log.error(&format!("Failed to close device session: {err}")),
    }
}

fn admission_of(server: &ServerRecord) -> OperatorResult<AdmissionStatus> {
    server
        .admission()
        .ok_or_else(|| OperatorError::UnrecognizedStatus {
            server: server.name.clone(),
            value: server.status.to_string(),
        })
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
