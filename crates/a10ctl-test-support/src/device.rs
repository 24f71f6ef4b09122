//! In-memory load balancer implementing the device seams.
//!
//! Every connection handed out by `connect` shares the same state, so tests
//! can inspect what a session did after it has been closed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use a10ctl_axapi::{
    ApiError, ApiResult, Connector, Credentials, LbApi, ServerRecord, ServerUpdate, StatBag,
};
use async_trait::async_trait;
use serde_json::{Value, json};

/// Device code returned for an unknown partition.
pub const PARTITION_MISSING_CODE: i64 = 402_718_976;
const SERVER_MISSING_CODE: i64 = 67_174_402;
/// Device code returned when `session.close` is refused.
pub const LOGOFF_REFUSED_CODE: i64 = 1009;
const SHARED_PARTITION: &str = "shared";

/// Shared-state fake device.
#[derive(Clone, Default)]
pub struct FakeDevice {
    state: Arc<Mutex<DeviceState>>,
}

#[derive(Default)]
struct DeviceState {
    partitions: BTreeSet<String>,
    active_partition: Option<String>,
    servers: Vec<ServerRecord>,
    stats: BTreeMap<String, StatBag>,
    backup: Vec<u8>,
    reject_credentials: bool,
    fail_logoff: bool,
    connects: usize,
    backups: usize,
    logoffs: usize,
    updates: Vec<ServerUpdate>,
    stats_requests: Vec<String>,
}

impl FakeDevice {
    /// Device with only the shared partition and no servers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a server; insertion order is the device's enumeration order.
    #[must_use]
    pub fn with_server(self, name: &str, host: &str, ports: &[u16], status: Value) -> Self {
        self.lock().servers.push(ServerRecord {
            name: name.to_string(),
            host: host.to_string(),
            ports: ports.iter().copied().collect(),
            status,
        });
        self
    }

    /// Register an additional partition.
    #[must_use]
    pub fn with_partition(self, name: &str) -> Self {
        self.lock().partitions.insert(name.to_string());
        self
    }

    /// Register the statistic bag returned for `server`.
    #[must_use]
    pub fn with_stats(self, server: &str, stats: StatBag) -> Self {
        self.lock().stats.insert(server.to_string(), stats);
        self
    }

    /// Bytes returned by the configuration backup.
    #[must_use]
    pub fn with_backup(self, bytes: &[u8]) -> Self {
        self.lock().backup = bytes.to_vec();
        self
    }

    /// Make every `connect` fail with an authentication error.
    #[must_use]
    pub fn rejecting_credentials(self) -> Self {
        self.lock().reject_credentials = true;
        self
    }

    /// Make every `logoff` fail after it has been counted.
    #[must_use]
    pub fn failing_logoff(self) -> Self {
        self.lock().fail_logoff = true;
        self
    }

    /// Current record for `name`.
    #[must_use]
    pub fn server(&self, name: &str) -> Option<ServerRecord> {
        self.lock()
            .servers
            .iter()
            .find(|server| server.name == name)
            .cloned()
    }

    /// Overwrite a server's raw status, as an external actor would.
    pub fn set_status(&self, name: &str, status: Value) {
        if let Some(server) = self
            .lock()
            .servers
            .iter_mut()
            .find(|server| server.name == name)
        {
            server.status = status;
        }
    }

    /// Partition most recently activated.
    #[must_use]
    pub fn active_partition(&self) -> Option<String> {
        self.lock().active_partition.clone()
    }

    /// Number of successful connections.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    /// Number of logoff calls.
    #[must_use]
    pub fn logoff_count(&self) -> usize {
        self.lock().logoffs
    }

    /// Number of configuration backups served.
    #[must_use]
    pub fn backup_count(&self) -> usize {
        self.lock().backups
    }

    /// Update requests received, in order.
    #[must_use]
    pub fn updates(&self) -> Vec<ServerUpdate> {
        self.lock().updates.clone()
    }

    /// Server names whose statistics were requested, in order.
    #[must_use]
    pub fn stats_requests(&self) -> Vec<String> {
        self.lock().stats_requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn server_missing(name: &str) -> ApiError {
    ApiError::NotFound {
        code: SERVER_MISSING_CODE,
        message: format!("No such Server: {name}"),
    }
}

#[async_trait]
impl Connector for FakeDevice {
    async fn connect(&self, _host: &str, credentials: &Credentials) -> ApiResult<Box<dyn LbApi>> {
        let mut state = self.lock();
        if state.reject_credentials {
            return Err(ApiError::Auth {
                message: format!("Invalid username or password for {}", credentials.username()),
            });
        }
        state.connects += 1;
        drop(state);
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl LbApi for FakeDevice {
    async fn activate_partition(&self, name: &str) -> ApiResult<()> {
        let mut state = self.lock();
        if name != SHARED_PARTITION && !state.partitions.contains(name) {
            return Err(ApiError::Device {
                code: PARTITION_MISSING_CODE,
                message: format!("Partition {name} does not exist"),
            });
        }
        state.active_partition = Some(name.to_string());
        Ok(())
    }

    async fn list_servers(&self) -> ApiResult<Vec<ServerRecord>> {
        Ok(self.lock().servers.clone())
    }

    async fn get_server(&self, name: &str) -> ApiResult<ServerRecord> {
        self.server(name).ok_or_else(|| server_missing(name))
    }

    async fn update_server(&self, update: &ServerUpdate) -> ApiResult<Value> {
        let mut state = self.lock();
        state.updates.push(update.clone());
        let server = state
            .servers
            .iter_mut()
            .find(|server| server.name == update.name)
            .ok_or_else(|| server_missing(&update.name))?;
        server.host.clone_from(&update.host);
        server.status = Value::from(update.status.as_wire());
        Ok(json!({"response": {"status": "OK"}}))
    }

    async fn server_stats(&self, name: &str) -> ApiResult<StatBag> {
        let mut state = self.lock();
        state.stats_requests.push(name.to_string());
        if !state.servers.iter().any(|server| server.name == name) {
            return Err(server_missing(name));
        }
        Ok(state.stats.get(name).cloned().unwrap_or_default())
    }

    async fn backup_configuration(&self) -> ApiResult<Vec<u8>> {
        let mut state = self.lock();
        state.backups += 1;
        Ok(state.backup.clone())
    }

    async fn logoff(&self) -> ApiResult<()> {
        let mut state = self.lock();
        state.logoffs += 1;
        if state.fail_logoff {
            return Err(ApiError::Device {
                code: LOGOFF_REFUSED_CODE,
                message: "Invalid session ID".to_string(),
            });
        }
        Ok(())
    }
}
