//! Seams between the session layer and a concrete device client.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiResult;
use crate::model::{Credentials, ServerRecord, ServerUpdate, StatBag};

/// Opens authenticated connections to a device.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Authenticate against `host` and return an exclusively owned connection.
    async fn connect(&self, host: &str, credentials: &Credentials) -> ApiResult<Box<dyn LbApi>>;
}

/// Operations exposed by an authenticated device connection.
///
/// Every call blocks the caller until the device answers; none are retried.
#[async_trait]
pub trait LbApi: Send + Sync {
    /// Switch the connection's active partition.
    async fn activate_partition(&self, name: &str) -> ApiResult<()>;

    /// Enumerate every server visible in the active partition.
    async fn list_servers(&self) -> ApiResult<Vec<ServerRecord>>;

    /// Fetch one server by name.
    async fn get_server(&self, name: &str) -> ApiResult<ServerRecord>;

    /// Replace a server's name/host/status; returns the device response.
    async fn update_server(&self, update: &ServerUpdate) -> ApiResult<Value>;

    /// Fetch the statistic bag for one server.
    async fn server_stats(&self, name: &str) -> ApiResult<StatBag>;

    /// Export the running configuration.
    async fn backup_configuration(&self) -> ApiResult<Vec<u8>>;

    /// Release the device session.
    async fn logoff(&self) -> ApiResult<()>;
}
