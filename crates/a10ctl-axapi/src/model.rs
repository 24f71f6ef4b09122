//! Device records exchanged with the load balancer.
//!
//! # Design
//! - `ServerRecord` keeps the raw admission status exactly as the device sent
//!   it; interpretation happens through `AdmissionStatus::from_raw` so an
//!   unknown value is surfaced instead of defaulted.
//! - `StatBag` hides the nested `port_stat_list` entry from flat lookups.

use std::collections::BTreeSet;
use std::fmt::{self, Debug, Formatter};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Statistic key holding per-port counters; never part of flat enumeration.
pub const PORT_STAT_LIST: &str = "port_stat_list";

/// Username/password pair used to open a device session.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Build a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Account name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Account secret.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Debug for Credentials {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Binary admission state of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionStatus {
    /// Server receives traffic.
    Enabled,
    /// Server is taken out of rotation.
    Disabled,
}

impl AdmissionStatus {
    /// Interpret a raw device value; accepts `0`/`1` as integers or strings.
    #[must_use]
    pub fn from_raw(raw: &Value) -> Option<Self> {
        match raw {
            Value::Number(number) => match number.as_i64() {
                Some(1) => Some(Self::Enabled),
                Some(0) => Some(Self::Disabled),
                _ => None,
            },
            Value::String(text) => match text.as_str() {
                "1" => Some(Self::Enabled),
                "0" => Some(Self::Disabled),
                _ => None,
            },
            _ => None,
        }
    }

    /// Wire encoding expected by `slb.server.update`.
    #[must_use]
    pub const fn as_wire(self) -> u8 {
        match self {
            Self::Enabled => 1,
            Self::Disabled => 0,
        }
    }

    /// Operator-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Enabled => "Up",
            Self::Disabled => "Down",
        }
    }
}

impl Serialize for AdmissionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_wire())
    }
}

/// A backend target registered on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireServer")]
pub struct ServerRecord {
    /// Unique server name.
    pub name: String,
    /// Address or host name of the backend.
    pub host: String,
    /// Exposed ports, ascending.
    pub ports: BTreeSet<u16>,
    /// Raw admission status as reported by the device.
    pub status: Value,
}

impl ServerRecord {
    /// Interpret the raw status.
    #[must_use]
    pub fn admission(&self) -> Option<AdmissionStatus> {
        AdmissionStatus::from_raw(&self.status)
    }

    /// Ports rendered as `{80,443}`.
    #[must_use]
    pub fn port_summary(&self) -> String {
        let ports: Vec<String> = self.ports.iter().map(u16::to_string).collect();
        format!("{{{}}}", ports.join(","))
    }
}

#[derive(Deserialize)]
struct WireServer {
    name: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: Value,
    #[serde(default)]
    port_list: Vec<WirePort>,
}

#[derive(Deserialize)]
struct WirePort {
    port_num: u16,
}

impl From<WireServer> for ServerRecord {
    fn from(wire: WireServer) -> Self {
        Self {
            name: wire.name,
            host: wire.host,
            ports: wire.port_list.into_iter().map(|port| port.port_num).collect(),
            status: wire.status,
        }
    }
}

/// Payload for `slb.server.update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerUpdate {
    /// Server being updated.
    pub name: String,
    /// Address carried over from the fetched record.
    pub host: String,
    /// Requested admission state.
    pub status: AdmissionStatus,
}

/// Runtime counters for a single server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatBag(Map<String, Value>);

impl StatBag {
    /// Look up a flat statistic; `port_stat_list` is never returned.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        if key == PORT_STAT_LIST {
            return None;
        }
        self.0.get(key)
    }

    /// Whether `key` names a flat statistic.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Flat statistics in key order, excluding `port_stat_list`.
    pub fn scalars(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0
            .iter()
            .filter(|(key, _)| key.as_str() != PORT_STAT_LIST)
            .map(|(key, value)| (key.as_str(), value))
    }

    /// The complete bag, nested entries included.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl FromIterator<(String, Value)> for StatBag {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
