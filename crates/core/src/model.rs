#![forbid(unsafe_code)]

use crate::ids::{ConnectionId, DeviceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single typed value routed to a base or extension column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

pub type FieldMap = BTreeMap<&'static str, FieldValue>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: i64,
    pub y: i64,
    pub status: String,
    pub ip: String,
    pub plano: Option<String>,
    pub descripcion: Option<String>,
    pub place_name: Option<String>,
    pub usuario: Option<String>,
    pub last_update_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExtensionRecord {
    pub device_id: DeviceId,
    pub discriminator: &'static str,
    pub fields: FieldMap,
}

impl ExtensionRecord {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Base record merged with its extension row, if one has been materialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceDetail {
    #[serde(flatten)]
    pub device: Device,
    pub extension: Option<ExtensionRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub from_device_id: DeviceId,
    pub to_device_id: DeviceId,
    pub connection_type: String,
    pub description: Option<String>,
}

impl Connection {
    pub fn touches(&self, device_id: DeviceId) -> bool {
        self.from_device_id == device_id || self.to_device_id == device_id
    }
}

/// How a plano filter selects connections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanoMatch {
    /// Either endpoint lies on the plano.
    #[default]
    Either,
    /// Only the `from` endpoint is checked.
    From,
}

impl PlanoMatch {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "either" => Some(Self::Either),
            "from" => Some(Self::From),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFieldPolicy {
    #[default]
    Drop,
    Reject,
}
