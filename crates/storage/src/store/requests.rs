#![forbid(unsafe_code)]

use pm_core::ids::DeviceId;
use pm_core::model::{PlanoMatch, UnknownFieldPolicy};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreOptions {
    pub unknown_fields: UnknownFieldPolicy,
    pub plano_match: PlanoMatch,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListDevicesRequest {
    pub plano: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListConnectionsRequest {
    pub plano: Option<String>,
    /// Falls back to the store's configured match when absent.
    pub plano_match: Option<PlanoMatch>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateConnectionRequest {
    pub from_device_id: DeviceId,
    pub to_device_id: DeviceId,
    pub connection_type: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub device_id: DeviceId,
    pub created: bool,
    pub ignored_fields: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeleteDeviceOutcome {
    pub deleted: bool,
    pub extension_removed: bool,
    pub connections_removed: usize,
}
