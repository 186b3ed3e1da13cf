#![forbid(unsafe_code)]

mod catalog;
mod connections;
mod devices;
mod render;

use crate::{PlanoServer, STATUS_NOT_FOUND, error};
use serde_json::{Map, Value};

pub(crate) const OPS: &[&str] = &[
    "devices.list",
    "devices.get",
    "devices.upsert",
    "devices.delete",
    "connections.list",
    "connections.create",
    "connections.delete",
    "planos.list",
    "types.list",
];

impl PlanoServer {
    /// Routes one request to its handler and returns the response envelope.
    pub(crate) fn dispatch(&mut self, op: &str, args: &Map<String, Value>) -> Value {
        match op {
            "devices.list" => self.handle_devices_list(args),
            "devices.get" => self.handle_devices_get(args),
            "devices.upsert" => self.handle_devices_upsert(args),
            "devices.delete" => self.handle_devices_delete(args),
            "connections.list" => self.handle_connections_list(args),
            "connections.create" => self.handle_connections_create(args),
            "connections.delete" => self.handle_connections_delete(args),
            "planos.list" => self.handle_planos_list(args),
            "types.list" => self.handle_types_list(args),
            other => {
                tracing::warn!(op = other, "unknown op");
                error(
                    "UNKNOWN_OP",
                    &format!("unknown op: {other} (expected one of: {})", OPS.join(", ")),
                    STATUS_NOT_FOUND,
                )
            }
        }
    }
}
