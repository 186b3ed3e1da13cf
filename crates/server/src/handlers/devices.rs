#![forbid(unsafe_code)]

use super::render;
use crate::{PlanoServer, ok, optional_string, require_device_id, store_error};
use pm_storage::ListDevicesRequest;
use serde_json::{Map, Value, json};

impl PlanoServer {
    pub(super) fn handle_devices_list(&mut self, args: &Map<String, Value>) -> Value {
        let plano = match optional_string(args, "plano") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        match self.store.list_devices(ListDevicesRequest { plano }) {
            Ok(devices) => {
                let devices = devices
                    .iter()
                    .map(|device| Value::Object(render::device(device)))
                    .collect::<Vec<_>>();
                ok(json!({ "count": devices.len(), "devices": devices }))
            }
            Err(err) => store_error("devices.list", err),
        }
    }

    pub(super) fn handle_devices_get(&mut self, args: &Map<String, Value>) -> Value {
        let id = match require_device_id(args, "id") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        match self.store.device_detail(id) {
            Ok(detail) => ok(render::device_detail(&detail)),
            Err(err) => store_error("devices.get", err),
        }
    }

    /// `args` is the device payload itself: `id` selects update, `type` the extension.
    pub(super) fn handle_devices_upsert(&mut self, args: &Map<String, Value>) -> Value {
        match self.store.upsert_device(args) {
            Ok(outcome) => ok(json!({
                "device_id": outcome.device_id.get(),
                "created": outcome.created,
                "ignored_fields": outcome.ignored_fields,
            })),
            Err(err) => store_error("devices.upsert", err),
        }
    }

    pub(super) fn handle_devices_delete(&mut self, args: &Map<String, Value>) -> Value {
        let id = match require_device_id(args, "id") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        match self.store.delete_device(id) {
            Ok(outcome) => ok(json!({
                "deleted": outcome.deleted,
                "extension_removed": outcome.extension_removed,
                "connections_removed": outcome.connections_removed,
            })),
            Err(err) => store_error("devices.delete", err),
        }
    }
}
