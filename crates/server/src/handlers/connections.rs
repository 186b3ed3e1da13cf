#![forbid(unsafe_code)]

use super::render;
use crate::{
    PlanoServer, ok, optional_plano_match, optional_string, require_connection_id,
    require_device_id, require_string, store_error,
};
use pm_storage::{CreateConnectionRequest, ListConnectionsRequest};
use serde_json::{Map, Value, json};

impl PlanoServer {
    pub(super) fn handle_connections_list(&mut self, args: &Map<String, Value>) -> Value {
        let plano = match optional_string(args, "plano") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let plano_match = match optional_plano_match(args, "plano_match") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        match self
            .store
            .list_connections(ListConnectionsRequest { plano, plano_match })
        {
            Ok(connections) => {
                let connections = connections.iter().map(render::connection).collect::<Vec<_>>();
                ok(json!({ "count": connections.len(), "connections": connections }))
            }
            Err(err) => store_error("connections.list", err),
        }
    }

    pub(super) fn handle_connections_create(&mut self, args: &Map<String, Value>) -> Value {
        let from_device_id = match require_device_id(args, "from_device_id") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let to_device_id = match require_device_id(args, "to_device_id") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let connection_type = match require_string(args, "connection_type") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let description = match optional_string(args, "description") {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        let request = CreateConnectionRequest {
            from_device_id,
            to_device_id,
            connection_type,
            description,
        };
        match self.store.create_connection(request) {
            Ok(connection) => ok(render::connection(&connection)),
            Err(err) => store_error("connections.create", err),
        }
    }

    pub(super) fn handle_connections_delete(&mut self, args: &Map<String, Value>) -> Value {
        let id = match require_connection_id(args, "id") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        match self.store.delete_connection(id) {
            Ok(deleted) => ok(json!({ "deleted": deleted })),
            Err(err) => store_error("connections.delete", err),
        }
    }
}
