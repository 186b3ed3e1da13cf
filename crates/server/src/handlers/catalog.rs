#![forbid(unsafe_code)]

use super::render;
use crate::{PlanoServer, ok, store_error};
use pm_core::schema::BASE_FIELDS;
use serde_json::{Map, Value, json};

impl PlanoServer {
    pub(super) fn handle_planos_list(&mut self, _args: &Map<String, Value>) -> Value {
        match self.store.list_planos() {
            Ok(planos) => ok(json!({ "planos": planos })),
            Err(err) => store_error("planos.list", err),
        }
    }

    pub(super) fn handle_types_list(&mut self, _args: &Map<String, Value>) -> Value {
        let types = self
            .store
            .registry()
            .schemas()
            .map(render::extension_schema)
            .collect::<Vec<_>>();
        let base_fields = BASE_FIELDS.iter().map(render::field_spec).collect::<Vec<_>>();
        ok(json!({ "base_fields": base_fields, "types": types }))
    }
}
