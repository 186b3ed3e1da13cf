#![forbid(unsafe_code)]

use crate::ts_ms_to_rfc3339;
use pm_core::model::{Connection, Device, DeviceDetail, FieldValue};
use pm_core::schema::{ExtensionSchema, FieldSpec};
use serde_json::{Map, Value, json};

pub(super) fn field_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::Integer(n) => Value::from(*n),
        FieldValue::Null => Value::Null,
    }
}

pub(super) fn device(device: &Device) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("id".to_string(), Value::from(device.id.get()));
    out.insert("type".to_string(), Value::String(device.kind.clone()));
    out.insert("name".to_string(), Value::String(device.name.clone()));
    out.insert("x".to_string(), Value::from(device.x));
    out.insert("y".to_string(), Value::from(device.y));
    out.insert("status".to_string(), Value::String(device.status.clone()));
    out.insert("ip".to_string(), Value::String(device.ip.clone()));
    out.insert("plano".to_string(), json!(device.plano));
    out.insert("descripcion".to_string(), json!(device.descripcion));
    out.insert("place_name".to_string(), json!(device.place_name));
    out.insert("usuario".to_string(), json!(device.usuario));
    out.insert(
        "last_update".to_string(),
        Value::String(ts_ms_to_rfc3339(device.last_update_ms)),
    );
    out.insert("last_update_ms".to_string(), Value::from(device.last_update_ms));
    out
}

/// Extension fields are flattened beside the base fields, so a fetched record can be
/// sent back to `devices.upsert` unchanged.
pub(super) fn device_detail(detail: &DeviceDetail) -> Value {
    let mut out = device(&detail.device);
    if let Some(extension) = &detail.extension {
        for (name, value) in &extension.fields {
            out.insert((*name).to_string(), field_value(value));
        }
    }
    out.insert("has_extension".to_string(), Value::Bool(detail.extension.is_some()));
    Value::Object(out)
}

pub(super) fn connection(connection: &Connection) -> Value {
    json!({
        "id": connection.id.get(),
        "from_device_id": connection.from_device_id.get(),
        "to_device_id": connection.to_device_id.get(),
        "connection_type": connection.connection_type,
        "description": connection.description,
    })
}

pub(super) fn field_spec(spec: &FieldSpec) -> Value {
    json!({
        "name": spec.name,
        "kind": spec.kind.as_str(),
        "required": spec.required,
    })
}

pub(super) fn extension_schema(schema: &ExtensionSchema) -> Value {
    json!({
        "type": schema.discriminator,
        "table": schema.table,
        "fields": schema.fields.iter().map(field_spec).collect::<Vec<_>>(),
    })
}
