#![forbid(unsafe_code)]

use crate::store::StoreError;
use pm_core::ids::{ConnectionId, DeviceId};
use pm_core::model::{Connection, Device, FieldValue};
use pm_core::schema::{FieldKind, FieldSpec};
use rusqlite::types::Value as SqlValue;
use rusqlite::{ErrorCode, Row};

pub(in crate::store) const DEVICE_COLUMNS: &str = "id, type, name, x, y, status, ip, plano, descripcion, place_name, usuario, last_update_ms";

pub(in crate::store) const CONNECTION_COLUMNS: &str =
    "id, from_device_id, to_device_id, connection_type, description";

pub(in crate::store) fn to_sql_value(value: &FieldValue) -> SqlValue {
    match value {
        FieldValue::Text(text) => SqlValue::Text(text.clone()),
        FieldValue::Integer(n) => SqlValue::Integer(*n),
        FieldValue::Null => SqlValue::Null,
    }
}

pub(in crate::store) fn field_from_sql(
    spec: &FieldSpec,
    value: SqlValue,
) -> Result<FieldValue, StoreError> {
    match (spec.kind, value) {
        (_, SqlValue::Null) => Ok(FieldValue::Null),
        (FieldKind::Text, SqlValue::Text(text)) => Ok(FieldValue::Text(text)),
        (FieldKind::Integer, SqlValue::Integer(n)) => Ok(FieldValue::Integer(n)),
        _ => Err(StoreError::CorruptRow(format!(
            "stored value for {} is not {}",
            spec.name,
            spec.kind.as_str()
        ))),
    }
}

pub(in crate::store) fn device_id_from_sql(raw: i64) -> Result<DeviceId, StoreError> {
    DeviceId::try_new(raw)
        .map_err(|_| StoreError::CorruptRow(format!("device id {raw} is not positive")))
}

pub(in crate::store) fn connection_id_from_sql(raw: i64) -> Result<ConnectionId, StoreError> {
    ConnectionId::try_new(raw)
        .map_err(|_| StoreError::CorruptRow(format!("connection id {raw} is not positive")))
}

/// Expects the column order of [`DEVICE_COLUMNS`].
pub(in crate::store) fn read_device(row: &Row<'_>) -> Result<Device, StoreError> {
    Ok(Device {
        id: device_id_from_sql(row.get::<_, i64>(0)?)?,
        kind: row.get::<_, String>(1)?,
        name: row.get::<_, String>(2)?,
        x: row.get::<_, i64>(3)?,
        y: row.get::<_, i64>(4)?,
        status: row.get::<_, String>(5)?,
        ip: row.get::<_, String>(6)?,
        plano: row.get::<_, Option<String>>(7)?,
        descripcion: row.get::<_, Option<String>>(8)?,
        place_name: row.get::<_, Option<String>>(9)?,
        usuario: row.get::<_, Option<String>>(10)?,
        last_update_ms: row.get::<_, i64>(11)?,
    })
}

/// Expects the column order of [`CONNECTION_COLUMNS`].
pub(in crate::store) fn read_connection(row: &Row<'_>) -> Result<Connection, StoreError> {
    Ok(Connection {
        id: connection_id_from_sql(row.get::<_, i64>(0)?)?,
        from_device_id: device_id_from_sql(row.get::<_, i64>(1)?)?,
        to_device_id: device_id_from_sql(row.get::<_, i64>(2)?)?,
        connection_type: row.get::<_, String>(3)?,
        description: row.get::<_, Option<String>>(4)?,
    })
}

pub(in crate::store) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("PRIMARY KEY constraint failed")
                })
        }
        _ => false,
    }
}
