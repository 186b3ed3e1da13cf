#![forbid(unsafe_code)]

use super::connections::delete_incident_connections_tx;
use super::extensions::{delete_extension_tx, get_extension_tx};
use super::support::{DEVICE_COLUMNS, device_id_from_sql, now_ms, read_device, to_sql_value};
use super::*;
use pm_core::ids::{DeviceId, Plano};
use pm_core::model::{Device, DeviceDetail, FieldMap, FieldValue};
use pm_core::schema::{BASE_FIELDS, FieldKind, base_field};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

impl SqliteStore {
    /// Devices in insertion order, optionally restricted to one plano.
    pub fn list_devices(&self, request: ListDevicesRequest) -> Result<Vec<Device>, StoreError> {
        let plano = plano_filter(request.plano.as_deref())?;

        let mut stmt;
        let mut rows = match plano.as_deref() {
            Some(plano) => {
                stmt = self.conn.prepare(&format!(
                    "SELECT {DEVICE_COLUMNS} FROM devices WHERE plano=?1 ORDER BY id ASC"
                ))?;
                stmt.query(params![plano])?
            }
            None => {
                stmt = self.conn.prepare(&format!(
                    "SELECT {DEVICE_COLUMNS} FROM devices ORDER BY id ASC"
                ))?;
                stmt.query([])?
            }
        };

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(read_device(row)?);
        }
        Ok(out)
    }

    pub fn get_device(&self, id: DeviceId) -> Result<Option<Device>, StoreError> {
        get_device_tx(&self.conn, id)
    }

    /// The base record merged with its extension row.
    pub fn device_detail(&self, id: DeviceId) -> Result<DeviceDetail, StoreError> {
        let device = get_device_tx(&self.conn, id)?.ok_or(StoreError::UnknownDevice(id))?;
        let extension = match self.registry.resolve(&device.kind) {
            Some(schema) => get_extension_tx(&self.conn, schema, id)?,
            None => None,
        };
        Ok(DeviceDetail { device, extension })
    }

    /// Inserts a base row without touching any extension table.
    pub fn create_device(
        &mut self,
        discriminator: &str,
        fields: FieldMap,
    ) -> Result<Device, StoreError> {
        let schema = self.resolve_type(discriminator)?;
        let fields = prepare_base_fields(fields)?;
        if let Some(missing) = missing_required(&fields) {
            return Err(StoreError::InvalidInput(format!("{missing} is required")));
        }

        let tx = self.conn.transaction()?;
        let id = insert_device_tx(&tx, schema.discriminator, &fields, now_ms())?;
        let device = get_device_tx(&tx, id)?.ok_or(StoreError::UnknownDevice(id))?;
        tx.commit()?;
        Ok(device)
    }

    /// Partial update: fields absent from `fields` keep their stored values.
    pub fn update_device(&mut self, id: DeviceId, fields: FieldMap) -> Result<Device, StoreError> {
        let fields = prepare_base_fields(fields)?;

        let tx = self.conn.transaction()?;
        if !update_device_tx(&tx, id, &fields, now_ms())? {
            return Err(StoreError::UnknownDevice(id));
        }
        let device = get_device_tx(&tx, id)?.ok_or(StoreError::UnknownDevice(id))?;
        tx.commit()?;
        Ok(device)
    }

    /// Removes the device, its extension row and every incident connection in one
    /// transaction. Deleting an absent id is a no-op.
    pub fn delete_device(&mut self, id: DeviceId) -> Result<DeleteDeviceOutcome, StoreError> {
        let tx = self.conn.transaction()?;
        let Some(device) = get_device_tx(&tx, id)? else {
            return Ok(DeleteDeviceOutcome {
                deleted: false,
                extension_removed: false,
                connections_removed: 0,
            });
        };

        let connections_removed = delete_incident_connections_tx(&tx, id)?;
        let extension_removed = match self.registry.resolve(&device.kind) {
            Some(schema) => delete_extension_tx(&tx, schema, id)?,
            None => false,
        };
        tx.execute("DELETE FROM devices WHERE id=?1", params![id.get()])?;
        tx.commit()?;

        tracing::debug!(
            device_id = %id,
            connections_removed,
            extension_removed,
            "device deleted"
        );
        Ok(DeleteDeviceOutcome {
            deleted: true,
            extension_removed,
            connections_removed,
        })
    }

    pub fn list_planos(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT plano FROM devices WHERE plano IS NOT NULL ORDER BY plano ASC",
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row.get::<_, String>(0)?);
        }
        Ok(out)
    }
}

pub(super) fn get_device_tx(conn: &Connection, id: DeviceId) -> Result<Option<Device>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DEVICE_COLUMNS} FROM devices WHERE id=?1"
    ))?;
    let mut rows = stmt.query(params![id.get()])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_device(row)?)),
        None => Ok(None),
    }
}

pub(super) fn device_type_tx(conn: &Connection, id: DeviceId) -> Result<Option<String>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT type FROM devices WHERE id=?1",
            params![id.get()],
            |row| row.get::<_, String>(0),
        )
        .optional()?)
}

pub(super) fn device_exists_tx(conn: &Connection, id: DeviceId) -> Result<bool, StoreError> {
    Ok(device_type_tx(conn, id)?.is_some())
}

pub(super) fn insert_device_tx(
    conn: &Connection,
    discriminator: &str,
    fields: &FieldMap,
    now_ms: i64,
) -> Result<DeviceId, StoreError> {
    let mut columns = vec!["type"];
    let mut values = vec![rusqlite::types::Value::Text(discriminator.to_string())];
    for (name, value) in fields {
        columns.push(*name);
        values.push(to_sql_value(value));
    }
    columns.push("last_update_ms");
    values.push(rusqlite::types::Value::Integer(now_ms));

    let placeholders = (1..=values.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute(
        &format!(
            "INSERT INTO devices({}) VALUES ({placeholders})",
            columns.join(", ")
        ),
        params_from_iter(values),
    )?;

    device_id_from_sql(conn.last_insert_rowid())
}

/// Returns false when no row has `id`.
pub(super) fn update_device_tx(
    conn: &Connection,
    id: DeviceId,
    fields: &FieldMap,
    now_ms: i64,
) -> Result<bool, StoreError> {
    let mut assignments = Vec::with_capacity(fields.len() + 1);
    let mut values = Vec::with_capacity(fields.len() + 2);
    for (name, value) in fields {
        values.push(to_sql_value(value));
        assignments.push(format!("{name}=?{}", values.len()));
    }
    values.push(rusqlite::types::Value::Integer(now_ms));
    assignments.push(format!("last_update_ms=?{}", values.len()));
    values.push(rusqlite::types::Value::Integer(id.get()));
    let id_index = values.len();

    let changed = conn.execute(
        &format!(
            "UPDATE devices SET {} WHERE id=?{id_index}",
            assignments.join(", ")
        ),
        params_from_iter(values),
    )?;
    Ok(changed > 0)
}

/// Checks hand-built field maps against the base descriptors and canonicalizes `plano`.
pub(super) fn prepare_base_fields(fields: FieldMap) -> Result<FieldMap, StoreError> {
    let mut out = FieldMap::new();
    for (name, value) in fields {
        let Some(spec) = base_field(name) else {
            return Err(StoreError::InvalidInput(format!("{name} is not a device field")));
        };
        let value = match (spec.kind, value) {
            (_, FieldValue::Null) if spec.required => {
                return Err(StoreError::InvalidInput(format!("{name} cannot be null")));
            }
            (_, FieldValue::Null) => FieldValue::Null,
            (FieldKind::Text, FieldValue::Text(text)) if name == "plano" => {
                FieldValue::Text(canonical_plano(&text)?)
            }
            (FieldKind::Text, value @ FieldValue::Text(_)) => value,
            (FieldKind::Integer, value @ FieldValue::Integer(_)) => value,
            _ => {
                return Err(StoreError::InvalidInput(format!(
                    "{name} must be {}",
                    spec.kind.as_str()
                )));
            }
        };
        out.insert(spec.name, value);
    }
    Ok(out)
}

pub(super) fn missing_required(fields: &FieldMap) -> Option<&'static str> {
    BASE_FIELDS
        .iter()
        .find(|field| field.required && !fields.contains_key(field.name))
        .map(|field| field.name)
}

/// A blank filter means no filter.
pub(super) fn plano_filter(value: Option<&str>) -> Result<Option<String>, StoreError> {
    match value {
        Some(value) if !value.trim().is_empty() => canonical_plano(value).map(Some),
        _ => Ok(None),
    }
}

fn canonical_plano(value: &str) -> Result<String, StoreError> {
    Plano::try_new(value)
        .map(Plano::into_string)
        .map_err(|err| StoreError::invalid(err.message()))
}
