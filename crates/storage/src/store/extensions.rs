#![forbid(unsafe_code)]

use super::devices::device_type_tx;
use super::support::{field_from_sql, is_constraint_violation, to_sql_value};
use super::*;
use pm_core::ids::DeviceId;
use pm_core::model::{ExtensionRecord, FieldMap, FieldValue};
use pm_core::schema::{ExtensionSchema, FieldKind};
use rusqlite::{Connection, params, params_from_iter};

impl SqliteStore {
    pub fn get_extension(
        &self,
        discriminator: &str,
        device_id: DeviceId,
    ) -> Result<Option<ExtensionRecord>, StoreError> {
        let schema = self.resolve_type(discriminator)?;
        get_extension_tx(&self.conn, schema, device_id)
    }

    /// Fails with `ExtensionExists` if the device already has a row for this type.
    pub fn create_extension(
        &mut self,
        discriminator: &str,
        device_id: DeviceId,
        fields: FieldMap,
    ) -> Result<ExtensionRecord, StoreError> {
        let schema = self.resolve_type(discriminator)?;
        let fields = prepare_extension_fields(schema, fields)?;

        let tx = self.conn.transaction()?;
        ensure_device_type_tx(&tx, schema, device_id)?;
        if extension_exists_tx(&tx, schema, device_id)? {
            return Err(StoreError::ExtensionExists {
                discriminator: schema.discriminator,
                device_id,
            });
        }
        insert_extension_tx(&tx, schema, device_id, &fields)?;
        let record = get_extension_tx(&tx, schema, device_id)?.ok_or(
            StoreError::UnknownExtension {
                discriminator: schema.discriminator,
                device_id,
            },
        )?;
        tx.commit()?;
        Ok(record)
    }

    /// Partial update of an existing row; a missing row is `UnknownExtension`.
    pub fn update_extension(
        &mut self,
        discriminator: &str,
        device_id: DeviceId,
        fields: FieldMap,
    ) -> Result<ExtensionRecord, StoreError> {
        let schema = self.resolve_type(discriminator)?;
        let fields = prepare_extension_fields(schema, fields)?;
        let missing = StoreError::UnknownExtension {
            discriminator: schema.discriminator,
            device_id,
        };

        let tx = self.conn.transaction()?;
        if !update_extension_tx(&tx, schema, device_id, &fields)? {
            return Err(missing);
        }
        let record = get_extension_tx(&tx, schema, device_id)?.ok_or(missing)?;
        tx.commit()?;
        Ok(record)
    }

    /// Returns whether a row was removed.
    pub fn delete_extension(
        &mut self,
        discriminator: &str,
        device_id: DeviceId,
    ) -> Result<bool, StoreError> {
        let schema = self.resolve_type(discriminator)?;
        let tx = self.conn.transaction()?;
        let removed = delete_extension_tx(&tx, schema, device_id)?;
        tx.commit()?;
        Ok(removed)
    }
}

pub(super) fn get_extension_tx(
    conn: &Connection,
    schema: &'static ExtensionSchema,
    device_id: DeviceId,
) -> Result<Option<ExtensionRecord>, StoreError> {
    let mut columns = vec!["device_id"];
    columns.extend(schema.fields.iter().map(|field| field.name));

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} WHERE device_id=?1",
        columns.join(", "),
        schema.table
    ))?;
    let mut rows = stmt.query(params![device_id.get()])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let mut fields = FieldMap::new();
    for (index, spec) in schema.fields.iter().enumerate() {
        let raw = row.get::<_, rusqlite::types::Value>(index + 1)?;
        fields.insert(spec.name, field_from_sql(spec, raw)?);
    }

    Ok(Some(ExtensionRecord {
        device_id,
        discriminator: schema.discriminator,
        fields,
    }))
}

pub(super) fn extension_exists_tx(
    conn: &Connection,
    schema: &ExtensionSchema,
    device_id: DeviceId,
) -> Result<bool, StoreError> {
    let count = conn.query_row(
        &format!("SELECT COUNT(1) FROM {} WHERE device_id=?1", schema.table),
        params![device_id.get()],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count > 0)
}

pub(super) fn insert_extension_tx(
    conn: &Connection,
    schema: &'static ExtensionSchema,
    device_id: DeviceId,
    fields: &FieldMap,
) -> Result<(), StoreError> {
    let mut columns = vec!["device_id"];
    let mut values = vec![rusqlite::types::Value::Integer(device_id.get())];
    for (name, value) in fields {
        columns.push(*name);
        values.push(to_sql_value(value));
    }
    let placeholders = (1..=values.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let insert = conn.execute(
        &format!(
            "INSERT INTO {}({}) VALUES ({placeholders})",
            schema.table,
            columns.join(", ")
        ),
        params_from_iter(values),
    );

    let Err(err) = insert else {
        return Ok(());
    };
    if is_constraint_violation(&err) && extension_exists_tx(conn, schema, device_id)? {
        return Err(StoreError::ExtensionExists {
            discriminator: schema.discriminator,
            device_id,
        });
    }
    Err(StoreError::Sql(err))
}

/// Returns false when the device has no row in `schema.table`.
pub(super) fn update_extension_tx(
    conn: &Connection,
    schema: &ExtensionSchema,
    device_id: DeviceId,
    fields: &FieldMap,
) -> Result<bool, StoreError> {
    if fields.is_empty() {
        return extension_exists_tx(conn, schema, device_id);
    }

    let mut assignments = Vec::with_capacity(fields.len());
    let mut values = Vec::with_capacity(fields.len() + 1);
    for (name, value) in fields {
        values.push(to_sql_value(value));
        assignments.push(format!("{name}=?{}", values.len()));
    }
    values.push(rusqlite::types::Value::Integer(device_id.get()));
    let id_index = values.len();

    let changed = conn.execute(
        &format!(
            "UPDATE {} SET {} WHERE device_id=?{id_index}",
            schema.table,
            assignments.join(", ")
        ),
        params_from_iter(values),
    )?;
    Ok(changed > 0)
}

pub(super) fn delete_extension_tx(
    conn: &Connection,
    schema: &ExtensionSchema,
    device_id: DeviceId,
) -> Result<bool, StoreError> {
    let removed = conn.execute(
        &format!("DELETE FROM {} WHERE device_id=?1", schema.table),
        params![device_id.get()],
    )?;
    Ok(removed > 0)
}

/// The owning device must exist and carry the schema's discriminator.
fn ensure_device_type_tx(
    conn: &Connection,
    schema: &ExtensionSchema,
    device_id: DeviceId,
) -> Result<(), StoreError> {
    match device_type_tx(conn, device_id)? {
        None => Err(StoreError::UnknownDevice(device_id)),
        Some(kind) if kind == schema.discriminator => Ok(()),
        Some(kind) => Err(StoreError::InvalidInput(format!(
            "device {device_id} has type {kind}, not {}",
            schema.discriminator
        ))),
    }
}

fn prepare_extension_fields(
    schema: &'static ExtensionSchema,
    fields: FieldMap,
) -> Result<FieldMap, StoreError> {
    let mut out = FieldMap::new();
    for (name, value) in fields {
        let Some(spec) = schema.field(name) else {
            return Err(StoreError::InvalidInput(format!(
                "{name} is not a {} field",
                schema.discriminator
            )));
        };
        let matches_kind = matches!(
            (spec.kind, &value),
            (_, FieldValue::Null)
                | (FieldKind::Text, FieldValue::Text(_))
                | (FieldKind::Integer, FieldValue::Integer(_))
        );
        if !matches_kind || (spec.required && value.is_null()) {
            return Err(StoreError::InvalidInput(format!(
                "{name} must be {}",
                spec.kind.as_str()
            )));
        }
        out.insert(spec.name, value);
    }
    Ok(out)
}
