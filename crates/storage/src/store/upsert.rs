#![forbid(unsafe_code)]

use super::devices::{
    device_type_tx, insert_device_tx, missing_required, prepare_base_fields, update_device_tx,
};
use super::extensions::{insert_extension_tx, update_extension_tx};
use super::support::now_ms;
use super::*;
use pm_core::payload::{PartitionedPayload, PayloadError, partition, read_discriminator, read_id};
use serde_json::{Map, Value};

impl SqliteStore {
    /// Create-or-update selected by the presence of `id` in `payload`.
    ///
    /// The payload is resolved and type-checked before a transaction is opened. Base
    /// and extension writes then commit together or not at all. Updating a device
    /// whose extension row is missing creates that row.
    ///
    /// `type` is required on create. On update it may be omitted, in which case the
    /// stored type applies; if given it must match the stored type.
    pub fn upsert_device(
        &mut self,
        payload: &Map<String, Value>,
    ) -> Result<UpsertOutcome, StoreError> {
        let id = read_id(payload)?;
        let requested = match read_discriminator(payload) {
            Ok(discriminator) => Some(discriminator),
            Err(PayloadError::MissingType) if id.is_some() => None,
            Err(err) => {
                tracing::warn!(error = %err, "upsert rejected: no usable type");
                return Err(err.into());
            }
        };
        if let Some(discriminator) = requested {
            if let Err(err) = self.resolve_type(discriminator) {
                tracing::warn!(discriminator, "upsert rejected: unsupported type");
                return Err(err);
            }
        }

        let stored = match id {
            Some(device_id) => Some(
                device_type_tx(&self.conn, device_id)?
                    .ok_or(StoreError::UnknownDevice(device_id))?,
            ),
            None => None,
        };
        if let (Some(device_id), Some(requested), Some(stored)) =
            (id, requested, stored.as_deref())
        {
            if requested != stored {
                return Err(StoreError::InvalidInput(format!(
                    "device {device_id} has type {stored}; type cannot change to {requested}"
                )));
            }
        }
        let Some(discriminator) = requested.or(stored.as_deref()) else {
            return Err(PayloadError::MissingType.into());
        };
        let schema = self.resolve_type(discriminator)?;

        let PartitionedPayload {
            id,
            discriminator,
            base,
            extension,
            ignored,
        } = partition(payload, schema, self.options.unknown_fields)?;
        if !ignored.is_empty() {
            tracing::warn!(
                discriminator,
                fields = %ignored.join(","),
                "upsert dropped unknown fields"
            );
        }
        let base = prepare_base_fields(base)?;
        let now = now_ms();

        let (device_id, created) = match id {
            None => {
                if let Some(missing) = missing_required(&base) {
                    return Err(StoreError::InvalidInput(format!("{missing} is required")));
                }
                let tx = self.conn.transaction()?;
                let device_id = insert_device_tx(&tx, discriminator, &base, now)?;
                insert_extension_tx(&tx, schema, device_id, &extension)?;
                tx.commit()?;
                (device_id, true)
            }
            Some(device_id) => {
                let tx = self.conn.transaction()?;
                if !update_device_tx(&tx, device_id, &base, now)? {
                    return Err(StoreError::UnknownDevice(device_id));
                }
                if !update_extension_tx(&tx, schema, device_id, &extension)? {
                    tracing::debug!(%device_id, discriminator, "materializing missing extension row");
                    insert_extension_tx(&tx, schema, device_id, &extension)?;
                }
                tx.commit()?;
                (device_id, false)
            }
        };

        tracing::debug!(
            %device_id,
            discriminator,
            created,
            base_fields = base.len(),
            extension_fields = extension.len(),
            "device upserted"
        );
        Ok(UpsertOutcome {
            device_id,
            created,
            ignored_fields: ignored,
        })
    }
}
