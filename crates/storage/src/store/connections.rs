#![forbid(unsafe_code)]

use super::devices::{device_exists_tx, plano_filter};
use super::support::{CONNECTION_COLUMNS, connection_id_from_sql, read_connection};
use super::*;
use pm_core::ids::{ConnectionId, ConnectionType, DeviceId};
use pm_core::model::{Connection as DeviceConnection, PlanoMatch};
use rusqlite::{Connection, params};

impl SqliteStore {
    /// Connections in insertion order. A plano filter keeps edges whose endpoints lie
    /// on that plano, per `PlanoMatch`.
    pub fn list_connections(
        &self,
        request: ListConnectionsRequest,
    ) -> Result<Vec<DeviceConnection>, StoreError> {
        let plano = plano_filter(request.plano.as_deref())?;
        let plano_match = request.plano_match.unwrap_or(self.options.plano_match);

        let mut stmt;
        let mut rows = match (plano.as_deref(), plano_match) {
            (None, _) => {
                stmt = self.conn.prepare(&format!(
                    "SELECT {CONNECTION_COLUMNS} FROM device_connections ORDER BY id ASC"
                ))?;
                stmt.query([])?
            }
            (Some(plano), PlanoMatch::From) => {
                stmt = self.conn.prepare(
                    "SELECT c.id, c.from_device_id, c.to_device_id, c.connection_type, c.description \
                     FROM device_connections c \
                     JOIN devices f ON f.id = c.from_device_id \
                     WHERE f.plano = ?1 \
                     ORDER BY c.id ASC",
                )?;
                stmt.query(params![plano])?
            }
            (Some(plano), PlanoMatch::Either) => {
                stmt = self.conn.prepare(
                    "SELECT c.id, c.from_device_id, c.to_device_id, c.connection_type, c.description \
                     FROM device_connections c \
                     JOIN devices f ON f.id = c.from_device_id \
                     JOIN devices t ON t.id = c.to_device_id \
                     WHERE f.plano = ?1 OR t.plano = ?1 \
                     ORDER BY c.id ASC",
                )?;
                stmt.query(params![plano])?
            }
        };

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(read_connection(row)?);
        }
        Ok(out)
    }

    pub fn get_connection(&self, id: ConnectionId) -> Result<Option<DeviceConnection>, StoreError> {
        get_connection_tx(&self.conn, id)
    }

    /// Rejects self-loops and endpoints that do not exist; nothing is written on failure.
    pub fn create_connection(
        &mut self,
        request: CreateConnectionRequest,
    ) -> Result<DeviceConnection, StoreError> {
        if request.from_device_id == request.to_device_id {
            return Err(StoreError::invalid(
                "connection endpoints must be different devices",
            ));
        }
        let connection_type = ConnectionType::try_new(request.connection_type)
            .map_err(|err| StoreError::invalid(err.message()))?;
        let description = request
            .description
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let tx = self.conn.transaction()?;
        for endpoint in [request.from_device_id, request.to_device_id] {
            if !device_exists_tx(&tx, endpoint)? {
                return Err(StoreError::InvalidInput(format!(
                    "device {endpoint} does not exist"
                )));
            }
        }

        tx.execute(
            "INSERT INTO device_connections(from_device_id, to_device_id, connection_type, description) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                request.from_device_id.get(),
                request.to_device_id.get(),
                connection_type.as_str(),
                description,
            ],
        )?;
        let id = connection_id_from_sql(tx.last_insert_rowid())?;
        let connection = get_connection_tx(&tx, id)?.ok_or(StoreError::UnknownConnection(id))?;
        tx.commit()?;

        tracing::debug!(
            connection_id = %id,
            from = %connection.from_device_id,
            to = %connection.to_device_id,
            connection_type = %connection.connection_type,
            "connection created"
        );
        Ok(connection)
    }

    /// Returns whether an edge was removed; absent ids are a no-op.
    pub fn delete_connection(&mut self, id: ConnectionId) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM device_connections WHERE id=?1",
            params![id.get()],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }
}

fn get_connection_tx(
    conn: &Connection,
    id: ConnectionId,
) -> Result<Option<DeviceConnection>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONNECTION_COLUMNS} FROM device_connections WHERE id=?1"
    ))?;
    let mut rows = stmt.query(params![id.get()])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_connection(row)?)),
        None => Ok(None),
    }
}

/// Only called from device deletion, inside its transaction.
pub(super) fn delete_incident_connections_tx(
    conn: &Connection,
    device_id: DeviceId,
) -> Result<usize, StoreError> {
    Ok(conn.execute(
        "DELETE FROM device_connections WHERE from_device_id=?1 OR to_device_id=?1",
        params![device_id.get()],
    )?)
}
