#![forbid(unsafe_code)]

mod connections;
mod devices;
mod error;
mod extensions;
mod requests;
mod support;
mod upsert;

pub use error::{ErrorKind, StoreError};
pub use requests::*;

use pm_core::schema::{BASE_FIELDS, ExtensionSchema, SubtypeRegistry};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DB_FILE_NAME: &str = "planomap.db";
const SCHEMA_VERSION: i64 = 1;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: Option<PathBuf>,
    registry: SubtypeRegistry,
    options: StoreOptions,
}

impl SqliteStore {
    pub fn open(
        storage_dir: impl AsRef<Path>,
        registry: SubtypeRegistry,
    ) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        let store = Self::from_connection(conn, Some(storage_dir), registry)?;
        tracing::debug!(path = %db_path.display(), types = store.registry.len(), "store opened");
        Ok(store)
    }

    pub fn open_in_memory(registry: SubtypeRegistry) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None, registry)
    }

    fn from_connection(
        conn: Connection,
        storage_dir: Option<PathBuf>,
        registry: SubtypeRegistry,
    ) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        preflight_gate(&conn)?;
        install_schema(&conn, &registry)?;

        Ok(Self {
            conn,
            storage_dir,
            registry,
            options: StoreOptions::default(),
        })
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    pub fn db_path(&self) -> Option<PathBuf> {
        self.storage_dir.as_ref().map(|dir| dir.join(DB_FILE_NAME))
    }

    pub fn registry(&self) -> &SubtypeRegistry {
        &self.registry
    }

    fn resolve_type(&self, discriminator: &str) -> Result<&'static ExtensionSchema, StoreError> {
        self.registry
            .resolve(discriminator)
            .ok_or_else(|| StoreError::UnsupportedType(discriminator.trim().to_string()))
    }
}

fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let has_state = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='store_state'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some();

    if !has_state {
        let other_tables = conn.query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |row| row.get::<_, i64>(0),
        )?;
        if other_tables > 0 {
            return Err(StoreError::ResetRequired(
                "database was not created by this store".to_string(),
            ));
        }
        return Ok(());
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(v) => Err(StoreError::ResetRequired(format!(
            "schema version {v} does not match {SCHEMA_VERSION}"
        ))),
        None => Err(StoreError::ResetRequired(
            "schema state row is missing".to_string(),
        )),
    }
}

fn install_schema(conn: &Connection, registry: &SubtypeRegistry) -> Result<(), StoreError> {
    let now_ms = support::now_ms();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS devices (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          type TEXT NOT NULL,
          name TEXT NOT NULL,
          x INTEGER NOT NULL,
          y INTEGER NOT NULL,
          status TEXT NOT NULL,
          ip TEXT NOT NULL,
          plano TEXT,
          descripcion TEXT,
          place_name TEXT,
          usuario TEXT,
          last_update_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_devices_plano
          ON devices(plano, id);

        CREATE TABLE IF NOT EXISTS device_connections (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          from_device_id INTEGER NOT NULL
            REFERENCES devices(id) ON DELETE CASCADE,
          to_device_id INTEGER NOT NULL
            REFERENCES devices(id) ON DELETE CASCADE,
          connection_type TEXT NOT NULL,
          description TEXT,
          CONSTRAINT no_self_connection CHECK(from_device_id <> to_device_id)
        );

        CREATE INDEX IF NOT EXISTS idx_device_connections_from
          ON device_connections(from_device_id);
        CREATE INDEX IF NOT EXISTS idx_device_connections_to
          ON device_connections(to_device_id);
        "#,
    )?;

    ensure_columns(conn, "devices", BASE_FIELDS.iter().map(|field| field.name))?;

    for schema in registry.schemas() {
        conn.execute_batch(&extension_table_ddl(schema))?;
        ensure_columns(conn, schema.table, schema.fields.iter().map(|field| field.name))?;
    }

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}

fn extension_table_ddl(schema: &ExtensionSchema) -> String {
    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  device_id INTEGER PRIMARY KEY\n    REFERENCES devices(id) ON DELETE CASCADE",
        schema.table
    );
    for field in schema.fields {
        ddl.push_str(&format!(",\n  {} {}", field.name, field.kind.sql_type()));
    }
    ddl.push_str("\n);");
    ddl
}

/// A descriptor that gained a field after its table was created needs a reset.
fn ensure_columns<'a>(
    conn: &Connection,
    table: &str,
    expected: impl Iterator<Item = &'a str>,
) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let mut rows = stmt.query([])?;
    let mut present = BTreeSet::new();
    while let Some(row) = rows.next()? {
        present.insert(row.get::<_, String>(1)?);
    }

    for column in expected {
        if !present.contains(column) {
            return Err(StoreError::ResetRequired(format!(
                "{table} is missing column {column}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_core::schema::PC_SCHEMA;

    #[test]
    fn extension_ddl_follows_descriptor() {
        let ddl = extension_table_ddl(&PC_SCHEMA);
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS pcs ("));
        assert!(ddl.contains("device_id INTEGER PRIMARY KEY"));
        assert!(ddl.contains("ON DELETE CASCADE"));
        assert!(ddl.contains(",\n  ram INTEGER"));
        assert!(ddl.contains(",\n  cpu TEXT"));
    }

    #[test]
    fn in_memory_store_installs_every_registered_table() {
        let registry = SubtypeRegistry::builtin().expect("registry");
        let store = SqliteStore::open_in_memory(registry).expect("open store");
        let mut stmt = store
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .expect("prepare");
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .expect("query")
            .collect::<Result<Vec<_>, _>>()
            .expect("tables");
        for expected in ["device_connections", "devices", "pcs", "store_state"] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }
}
