#![forbid(unsafe_code)]

use pm_core::model::{FieldMap, FieldValue};
use pm_core::schema::{ExtensionSchema, FieldKind, FieldSpec, PC_SCHEMA, SubtypeRegistry};
use pm_storage::{ErrorKind, SqliteStore, StoreError};
use rusqlite::Connection;
use serde_json::json;

static PRINTER: ExtensionSchema = ExtensionSchema {
    discriminator: "printer",
    table: "printers",
    fields: &[
        FieldSpec::optional("model", FieldKind::Text),
        FieldSpec::optional("pages_printed", FieldKind::Integer),
    ],
};

static PRINTER_WITH_TONER: ExtensionSchema = ExtensionSchema {
    discriminator: "printer",
    table: "printers",
    fields: &[
        FieldSpec::optional("model", FieldKind::Text),
        FieldSpec::optional("pages_printed", FieldKind::Integer),
        FieldSpec::optional("toner", FieldKind::Text),
    ],
};

fn base_fields(name: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("name", FieldValue::Text(name.to_string()));
    fields.insert("x", FieldValue::Integer(0));
    fields.insert("y", FieldValue::Integer(0));
    fields.insert("status", FieldValue::Text("online".to_string()));
    fields.insert("ip", FieldValue::Text("10.1.1.1".to_string()));
    fields
}

#[test]
fn extension_rows_are_one_per_device() {
    let dir = tempfile::tempdir().expect("temp dir");
    let registry = SubtypeRegistry::builtin().expect("registry");
    let mut store = SqliteStore::open(dir.path(), registry).expect("open store");
    let device = store.create_device("pc", base_fields("pc-1")).expect("create");

    let mut fields = FieldMap::new();
    fields.insert("cpu", FieldValue::Text("ryzen".to_string()));
    let record = store
        .create_extension("pc", device.id, fields.clone())
        .expect("create extension");
    assert_eq!(record.get("cpu"), Some(&FieldValue::Text("ryzen".to_string())));

    let err = store
        .create_extension("pc", device.id, fields)
        .expect_err("second row");
    assert!(matches!(err, StoreError::ExtensionExists { discriminator: "pc", .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let mut patch = FieldMap::new();
    patch.insert("ram", FieldValue::Integer(32));
    let record = store.update_extension("pc", device.id, patch).expect("update");
    assert_eq!(record.get("ram"), Some(&FieldValue::Integer(32)));
    assert_eq!(record.get("cpu"), Some(&FieldValue::Text("ryzen".to_string())));

    assert!(store.delete_extension("pc", device.id).expect("delete"));
    assert!(!store.delete_extension("pc", device.id).expect("delete again"));

    let err = store
        .update_extension("pc", device.id, FieldMap::new())
        .expect_err("row is gone");
    assert!(matches!(err, StoreError::UnknownExtension { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn extension_writes_check_the_owning_device() {
    let dir = tempfile::tempdir().expect("temp dir");
    let registry = SubtypeRegistry::try_new(&[&PC_SCHEMA, &PRINTER]).expect("registry");
    let mut store = SqliteStore::open(dir.path(), registry).expect("open store");
    let pc = store.create_device("pc", base_fields("pc-1")).expect("create");

    let err = store
        .create_extension("printer", pc.id, FieldMap::new())
        .expect_err("wrong type");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let ghost = pm_core::ids::DeviceId::try_new(77).expect("id");
    let err = store
        .create_extension("pc", ghost, FieldMap::new())
        .expect_err("missing device");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let mut wrong = FieldMap::new();
    wrong.insert("model", FieldValue::Text("hp".to_string()));
    let err = store
        .create_extension("pc", pc.id, wrong)
        .expect_err("model is a printer field");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = store.get_extension("robot", pc.id).expect_err("unknown type");
    assert_eq!(err.kind(), ErrorKind::UnsupportedType);
}

#[test]
fn registering_a_type_needs_no_write_path_changes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let registry = SubtypeRegistry::try_new(&[&PC_SCHEMA, &PRINTER]).expect("registry");
    let mut store = SqliteStore::open(dir.path(), registry).expect("open store");

    let payload = json!({
        "name": "printer-3",
        "type": "printer",
        "x": 5,
        "y": 6,
        "status": "online",
        "ip": "10.0.0.30",
        "model": "laserjet",
        "pages_printed": 1200,
        "cpu": "not a printer field"
    });
    let outcome = store
        .upsert_device(payload.as_object().expect("object"))
        .expect("upsert printer");
    assert_eq!(outcome.ignored_fields, vec!["cpu".to_string()]);

    let detail = store.device_detail(outcome.device_id).expect("detail");
    assert_eq!(detail.device.kind, "printer");
    let extension = detail.extension.expect("printer row");
    assert_eq!(extension.discriminator, "printer");
    assert_eq!(extension.get("pages_printed"), Some(&FieldValue::Integer(1200)));
    assert!(store.get_extension("pc", outcome.device_id).expect("get").is_none());

    let removed = store.delete_device(outcome.device_id).expect("delete");
    assert!(removed.extension_removed);
}

#[test]
fn descriptor_drift_requires_a_reset() {
    let dir = tempfile::tempdir().expect("temp dir");
    {
        let registry = SubtypeRegistry::try_new(&[&PC_SCHEMA, &PRINTER]).expect("registry");
        SqliteStore::open(dir.path(), registry).expect("open store");
    }

    let registry = SubtypeRegistry::try_new(&[&PC_SCHEMA, &PRINTER_WITH_TONER]).expect("registry");
    let err = SqliteStore::open(dir.path(), registry).expect_err("toner column is missing");
    match &err {
        StoreError::ResetRequired(message) => {
            assert_eq!(message, "printers is missing column toner");
        }
        other => panic!("expected ResetRequired, got {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Storage);
}

#[test]
fn foreign_databases_and_version_mismatch_are_refused() {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = {
        let registry = SubtypeRegistry::builtin().expect("registry");
        let store = SqliteStore::open(dir.path(), registry).expect("open store");
        store.db_path().expect("db path")
    };

    let raw = Connection::open(&db_path).expect("raw connection");
    raw.execute("UPDATE store_state SET schema_version=99", [])
        .expect("bump version");
    drop(raw);

    let registry = SubtypeRegistry::builtin().expect("registry");
    let err = SqliteStore::open(dir.path(), registry).expect_err("version mismatch");
    assert!(matches!(err, StoreError::ResetRequired(_)), "got {err:?}");

    let foreign = tempfile::tempdir().expect("temp dir");
    let raw = Connection::open(foreign.path().join("planomap.db")).expect("raw connection");
    raw.execute_batch("CREATE TABLE legacy(id INTEGER PRIMARY KEY);")
        .expect("legacy table");
    drop(raw);

    let registry = SubtypeRegistry::builtin().expect("registry");
    let err = SqliteStore::open(foreign.path(), registry).expect_err("foreign database");
    assert!(matches!(err, StoreError::ResetRequired(_)), "got {err:?}");
}

#[test]
fn in_memory_store_supports_the_same_operations() {
    let registry = SubtypeRegistry::builtin().expect("registry");
    let mut store = SqliteStore::open_in_memory(registry).expect("open in memory");
    assert!(store.db_path().is_none());

    let device = store.create_device("pc", base_fields("mem")).expect("create");
    assert_eq!(store.get_device(device.id).expect("get"), Some(device));
}

#[test]
fn undecodable_rows_are_storage_faults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let registry = SubtypeRegistry::builtin().expect("registry");
    let mut store = SqliteStore::open(dir.path(), registry).expect("open store");
    let device = store.create_device("pc", base_fields("pc-1")).expect("create");
    let mut fields = FieldMap::new();
    fields.insert("ram", FieldValue::Integer(8));
    store
        .create_extension("pc", device.id, fields)
        .expect("create extension");

    let raw = Connection::open(store.db_path().expect("db path")).expect("raw connection");
    raw.execute(
        "UPDATE pcs SET ram='lots' WHERE device_id=?1",
        [device.id.get()],
    )
    .expect("corrupt ram");

    let err = store.device_detail(device.id).expect_err("ram is text");
    assert!(matches!(err, StoreError::CorruptRow(_)), "got {err:?}");
    assert_eq!(err.kind(), ErrorKind::Storage);

    raw.execute(
        "INSERT INTO devices(id, type, name, x, y, status, ip, last_update_ms) \
         VALUES (0, 'pc', 'ghost', 0, 0, 'online', '10.0.0.1', 0)",
        [],
    )
    .expect("insert row with id 0");
    let err = store
        .list_devices(Default::default())
        .expect_err("id 0 cannot be decoded");
    assert!(matches!(err, StoreError::CorruptRow(_)), "got {err:?}");
    assert_eq!(err.kind(), ErrorKind::Storage);
}
