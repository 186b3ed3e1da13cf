#![forbid(unsafe_code)]

//! Field descriptors for the base device record and the per-type extension records.
//!
//! Writes are routed by these tables rather than by inspecting storage columns, so a
//! new device type only needs a new [`ExtensionSchema`] registered at startup.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Integer,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
        }
    }

    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Required fields must be supplied on create and can never be cleared.
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Discriminator key in every device payload.
pub const TYPE_FIELD: &str = "type";
/// Surrogate key; its presence selects the update path.
pub const ID_FIELD: &str = "id";

/// Keys owned by the store. Payloads may echo them back; they are never written.
pub const READ_ONLY_FIELDS: &[&str] = &[
    "last_update",
    "last_update_ms",
    "device_id",
    "has_extension",
];

pub const BASE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldKind::Text),
    FieldSpec::required("x", FieldKind::Integer),
    FieldSpec::required("y", FieldKind::Integer),
    FieldSpec::required("status", FieldKind::Text),
    FieldSpec::required("ip", FieldKind::Text),
    FieldSpec::optional("plano", FieldKind::Text),
    FieldSpec::optional("descripcion", FieldKind::Text),
    FieldSpec::optional("place_name", FieldKind::Text),
    FieldSpec::optional("usuario", FieldKind::Text),
];

pub fn base_field(name: &str) -> Option<&'static FieldSpec> {
    BASE_FIELDS.iter().find(|field| field.name == name)
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ExtensionSchema {
    pub discriminator: &'static str,
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
}

impl ExtensionSchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }
}

pub static PC_SCHEMA: ExtensionSchema = ExtensionSchema {
    discriminator: "pc",
    table: "pcs",
    fields: &[
        FieldSpec::optional("user", FieldKind::Text),
        FieldSpec::optional("cpu_benchmark", FieldKind::Text),
        FieldSpec::optional("cpu", FieldKind::Text),
        FieldSpec::optional("ram", FieldKind::Integer),
        FieldSpec::optional("office", FieldKind::Text),
        FieldSpec::optional("antivirus", FieldKind::Text),
        FieldSpec::optional("motherboard", FieldKind::Text),
        FieldSpec::optional("disks", FieldKind::Text),
        FieldSpec::optional("ram_ddr", FieldKind::Text),
        FieldSpec::optional("gpu", FieldKind::Text),
        FieldSpec::optional("gpu_memory", FieldKind::Text),
    ],
};

pub static BUILTIN_SCHEMAS: &[&ExtensionSchema] = &[&PC_SCHEMA];

/// Tables the store owns regardless of registered types.
const RESERVED_TABLES: &[&str] = &["devices", "device_connections", "store_state"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    InvalidIdentifier { value: &'static str },
    DuplicateDiscriminator { discriminator: &'static str },
    DuplicateTable { table: &'static str },
    ReservedTable { table: &'static str },
    DuplicateField {
        discriminator: &'static str,
        field: &'static str,
    },
    FieldCollision {
        discriminator: &'static str,
        field: &'static str,
    },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier { value } => write!(f, "invalid identifier: {value:?}"),
            Self::DuplicateDiscriminator { discriminator } => {
                write!(f, "discriminator registered twice: {discriminator}")
            }
            Self::DuplicateTable { table } => write!(f, "extension table used twice: {table}"),
            Self::ReservedTable { table } => write!(f, "extension table name is reserved: {table}"),
            Self::DuplicateField {
                discriminator,
                field,
            } => write!(f, "{discriminator}: field declared twice: {field}"),
            Self::FieldCollision {
                discriminator,
                field,
            } => write!(
                f,
                "{discriminator}: field collides with a base or reserved field: {field}"
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Immutable discriminator → extension schema table, validated once at startup.
#[derive(Clone, Debug)]
pub struct SubtypeRegistry {
    schemas: BTreeMap<&'static str, &'static ExtensionSchema>,
}

impl SubtypeRegistry {
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::try_new(BUILTIN_SCHEMAS)
    }

    pub fn try_new(schemas: &[&'static ExtensionSchema]) -> Result<Self, RegistryError> {
        let mut by_discriminator = BTreeMap::new();
        let mut tables = BTreeSet::new();

        for schema in schemas {
            validate_identifier(schema.discriminator)?;
            validate_identifier(schema.table)?;
            if RESERVED_TABLES.contains(&schema.table) {
                return Err(RegistryError::ReservedTable {
                    table: schema.table,
                });
            }
            if !tables.insert(schema.table) {
                return Err(RegistryError::DuplicateTable {
                    table: schema.table,
                });
            }

            let mut names = BTreeSet::new();
            for field in schema.fields {
                validate_identifier(field.name)?;
                if is_reserved_field(field.name) {
                    return Err(RegistryError::FieldCollision {
                        discriminator: schema.discriminator,
                        field: field.name,
                    });
                }
                if !names.insert(field.name) {
                    return Err(RegistryError::DuplicateField {
                        discriminator: schema.discriminator,
                        field: field.name,
                    });
                }
            }

            if by_discriminator
                .insert(schema.discriminator, *schema)
                .is_some()
            {
                return Err(RegistryError::DuplicateDiscriminator {
                    discriminator: schema.discriminator,
                });
            }
        }

        Ok(Self {
            schemas: by_discriminator,
        })
    }

    pub fn resolve(&self, discriminator: &str) -> Option<&'static ExtensionSchema> {
        self.schemas.get(discriminator.trim()).copied()
    }

    pub fn discriminators(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.schemas.keys().copied()
    }

    pub fn schemas(&self) -> impl Iterator<Item = &'static ExtensionSchema> + '_ {
        self.schemas.values().copied()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn is_reserved_field(name: &str) -> bool {
    name == ID_FIELD
        || name == TYPE_FIELD
        || READ_ONLY_FIELDS.contains(&name)
        || base_field(name).is_some()
}

/// Table and column names are spliced into SQL, so only `[a-z_][a-z0-9_]*` is allowed.
fn validate_identifier(value: &'static str) -> Result<(), RegistryError> {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return Err(RegistryError::InvalidIdentifier { value });
    };
    if !(first.is_ascii_lowercase() || first == '_') {
        return Err(RegistryError::InvalidIdentifier { value });
    }
    if value.len() > 64
        || !chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
    {
        return Err(RegistryError::InvalidIdentifier { value });
    }
    Ok(())
}
