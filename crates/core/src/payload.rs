#![forbid(unsafe_code)]

use crate::ids::DeviceId;
use crate::model::{FieldMap, FieldValue, UnknownFieldPolicy};
use crate::schema::{
    ExtensionSchema, FieldKind, FieldSpec, ID_FIELD, READ_ONLY_FIELDS, TYPE_FIELD,
    base_field,
};
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayloadError {
    MissingType,
    InvalidType,
    InvalidId,
    WrongKind {
        field: &'static str,
        expected: FieldKind,
    },
    RequiredNull {
        field: &'static str,
    },
    UnknownFields {
        fields: Vec<String>,
    },
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingType => write!(f, "type is required"),
            Self::InvalidType => write!(f, "type must be a non-empty string"),
            Self::InvalidId => write!(f, "id must be a positive integer or null"),
            Self::WrongKind { field, expected } => {
                write!(f, "{field} must be {}", kind_phrase(*expected))
            }
            Self::RequiredNull { field } => write!(f, "{field} cannot be null"),
            Self::UnknownFields { fields } => {
                write!(f, "unknown fields: {}", fields.join(", "))
            }
        }
    }
}

impl std::error::Error for PayloadError {}

fn kind_phrase(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "a string",
        FieldKind::Integer => "an integer",
    }
}

/// A device payload split between the base record and one extension schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionedPayload {
    pub id: Option<DeviceId>,
    pub discriminator: &'static str,
    pub base: FieldMap,
    pub extension: FieldMap,
    /// Keys that matched neither schema.
    pub ignored: Vec<String>,
}

pub fn read_discriminator(payload: &Map<String, Value>) -> Result<&str, PayloadError> {
    match payload.get(TYPE_FIELD) {
        None | Some(Value::Null) => Err(PayloadError::MissingType),
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.trim()),
        Some(_) => Err(PayloadError::InvalidType),
    }
}

pub fn read_id(payload: &Map<String, Value>) -> Result<Option<DeviceId>, PayloadError> {
    match payload.get(ID_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|raw| DeviceId::try_new(raw).ok())
            .map(Some)
            .ok_or(PayloadError::InvalidId),
        Some(_) => Err(PayloadError::InvalidId),
    }
}

/// Splits `payload` into base and extension fields for `schema`.
///
/// Every value is type-checked against its descriptor before anything is returned, so a
/// caller can validate the whole payload before opening a transaction. The `type` key is
/// skipped; callers resolve `schema` from it beforehand.
pub fn partition(
    payload: &Map<String, Value>,
    schema: &'static ExtensionSchema,
    policy: UnknownFieldPolicy,
) -> Result<PartitionedPayload, PayloadError> {
    let id = read_id(payload)?;

    let mut base = FieldMap::new();
    let mut extension = FieldMap::new();
    let mut ignored = Vec::new();

    for (key, value) in payload {
        let key = key.as_str();
        if key == ID_FIELD || key == TYPE_FIELD || READ_ONLY_FIELDS.contains(&key) {
            continue;
        }
        if let Some(spec) = base_field(key) {
            base.insert(spec.name, coerce(spec, value)?);
        } else if let Some(spec) = schema.field(key) {
            extension.insert(spec.name, coerce(spec, value)?);
        } else {
            ignored.push(key.to_string());
        }
    }

    if policy == UnknownFieldPolicy::Reject && !ignored.is_empty() {
        return Err(PayloadError::UnknownFields { fields: ignored });
    }

    Ok(PartitionedPayload {
        id,
        discriminator: schema.discriminator,
        base,
        extension,
        ignored,
    })
}

fn coerce(spec: &'static FieldSpec, value: &Value) -> Result<FieldValue, PayloadError> {
    match (spec.kind, value) {
        (_, Value::Null) if spec.required => Err(PayloadError::RequiredNull { field: spec.name }),
        (_, Value::Null) => Ok(FieldValue::Null),
        (FieldKind::Text, Value::String(text)) => Ok(FieldValue::Text(text.to_string())),
        (FieldKind::Integer, Value::Number(n)) => n
            .as_i64()
            .map(FieldValue::Integer)
            .ok_or(PayloadError::WrongKind {
                field: spec.name,
                expected: spec.kind,
            }),
        _ => Err(PayloadError::WrongKind {
            field: spec.name,
            expected: spec.kind,
        }),
    }
}
