#![forbid(unsafe_code)]

use super::envelope::validation_error;
use pm_core::ids::{ConnectionId, DeviceId};
use pm_core::model::PlanoMatch;
use serde_json::{Map, Value};

pub(crate) fn require_string(args: &Map<String, Value>, key: &str) -> Result<String, Value> {
    let Some(v) = args.get(key).and_then(|v| v.as_str()) else {
        return Err(validation_error(&format!("{key} is required")));
    };
    Ok(v.to_string())
}

pub(crate) fn optional_string(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, Value> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::String(v) => Ok(Some(v.to_string())),
        _ => Err(validation_error(&format!("{key} must be a string"))),
    }
}

fn require_positive_i64(args: &Map<String, Value>, key: &str) -> Result<i64, Value> {
    match args.get(key) {
        None | Some(Value::Null) => Err(validation_error(&format!("{key} is required"))),
        Some(Value::Number(n)) => n
            .as_i64()
            .filter(|v| *v > 0)
            .ok_or_else(|| validation_error(&format!("{key} must be a positive integer"))),
        Some(_) => Err(validation_error(&format!(
            "{key} must be a positive integer"
        ))),
    }
}

pub(crate) fn require_device_id(args: &Map<String, Value>, key: &str) -> Result<DeviceId, Value> {
    let raw = require_positive_i64(args, key)?;
    DeviceId::try_new(raw).map_err(|err| validation_error(&format!("{key}: {}", err.message())))
}

pub(crate) fn require_connection_id(
    args: &Map<String, Value>,
    key: &str,
) -> Result<ConnectionId, Value> {
    let raw = require_positive_i64(args, key)?;
    ConnectionId::try_new(raw).map_err(|err| validation_error(&format!("{key}: {}", err.message())))
}

pub(crate) fn optional_plano_match(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<PlanoMatch>, Value> {
    let Some(raw) = optional_string(args, key)? else {
        return Ok(None);
    };
    PlanoMatch::parse(&raw)
        .map(Some)
        .ok_or_else(|| validation_error(&format!("{key} must be one of: either, from")))
}
