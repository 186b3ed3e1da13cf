#![forbid(unsafe_code)]

use serde_json::{Value, json};

pub(crate) const STATUS_BAD_REQUEST: u16 = 400;
pub(crate) const STATUS_NOT_FOUND: u16 = 404;
pub(crate) const STATUS_CONFLICT: u16 = 409;
pub(crate) const STATUS_UNPROCESSABLE: u16 = 422;
pub(crate) const STATUS_INTERNAL: u16 = 500;

pub(crate) fn ok(result: Value) -> Value {
    json!({
        "success": true,
        "result": result,
        "error": null
    })
}

pub(crate) fn error(code: &str, message: &str, status: u16) -> Value {
    json!({
        "success": false,
        "result": null,
        "error": {
            "code": code,
            "message": message,
            "status": status
        }
    })
}

pub(crate) fn bad_request(message: &str) -> Value {
    error("BAD_REQUEST", message, STATUS_BAD_REQUEST)
}

pub(crate) fn validation_error(message: &str) -> Value {
    error("VALIDATION_ERROR", message, STATUS_UNPROCESSABLE)
}

/// Attaches the caller's request id; responses always carry the key, `null` when absent.
pub(crate) fn with_request_id(mut response: Value, id: Value) -> Value {
    if let Some(object) = response.as_object_mut() {
        object.insert("id".to_string(), id);
    }
    response
}
