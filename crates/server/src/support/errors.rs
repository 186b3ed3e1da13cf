#![forbid(unsafe_code)]

use super::envelope::{
    STATUS_BAD_REQUEST, STATUS_CONFLICT, STATUS_INTERNAL, STATUS_NOT_FOUND, STATUS_UNPROCESSABLE,
    error,
};
use pm_storage::{ErrorKind, StoreError};
use serde_json::Value;

pub(crate) fn status_for(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::Validation => STATUS_UNPROCESSABLE,
        ErrorKind::NotFound => STATUS_NOT_FOUND,
        ErrorKind::UnsupportedType => STATUS_BAD_REQUEST,
        ErrorKind::Conflict => STATUS_CONFLICT,
        ErrorKind::Storage => STATUS_INTERNAL,
    }
}

pub(crate) fn format_store_error(err: &StoreError) -> String {
    match err {
        StoreError::Io(e) => format!("IO: {e}"),
        StoreError::Sql(e) => format!("SQL: {e}"),
        StoreError::Registry(e) => format!("Registry: {e}"),
        StoreError::Payload(e) => e.to_string(),
        StoreError::InvalidInput(message) => message.clone(),
        StoreError::ResetRequired(message) => format!("Reset required: {message}"),
        StoreError::CorruptRow(message) => format!("Corrupt row: {message}"),
        StoreError::UnknownDevice(id) => format!("Device {id} not found"),
        StoreError::UnknownConnection(id) => format!("Connection {id} not found"),
        StoreError::UnknownExtension {
            discriminator,
            device_id,
        } => format!("No {discriminator} record for device {device_id}"),
        StoreError::UnsupportedType(kind) => format!("Unsupported device type: {kind}"),
        StoreError::ExtensionExists {
            discriminator,
            device_id,
        } => format!("A {discriminator} record already exists for device {device_id}"),
    }
}

pub(crate) fn store_error(op: &str, err: StoreError) -> Value {
    let kind = err.kind();
    let message = format_store_error(&err);
    if kind == ErrorKind::Storage {
        tracing::error!(op, error = %err, "storage failure");
    } else {
        tracing::debug!(op, code = kind.code(), error = %err, "request failed");
    }
    error(kind.code(), &message, status_for(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_core::ids::DeviceId;
    use pm_core::payload::PayloadError;

    #[test]
    fn store_errors_map_to_transport_statuses() {
        let id = DeviceId::try_new(3).expect("id");
        let cases = [
            (StoreError::InvalidInput("x".to_string()), "VALIDATION_ERROR", 422),
            (StoreError::UnknownDevice(id), "NOT_FOUND", 404),
            (StoreError::UnsupportedType("robot".to_string()), "UNSUPPORTED_TYPE", 400),
            (StoreError::Payload(PayloadError::MissingType), "UNSUPPORTED_TYPE", 400),
            (
                StoreError::ExtensionExists {
                    discriminator: "pc",
                    device_id: id,
                },
                "CONFLICT",
                409,
            ),
            (StoreError::ResetRequired("schema".to_string()), "STORAGE_ERROR", 500),
            (StoreError::CorruptRow("ram".to_string()), "STORAGE_ERROR", 500),
        ];

        for (err, code, status) in cases {
            let response = store_error("test", err);
            assert_eq!(response["success"], false);
            assert_eq!(response["error"]["code"], code);
            assert_eq!(response["error"]["status"], status);
        }
    }

    #[test]
    fn messages_name_the_offending_value() {
        let id = DeviceId::try_new(12).expect("id");
        assert_eq!(
            format_store_error(&StoreError::UnknownDevice(id)),
            "Device 12 not found"
        );
        assert_eq!(
            format_store_error(&StoreError::UnsupportedType("robot".to_string())),
            "Unsupported device type: robot"
        );
    }
}
