#![forbid(unsafe_code)]

use pm_core::ids::{ConnectionId, DeviceId};
use pm_core::payload::PayloadError;
use pm_core::schema::RegistryError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("invalid payload: {0}")]
    Payload(#[from] PayloadError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("RESET_REQUIRED: {0}")]
    ResetRequired(String),
    #[error("corrupt row: {0}")]
    CorruptRow(String),
    #[error("unknown device id: {0}")]
    UnknownDevice(DeviceId),
    #[error("unknown connection id: {0}")]
    UnknownConnection(ConnectionId),
    #[error("no {discriminator} record for device {device_id}")]
    UnknownExtension {
        discriminator: &'static str,
        device_id: DeviceId,
    },
    #[error("unsupported device type: {0}")]
    UnsupportedType(String),
    #[error("{discriminator} record already exists for device {device_id}")]
    ExtensionExists {
        discriminator: &'static str,
        device_id: DeviceId,
    },
}

/// Caller-facing error classes; the boundary maps these to transport statuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    UnsupportedType,
    Conflict,
    Storage,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::UnsupportedType => "UNSUPPORTED_TYPE",
            Self::Conflict => "CONFLICT",
            Self::Storage => "STORAGE_ERROR",
        }
    }
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_)
            | Self::Sql(_)
            | Self::Registry(_)
            | Self::ResetRequired(_)
            | Self::CorruptRow(_) => ErrorKind::Storage,
            Self::Payload(PayloadError::MissingType | PayloadError::InvalidType) => {
                ErrorKind::UnsupportedType
            }
            Self::Payload(_) | Self::InvalidInput(_) => ErrorKind::Validation,
            Self::UnknownDevice(_) | Self::UnknownConnection(_) | Self::UnknownExtension { .. } => {
                ErrorKind::NotFound
            }
            Self::UnsupportedType(_) => ErrorKind::UnsupportedType,
            Self::ExtensionExists { .. } => ErrorKind::Conflict,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
