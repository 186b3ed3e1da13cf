#![forbid(unsafe_code)]

pub mod model;
pub mod payload;
pub mod schema;

pub mod ids {
    use serde::Serialize;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
    #[serde(transparent)]
    pub struct DeviceId(i64);

    impl DeviceId {
        pub fn get(self) -> i64 {
            self.0
        }

        pub fn try_new(value: i64) -> Result<Self, RowIdError> {
            validate_row_id(value)?;
            Ok(Self(value))
        }
    }

    impl std::fmt::Display for DeviceId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
    #[serde(transparent)]
    pub struct ConnectionId(i64);

    impl ConnectionId {
        pub fn get(self) -> i64 {
            self.0
        }

        pub fn try_new(value: i64) -> Result<Self, RowIdError> {
            validate_row_id(value)?;
            Ok(Self(value))
        }
    }

    impl std::fmt::Display for ConnectionId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum RowIdError {
        NotPositive,
    }

    impl RowIdError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::NotPositive => "id must be a positive integer",
            }
        }
    }

    fn validate_row_id(value: i64) -> Result<(), RowIdError> {
        if value <= 0 {
            return Err(RowIdError::NotPositive);
        }
        Ok(())
    }

    /// Floor-plan identifier used to group devices.
    #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
    #[serde(transparent)]
    pub struct Plano(String);

    impl Plano {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn into_string(self) -> String {
            self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, PlanoError> {
            let value = value.into();
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(PlanoError::Empty);
            }
            if trimmed.chars().any(|c| c.is_control()) {
                return Err(PlanoError::ContainsControl);
            }
            Ok(Self(trimmed.to_string()))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum PlanoError {
        Empty,
        ContainsControl,
    }

    impl PlanoError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::Empty => "plano must not be empty",
                Self::ContainsControl => "plano contains control characters",
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    #[serde(transparent)]
    pub struct ConnectionType(String);

    impl ConnectionType {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn into_string(self) -> String {
            self.0
        }

        /// Accepts any short tag; "ethernet" and "fiber" are the usual values.
        pub fn try_new(value: impl Into<String>) -> Result<Self, ConnectionTypeError> {
            let value = value.into();
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(ConnectionTypeError::Empty);
            }
            if trimmed.len() > 64 {
                return Err(ConnectionTypeError::TooLong);
            }
            if trimmed.chars().any(|c| c.is_control()) {
                return Err(ConnectionTypeError::ContainsControl);
            }
            Ok(Self(trimmed.to_lowercase()))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum ConnectionTypeError {
        Empty,
        TooLong,
        ContainsControl,
    }

    impl ConnectionTypeError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::Empty => "connection_type must not be empty",
                Self::TooLong => "connection_type is too long",
                Self::ContainsControl => "connection_type contains control characters",
            }
        }
    }

}
