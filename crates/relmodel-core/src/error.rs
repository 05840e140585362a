//! Error types for relmodel operations.

use std::fmt;

/// The primary error type for all relmodel operations.
#[derive(Debug)]
pub enum Error {
    /// Validation and construction errors raised before any driver call
    Model(ModelError),
    /// Errors reported by the database driver
    Driver(DriverError),
    /// Serialization/deserialization errors
    Serde(String),
    /// Custom error with message
    Custom(String),
}

/// A validation error raised by the filter builder, the mapper or the CRUD layer.
///
/// `expected` carries the column catalog (as a JSON object) when the caller
/// needs it to render a precise message.
#[derive(Debug, Clone)]
pub struct ModelError {
    pub kind: ModelErrorKind,
    pub message: String,
    pub key: Option<String>,
    pub expected: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorKind {
    /// The where argument is not an object, or a where entry is malformed
    BadWhereStructure,
    /// A filter or order key is not a column of the model
    UnknownColumn,
    /// Unrecognized condition token
    UnknownCondition,
    /// Unrecognized chain token
    UnknownChain,
    /// Unrecognized sort direction token
    UnknownDirection,
    /// `first`/`last` without a creation timestamp column
    MissingOrderColumn,
    /// Soft delete requested without a delete timestamp column
    MissingDeleteColumn,
    /// A required column is absent from a full payload
    RequiredFieldMissing,
    /// A value does not match its column type
    TypeMismatch,
    /// A partial payload contained no known columns
    EmptyPartialUpdate,
    /// A payload is not an object, or a batch is empty
    InvalidPayload,
    /// A unique constraint rejected a write
    DuplicateValue,
}

impl ModelErrorKind {
    /// Stable machine-readable name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            ModelErrorKind::BadWhereStructure => "bad_where_structure",
            ModelErrorKind::UnknownColumn => "unknown_column",
            ModelErrorKind::UnknownCondition => "unknown_condition",
            ModelErrorKind::UnknownChain => "unknown_chain",
            ModelErrorKind::UnknownDirection => "unknown_direction",
            ModelErrorKind::MissingOrderColumn => "missing_order_column",
            ModelErrorKind::MissingDeleteColumn => "missing_delete_column",
            ModelErrorKind::RequiredFieldMissing => "required_field_missing",
            ModelErrorKind::TypeMismatch => "type_mismatch",
            ModelErrorKind::EmptyPartialUpdate => "empty_partial_update",
            ModelErrorKind::InvalidPayload => "invalid_payload",
            ModelErrorKind::DuplicateValue => "duplicate_value",
        }
    }
}

/// An error reported by the driver collaborator.
///
/// `code` is the dialect-specific code (SQLSTATE for Postgres, the numeric
/// error number or symbolic name for MySQL). `detail` is the raw detail text
/// when the driver provides one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
}

impl ModelError {
    /// Create a new model error of the given kind.
    pub fn new(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            key: None,
            expected: None,
        }
    }

    /// Attach the offending key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach the expected column catalog.
    pub fn with_expected(mut self, expected: serde_json::Value) -> Self {
        self.expected = Some(expected);
        self
    }
}

impl DriverError {
    /// Create a driver error with a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            detail: None,
        }
    }

    /// Attach the driver's detail text.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Is this a unique constraint violation on a Postgres-style backend?
    pub fn is_unique_violation(&self) -> bool {
        self.code == "23505"
    }
}

impl Error {
    /// Shorthand for a model error without key or catalog context.
    pub fn model(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Error::Model(ModelError::new(kind, message))
    }

    /// The model error kind, if this is a validation error.
    pub fn model_kind(&self) -> Option<ModelErrorKind> {
        match self {
            Error::Model(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Get the driver error code if available (e.g., "23505" for unique violation)
    pub fn driver_code(&self) -> Option<&str> {
        match self {
            Error::Driver(d) => Some(d.code.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Model(e) => write!(f, "Model error: {}", e),
            Error::Driver(e) => write!(f, "Driver error: {}", e),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Model(e) => Some(e),
            Error::Driver(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(key) = &self.key {
            write!(f, "{} ({}: '{}')", self.message, self.kind.as_str(), key)
        } else {
            write!(f, "{} ({})", self.message, self.kind.as_str())
        }
    }
}

impl std::error::Error for ModelError {}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for DriverError {}

impl From<ModelError> for Error {
    fn from(err: ModelError) -> Self {
        Error::Model(err)
    }
}

impl From<DriverError> for Error {
    fn from(err: DriverError) -> Self {
        Error::Driver(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Result type alias for relmodel operations.
pub type Result<T> = std::result::Result<T, Error>;
