//! Error taxonomy shared by schema declaration and session access
//!
//! Error codes:
//! - OBJS_NO_SUCH_FIELD (REJECT)
//! - OBJS_DUPLICATE_FIELD_NAME (FATAL)
//! - OBJS_DUPLICATE_FIELD_STORAGE_NAME (FATAL)
//! - OBJS_INVALID_OPTION (FATAL)
//! - OBJS_MALFORMED_DEFINITION (FATAL)
//! - OBJS_VALUE_TYPE_VIOLATION (REJECT)
//! - OBJS_PREFIX_CONFLICT (REJECT)
//! - OBJS_CONSTRUCTION_FAILED (REJECT)
//! - OBJS_INVALID_SESSION_OBJECT (REJECT)
//!
//! FATAL errors come from schema setup and indicate a programming error;
//! they must propagate, never be recovered. REJECT errors are surfaced to
//! the caller of a single session operation.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::schema::ValueTypePolicy;
use crate::value::SessionValue;

/// Result type for schema and session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Boxed error raised by a session type's own constructor
pub type ConstructorError = Box<dyn StdError + Send + Sync + 'static>;

/// Severity levels for session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The single operation is rejected
    Reject,
    /// Schema setup is broken and must not continue
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NoSuchField,
    DuplicateFieldName,
    DuplicateFieldStorageName,
    InvalidOption,
    MalformedDefinition,
    ValueTypeViolation,
    PrefixConflict,
    ConstructionFailed,
    InvalidSessionObject,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NoSuchField => "OBJS_NO_SUCH_FIELD",
            ErrorCode::DuplicateFieldName => "OBJS_DUPLICATE_FIELD_NAME",
            ErrorCode::DuplicateFieldStorageName => "OBJS_DUPLICATE_FIELD_STORAGE_NAME",
            ErrorCode::InvalidOption => "OBJS_INVALID_OPTION",
            ErrorCode::MalformedDefinition => "OBJS_MALFORMED_DEFINITION",
            ErrorCode::ValueTypeViolation => "OBJS_VALUE_TYPE_VIOLATION",
            ErrorCode::PrefixConflict => "OBJS_PREFIX_CONFLICT",
            ErrorCode::ConstructionFailed => "OBJS_CONSTRUCTION_FAILED",
            ErrorCode::InvalidSessionObject => "OBJS_INVALID_SESSION_OBJECT",
        }
    }

    /// Declaration-time codes are fatal; everything else rejects one call.
    pub fn severity(&self) -> Severity {
        match self {
            ErrorCode::DuplicateFieldName
            | ErrorCode::DuplicateFieldStorageName
            | ErrorCode::InvalidOption
            | ErrorCode::MalformedDefinition => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every failure the crate reports
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Class {schema} has no field named {field:?}; its fields are: {accessible:?}")]
    NoSuchField {
        schema: String,
        field: String,
        /// Accessible field names, sorted
        accessible: Vec<String>,
    },

    #[error("Class {schema} already has one field named {field:?}; you can't define another.")]
    DuplicateFieldName { schema: String, field: String },

    #[error("Class {schema} already has a field, {original:?}, with storage name {storage_key:?}; you can't define field {new:?} with that same storage name.")]
    DuplicateFieldStorageName {
        schema: String,
        original: String,
        new: String,
        storage_key: String,
    },

    #[error("Invalid value for {option}: {value:?}{}", expected_values(.expected))]
    InvalidOption {
        option: String,
        value: String,
        /// Accepted values, empty when the option is free-form
        expected: Vec<String>,
    },

    #[error("Malformed schema definition '{source_name}': {reason}")]
    MalformedDefinition { source_name: String, reason: String },

    #[error("Value {value} is not allowed under the {policy} value-type policy")]
    ValueTypeViolation {
        value: SessionValue,
        policy: ValueTypePolicy,
    },

    #[error("Prefix {prefix:?} holds a {found}, not a map")]
    PrefixConflict { prefix: String, found: String },

    #[error("Could not create a new instance of {type_name}: {source}")]
    ConstructionFailed {
        type_name: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync + 'static>,
    },

    #[error("Constructed session is not a {expected} (schema {found})")]
    InvalidSessionObject { expected: String, found: String },
}

impl SessionError {
    pub fn no_such_field(
        schema: impl Into<String>,
        field: impl Into<String>,
        accessible: Vec<String>,
    ) -> Self {
        SessionError::NoSuchField {
            schema: schema.into(),
            field: field.into(),
            accessible,
        }
    }

    pub fn invalid_option(option: impl Into<String>, value: impl fmt::Display) -> Self {
        SessionError::InvalidOption {
            option: option.into(),
            value: value.to_string(),
            expected: Vec::new(),
        }
    }

    /// `InvalidOption` for an option restricted to `expected`.
    pub fn invalid_choice(option: impl Into<String>, value: impl fmt::Display, expected: &[&str]) -> Self {
        SessionError::InvalidOption {
            option: option.into(),
            value: value.to_string(),
            expected: expected.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn malformed_definition(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        SessionError::MalformedDefinition {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn construction_failed(type_name: impl Into<String>, source: ConstructorError) -> Self {
        SessionError::ConstructionFailed {
            type_name: type_name.into(),
            source: Arc::from(source),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::NoSuchField { .. } => ErrorCode::NoSuchField,
            SessionError::DuplicateFieldName { .. } => ErrorCode::DuplicateFieldName,
            SessionError::DuplicateFieldStorageName { .. } => ErrorCode::DuplicateFieldStorageName,
            SessionError::InvalidOption { .. } => ErrorCode::InvalidOption,
            SessionError::MalformedDefinition { .. } => ErrorCode::MalformedDefinition,
            SessionError::ValueTypeViolation { .. } => ErrorCode::ValueTypeViolation,
            SessionError::PrefixConflict { .. } => ErrorCode::PrefixConflict,
            SessionError::ConstructionFailed { .. } => ErrorCode::ConstructionFailed,
            SessionError::InvalidSessionObject { .. } => ErrorCode::InvalidSessionObject,
        }
    }

    pub fn severity(&self) -> Severity {
        self.code().severity()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

fn expected_values(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!("; expected one of {}", expected.join(", "))
    }
}
