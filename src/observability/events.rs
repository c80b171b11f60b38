//! Observable events
//!
//! Events are explicit and typed; their string form is the `event` key of
//! a log line.

use std::fmt;

use super::logger::Severity;

/// Observable events in schema setup and session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Schema setup
    /// A field was added to a schema
    SchemaFieldDeclared,
    /// An identical field declaration was repeated
    SchemaFieldRedeclared,
    /// A schema-wide setting changed
    SchemaConfigured,
    /// A schema was built from a definition
    SchemaLoaded,
    /// A declaration or setting was refused (FATAL)
    SchemaDeclarationRejected,

    // Session lifecycle
    /// A session view is ready
    SessionConstructed,
    /// Unknown or retired keys were deleted at construction
    SessionPurge,
    /// A session type's constructor failed
    SessionConstructionFailed,

    // Field access
    /// Read or write of an unavailable field
    FieldAccessRejected,
    /// Write refused by the value-type policy
    FieldWriteRejected,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemaFieldDeclared => "SCHEMA_FIELD_DECLARED",
            Event::SchemaFieldRedeclared => "SCHEMA_FIELD_REDECLARED",
            Event::SchemaConfigured => "SCHEMA_CONFIGURED",
            Event::SchemaLoaded => "SCHEMA_LOADED",
            Event::SchemaDeclarationRejected => "SCHEMA_DECLARATION_REJECTED",
            Event::SessionConstructed => "SESSION_CONSTRUCTED",
            Event::SessionPurge => "SESSION_PURGE",
            Event::SessionConstructionFailed => "SESSION_CONSTRUCTION_FAILED",
            Event::FieldAccessRejected => "FIELD_ACCESS_REJECTED",
            Event::FieldWriteRejected => "FIELD_WRITE_REJECTED",
        }
    }

    /// Severity the event is logged at.
    pub fn severity(&self) -> Severity {
        match self {
            Event::SchemaFieldDeclared
            | Event::SchemaFieldRedeclared
            | Event::SchemaConfigured
            | Event::SessionConstructed => Severity::Trace,
            Event::SchemaLoaded | Event::SessionPurge => Severity::Info,
            Event::FieldAccessRejected | Event::FieldWriteRejected => Severity::Warn,
            Event::SessionConstructionFailed => Severity::Error,
            Event::SchemaDeclarationRejected => Severity::Fatal,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_screaming_snake_case() {
        for event in [
            Event::SchemaFieldDeclared,
            Event::SessionPurge,
            Event::FieldWriteRejected,
        ] {
            let name = event.as_str();
            assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_declaration_rejection_is_fatal() {
        assert_eq!(Event::SchemaDeclarationRejected.severity(), Severity::Fatal);
        assert_eq!(Event::SessionPurge.severity(), Severity::Info);
    }
}
