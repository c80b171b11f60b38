//! Declarative schema definitions
//!
//! A schema can be written as JSON instead of a sequence of declaration
//! calls:
//!
//! ```json
//! {
//!   "name": "Objsession",
//!   "prefix": "prf",
//!   "unknown_fields": "delete",
//!   "fields": [
//!     { "name": "user_id", "storage": "uid" },
//!     { "name": "cart", "type": "retired" }
//!   ]
//! }
//! ```
//!
//! Settings are applied before fields, and fields are declared in array
//! order through `SchemaRegistry::declare_field`, so every conflict rule
//! holds exactly as for programmatic declarations.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{SessionError, SessionResult};
use crate::observability::{log_event, Event};

use super::registry::SchemaRegistry;
use super::types::{FieldKind, FieldOptions, Visibility};

/// One field entry of a [`SchemaDefinition`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    /// Storage key alias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    /// `active` (or `normal`), `retired`, `inactive`; defaults to active
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// `public` or `private`; defaults to the schema's default visibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

impl FieldDefinition {
    /// Parses the textual options into typed [`FieldOptions`].
    pub fn options(&self) -> SessionResult<FieldOptions> {
        let kind = match &self.kind {
            Some(raw) => raw.parse::<FieldKind>()?,
            None => FieldKind::Active,
        };
        let visibility = match &self.visibility {
            Some(raw) => Some(raw.parse::<Visibility>()?),
            None => None,
        };
        Ok(FieldOptions {
            storage_key: self.storage.clone(),
            kind,
            visibility,
        })
    }
}

/// Serialized form of a whole schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Session type name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_fields: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_value_types: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl SchemaDefinition {
    /// Builds a registry from this definition.
    pub fn build(&self) -> SessionResult<SchemaRegistry> {
        let mut registry = SchemaRegistry::new(self.name.clone());

        if let Some(prefix) = &self.prefix {
            registry.set_prefix(Some(prefix.as_str()))?;
        }
        if let Some(visibility) = &self.default_visibility {
            registry.configure("default_visibility", visibility)?;
        }
        if let Some(policy) = &self.unknown_fields {
            registry.configure("unknown_fields", policy)?;
        }
        if let Some(policy) = &self.allowed_value_types {
            registry.configure("allowed_value_types", policy)?;
        }

        for field in &self.fields {
            registry.declare_field(&field.name, field.options()?)?;
        }

        Ok(registry)
    }

    /// Captures the current state of a registry.
    pub fn from_registry(registry: &SchemaRegistry) -> Self {
        let fields = registry
            .fields()
            .map(|f| FieldDefinition {
                name: f.name().to_string(),
                storage: (f.storage_key() != f.name()).then(|| f.storage_key().to_string()),
                kind: Some(f.kind().as_str().to_string()),
                visibility: Some(f.visibility().as_str().to_string()),
            })
            .collect();

        Self {
            name: registry.name().to_string(),
            prefix: registry.prefix().map(str::to_string),
            default_visibility: Some(registry.default_visibility().as_str().to_string()),
            unknown_fields: Some(registry.unknown_field_policy().as_str().to_string()),
            allowed_value_types: Some(registry.value_type_policy().as_str().to_string()),
            fields,
        }
    }
}

/// Loads schema definitions from JSON text or files.
pub struct SchemaLoader;

impl SchemaLoader {
    /// Parses and builds a registry from JSON text.
    pub fn from_json_str(source_name: &str, json: &str) -> SessionResult<SchemaRegistry> {
        let definition: SchemaDefinition = serde_json::from_str(json).map_err(|e| {
            SessionError::malformed_definition(source_name, format!("Invalid JSON: {}", e))
        })?;

        let registry = definition.build()?;
        let field_count = registry.field_count().to_string();
        log_event(
            Event::SchemaLoaded,
            &[
                ("fields", field_count.as_str()),
                ("schema", registry.name()),
                ("source", source_name),
            ],
        );
        Ok(registry)
    }

    /// Reads a JSON schema file and builds a registry from it.
    pub fn from_path(path: &Path) -> SessionResult<SchemaRegistry> {
        let source_name = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| {
            SessionError::malformed_definition(&source_name, format!("Failed to read file: {}", e))
        })?;
        Self::from_json_str(&source_name, &content)
    }

    /// Writes a registry's definition as pretty JSON.
    pub fn save(registry: &SchemaRegistry, path: &Path) -> SessionResult<()> {
        let source_name = path.display().to_string();
        let content = serde_json::to_string_pretty(&SchemaDefinition::from_registry(registry)).map_err(|e| {
            SessionError::malformed_definition(&source_name, format!("Failed to serialize schema: {}", e))
        })?;
        fs::write(path, content).map_err(|e| {
            SessionError::malformed_definition(&source_name, format!("Failed to write file: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::schema::{UnknownFieldPolicy, ValueTypePolicy};
    use tempfile::TempDir;

    const DEFINITION: &str = r#"{
        "name": "Objsession",
        "prefix": "prf",
        "default_visibility": "private",
        "unknown_fields": "delete",
        "allowed_value_types": "primitive_and_compound",
        "fields": [
            { "name": "user_id", "storage": "uid" },
            { "name": "nickname", "visibility": "public" },
            { "name": "cart", "type": "retired" },
            { "name": "flags", "type": "inactive" }
        ]
    }"#;

    #[test]
    fn test_build_from_json() {
        let registry = SchemaLoader::from_json_str("inline", DEFINITION).unwrap();

        assert_eq!(registry.name(), "Objsession");
        assert_eq!(registry.prefix(), Some("prf"));
        assert_eq!(registry.unknown_field_policy(), UnknownFieldPolicy::Delete);
        assert_eq!(registry.value_type_policy(), ValueTypePolicy::PrimitiveAndCompound);
        assert_eq!(registry.accessible_field_names(), vec!["nickname", "user_id"]);

        let user_id = registry.lookup_by_name("user_id").unwrap();
        assert_eq!(user_id.storage_key(), "uid");
        assert_eq!(user_id.visibility(), Visibility::Private);
        assert_eq!(registry.lookup_by_name("nickname").unwrap().visibility(), Visibility::Public);
        assert_eq!(registry.lookup_by_name("cart").unwrap().kind(), FieldKind::Retired);
    }

    #[test]
    fn test_malformed_json() {
        let err = SchemaLoader::from_json_str("inline", "{ not json").unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedDefinition);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_option_text() {
        let json = r#"{ "name": "S", "fields": [ { "name": "foo", "type": "bogus" } ] }"#;
        let err = SchemaLoader::from_json_str("inline", json).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOption);
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_duplicate_storage_in_definition() {
        let json = r#"{ "name": "S", "fields": [
            { "name": "foo", "storage": "k", "type": "inactive" },
            { "name": "bar", "storage": "k" }
        ] }"#;
        let err = SchemaLoader::from_json_str("inline", json).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateFieldStorageName);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("objsession.json");

        let original = SchemaLoader::from_json_str("inline", DEFINITION).unwrap();
        SchemaLoader::save(&original, &path).unwrap();
        let reloaded = SchemaLoader::from_path(&path).unwrap();

        assert_eq!(reloaded.field_names(), original.field_names());
        assert_eq!(
            reloaded.fields().cloned().collect::<Vec<_>>(),
            original.fields().cloned().collect::<Vec<_>>()
        );
        assert_eq!(reloaded.prefix(), original.prefix());
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = SchemaLoader::from_path(&temp_dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedDefinition);
    }
}
