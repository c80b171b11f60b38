//! Schema Invariant Tests
//!
//! Declaration rules for session schemas:
//! - Field names are unique; identical redeclaration is a no-op
//! - Storage keys are unique across active, retired and inactive fields
//! - Only active fields are accessible
//! - JSON definitions obey the same rules as programmatic declarations

use objsession::errors::{ErrorCode, Severity};
use objsession::schema::{
    FieldKind, FieldOptions, SchemaDefinition, SchemaLoader, SchemaRegistry, UnknownFieldPolicy,
    ValueTypePolicy, Visibility,
};
use objsession::SessionError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_schema() -> SchemaRegistry {
    let mut schema = SchemaRegistry::new("Objsession");
    schema.declare_field("sa", FieldOptions::active()).unwrap();
    schema.retire_field("sr", FieldOptions::default()).unwrap();
    schema.deactivate_field("si", FieldOptions::default()).unwrap();
    schema
}

// =============================================================================
// Uniqueness Tests
// =============================================================================

/// Redeclaring with identical attributes changes nothing.
#[test]
fn test_identical_redeclaration_is_idempotent() {
    let mut schema = setup_schema();
    for _ in 0..3 {
        schema.declare_field("sa", FieldOptions::active()).unwrap();
        schema.retire_field("sr", FieldOptions::default()).unwrap();
    }
    assert_eq!(schema.field_count(), 3);
}

/// Changing kind on redeclaration is rejected.
#[test]
fn test_redeclare_with_other_kind_fails() {
    let mut schema = setup_schema();
    let err = schema.deactivate_field("sa", FieldOptions::default()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::DuplicateFieldName);
    assert_eq!(err.severity(), Severity::Fatal);
    assert_eq!(schema.lookup_by_name("sa").unwrap().kind(), FieldKind::Active);
}

/// A retired field's key cannot be reused by a new field.
#[test]
fn test_retired_storage_key_stays_reserved() {
    let mut schema = setup_schema();
    let err = schema
        .declare_field("new_field", FieldOptions::active().storage("sr"))
        .unwrap_err();

    match err {
        SessionError::DuplicateFieldStorageName { original, new, storage_key, .. } => {
            assert_eq!(original, "sr");
            assert_eq!(new, "new_field");
            assert_eq!(storage_key, "sr");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(schema.lookup_by_name("new_field").is_none());
}

/// An inactive field's key cannot be reused either.
#[test]
fn test_inactive_storage_key_stays_reserved() {
    let mut schema = setup_schema();
    let err = schema
        .declare_field("other", FieldOptions::active().storage("si"))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DuplicateFieldStorageName);
}

/// Blank names and blank storage keys are invalid options.
#[test]
fn test_blank_name_or_storage_rejected() {
    let mut schema = setup_schema();
    assert_eq!(
        schema.declare_field("   ", FieldOptions::active()).unwrap_err().code(),
        ErrorCode::InvalidOption
    );
    assert_eq!(
        schema
            .declare_field("x", FieldOptions::active().storage(" "))
            .unwrap_err()
            .code(),
        ErrorCode::InvalidOption
    );
}

// =============================================================================
// Accessibility Tests
// =============================================================================

/// Retired and inactive fields are not accessible.
#[test]
fn test_only_active_fields_accessible() {
    let schema = setup_schema();
    assert_eq!(schema.accessible_field_names(), vec!["sa"]);

    for name in ["sr", "si", "nope"] {
        let err = schema.accessible_field(name).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoSuchField);
        assert!(err.to_string().contains("sa"));
    }
}

/// Private visibility hides the accessor, not the field.
#[test]
fn test_private_field_still_accessible_by_name() {
    let mut schema = setup_schema();
    schema.declare_field("token", FieldOptions::active().private()).unwrap();

    assert!(schema.accessible_field("token").is_ok());
    assert_eq!(schema.getter("token").unwrap().visibility(), Visibility::Private);
}

// =============================================================================
// Definition Loading Tests
// =============================================================================

/// A JSON definition builds the same registry as explicit calls.
#[test]
fn test_json_definition_matches_programmatic() {
    let json = r#"{
        "name": "Objsession",
        "prefix": "prf",
        "unknown_fields": "delete",
        "allowed_value_types": "primitive_and_compound",
        "fields": [
            { "name": "sa" },
            { "name": "sr", "type": "retired" },
            { "name": "si", "type": "inactive" },
            { "name": "uid", "storage": "u", "visibility": "private" }
        ]
    }"#;
    let loaded = SchemaLoader::from_json_str("inline", json).unwrap();

    let mut expected = setup_schema();
    expected.set_prefix(Some("prf")).unwrap();
    expected.set_unknown_field_policy(UnknownFieldPolicy::Delete);
    expected.set_value_type_policy(ValueTypePolicy::PrimitiveAndCompound);
    expected
        .declare_field("uid", FieldOptions::active().storage("u").private())
        .unwrap();

    assert_eq!(
        SchemaDefinition::from_registry(&loaded),
        SchemaDefinition::from_registry(&expected)
    );
}

/// Conflicts inside a definition fail with the same errors.
#[test]
fn test_json_definition_conflict_fails() {
    let json = r#"{
        "name": "Objsession",
        "fields": [
            { "name": "a", "storage": "k" },
            { "name": "b", "storage": "k", "type": "retired" }
        ]
    }"#;
    let err = SchemaLoader::from_json_str("inline", json).unwrap_err();
    assert_eq!(err.code(), ErrorCode::DuplicateFieldStorageName);
}

/// Unparseable JSON is a malformed definition.
#[test]
fn test_malformed_json_fails() {
    let err = SchemaLoader::from_json_str("inline", "{ not json").unwrap_err();
    assert_eq!(err.code(), ErrorCode::MalformedDefinition);
    assert!(err.to_string().contains("inline"));
}

/// Saving then loading a schema file preserves it.
#[test]
fn test_schema_file_survives_save_and_load() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("objsession.json");

    let schema = setup_schema();
    SchemaLoader::save(&schema, &path).unwrap();
    let loaded = SchemaLoader::from_path(&path).unwrap();

    assert_eq!(loaded.name(), "Objsession");
    assert_eq!(loaded.field_names(), schema.field_names());
    assert_eq!(loaded.lookup_by_name("sr").unwrap().kind(), FieldKind::Retired);
}
