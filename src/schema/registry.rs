//! Per-session-type schema registry
//!
//! A registry is built once, before any session view exists, and is treated
//! as immutable afterwards: views borrow it shared, so the borrow checker
//! rules out mutation while any view is alive.
//!
//! Invariants:
//! - no two descriptors share a name
//! - no two descriptors share a storage key, across all kinds
//! - redeclaring an identical descriptor is a no-op

use std::collections::BTreeMap;

use crate::errors::{SessionError, SessionResult};
use crate::observability::{log_event, Event};
use crate::session::{AccessorBinder, BoundAccessor};

use super::types::{FieldDescriptor, FieldKind, FieldOptions, UnknownFieldPolicy, Visibility};
use super::validator::{ValueTypePolicy, ValueTypeValidator};

/// Field declarations and policies owned by one logical session type.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    name: String,
    by_name: BTreeMap<String, FieldDescriptor>,
    by_storage_key: BTreeMap<String, String>,
    prefix: Option<String>,
    default_visibility: Visibility,
    unknown_field_policy: UnknownFieldPolicy,
    value_type_policy: ValueTypePolicy,
    accessors: AccessorBinder,
}

impl SchemaRegistry {
    /// Creates an empty registry for the session type called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            by_name: BTreeMap::new(),
            by_storage_key: BTreeMap::new(),
            prefix: None,
            default_visibility: Visibility::default(),
            unknown_field_policy: UnknownFieldPolicy::default(),
            value_type_policy: ValueTypePolicy::default(),
            accessors: AccessorBinder::new(),
        }
    }

    /// Name of the session type this schema belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares a field.
    ///
    /// # Errors
    ///
    /// - `InvalidOption` for a blank name or storage key
    /// - `DuplicateFieldName` if the name exists with different attributes
    /// - `DuplicateFieldStorageName` if the storage key belongs to another field
    pub fn declare_field(&mut self, name: &str, options: FieldOptions) -> SessionResult<FieldDescriptor> {
        let field = FieldDescriptor::new(self.name.clone(), name, options, self.default_visibility)
            .map_err(|e| self.rejected(e))?;

        if let Some(existing) = self.by_name.get(field.name()) {
            if *existing == field {
                log_event(
                    Event::SchemaFieldRedeclared,
                    &[("field", field.name()), ("schema", self.name.as_str())],
                );
                return Ok(field);
            }
            return Err(self.rejected(SessionError::DuplicateFieldName {
                schema: self.name.clone(),
                field: field.name().to_string(),
            }));
        }

        if let Some(original) = self.by_storage_key.get(field.storage_key()) {
            return Err(self.rejected(SessionError::DuplicateFieldStorageName {
                schema: self.name.clone(),
                original: original.clone(),
                new: field.name().to_string(),
                storage_key: field.storage_key().to_string(),
            }));
        }

        if field.allows_access() {
            self.accessors.bind(&field);
        }
        self.by_storage_key
            .insert(field.storage_key().to_string(), field.name().to_string());
        self.by_name.insert(field.name().to_string(), field.clone());

        log_event(
            Event::SchemaFieldDeclared,
            &[
                ("field", field.name()),
                ("kind", field.kind().as_str()),
                ("schema", self.name.as_str()),
                ("storage_key", field.storage_key()),
                ("visibility", field.visibility().as_str()),
            ],
        );
        Ok(field)
    }

    /// Declares a retired field: its key stays reserved and its data is purged.
    pub fn retire_field(&mut self, name: &str, options: FieldOptions) -> SessionResult<FieldDescriptor> {
        self.declare_field(name, options.kind(FieldKind::Retired))
    }

    /// Declares an inactive field: its key stays reserved and its data is kept.
    pub fn deactivate_field(&mut self, name: &str, options: FieldOptions) -> SessionResult<FieldDescriptor> {
        self.declare_field(name, options.kind(FieldKind::Inactive))
    }

    /// Sets or clears the namespace key. Last write wins.
    pub fn set_prefix(&mut self, prefix: Option<&str>) -> SessionResult<()> {
        let prefix = match prefix {
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(self.rejected(SessionError::invalid_option("prefix", raw)));
                }
                Some(trimmed.to_string())
            }
            None => None,
        };
        self.log_setting("prefix", prefix.as_deref().unwrap_or("none"));
        self.prefix = prefix;
        Ok(())
    }

    /// Sets the visibility used by later declarations that leave it unset.
    /// Fields already declared keep the visibility they were given.
    pub fn set_default_visibility(&mut self, visibility: Visibility) {
        self.log_setting("default_visibility", visibility.as_str());
        self.default_visibility = visibility;
    }

    pub fn set_unknown_field_policy(&mut self, policy: UnknownFieldPolicy) {
        self.log_setting("unknown_fields", policy.as_str());
        self.unknown_field_policy = policy;
    }

    pub fn set_value_type_policy(&mut self, policy: ValueTypePolicy) {
        self.log_setting("allowed_value_types", policy.as_str());
        self.value_type_policy = policy;
    }

    /// Applies a setting given as text, validating the value.
    ///
    /// Recognized settings: `prefix`, `default_visibility`, `unknown_fields`,
    /// `allowed_value_types`.
    pub fn configure(&mut self, setting: &str, value: &str) -> SessionResult<()> {
        let parsed = match setting {
            "prefix" => return self.set_prefix(Some(value)),
            "default_visibility" => value.parse::<Visibility>().map(|v| self.set_default_visibility(v)),
            "unknown_fields" => value.parse::<UnknownFieldPolicy>().map(|v| self.set_unknown_field_policy(v)),
            "allowed_value_types" => value.parse::<ValueTypePolicy>().map(|v| self.set_value_type_policy(v)),
            _ => Err(SessionError::invalid_choice(
                "setting",
                setting,
                &["prefix", "default_visibility", "unknown_fields", "allowed_value_types"],
            )),
        };
        parsed.map_err(|e| self.rejected(e))
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn default_visibility(&self) -> Visibility {
        self.default_visibility
    }

    pub fn unknown_field_policy(&self) -> UnknownFieldPolicy {
        self.unknown_field_policy
    }

    pub fn value_type_policy(&self) -> ValueTypePolicy {
        self.value_type_policy
    }

    pub fn value_type_validator(&self) -> ValueTypeValidator {
        ValueTypeValidator::new(self.value_type_policy)
    }

    /// Looks a field up by (normalized) name.
    pub fn lookup_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name.trim())
    }

    /// Looks a field up by the key it occupies in the store.
    pub fn lookup_by_storage_key(&self, key: &str) -> Option<&FieldDescriptor> {
        self.by_storage_key
            .get(key)
            .and_then(|name| self.by_name.get(name))
    }

    /// Names of active fields, sorted.
    pub fn accessible_field_names(&self) -> Vec<String> {
        self.by_name
            .values()
            .filter(|f| f.allows_access())
            .map(|f| f.name().to_string())
            .collect()
    }

    /// Names of every declared field regardless of kind, sorted.
    pub fn field_names(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.by_name.values()
    }

    pub fn field_count(&self) -> usize {
        self.by_name.len()
    }

    /// Accessors bound for active fields.
    pub fn accessors(&self) -> &AccessorBinder {
        &self.accessors
    }

    /// Resolves a descriptor that may be read or written, or fails `NoSuchField`.
    pub fn accessible_field(&self, name: &str) -> SessionResult<&FieldDescriptor> {
        match self.lookup_by_name(name) {
            Some(field) if field.allows_access() => Ok(field),
            _ => Err(SessionError::no_such_field(
                self.name.clone(),
                name.trim(),
                self.accessible_field_names(),
            )),
        }
    }

    /// Accessor whose getter is called `method`, if any.
    pub fn getter(&self, method: &str) -> Option<&BoundAccessor> {
        self.accessors.by_getter(method)
    }

    /// Accessor whose setter is called `method`, if any.
    pub fn setter(&self, method: &str) -> Option<&BoundAccessor> {
        self.accessors.by_setter(method)
    }

    fn log_setting(&self, setting: &str, value: &str) {
        log_event(
            Event::SchemaConfigured,
            &[("schema", self.name.as_str()), ("setting", setting), ("value", value)],
        );
    }

    fn rejected(&self, err: SessionError) -> SessionError {
        let message = err.to_string();
        log_event(
            Event::SchemaDeclarationRejected,
            &[
                ("code", err.code().as_str()),
                ("message", message.as_str()),
                ("schema", self.name.as_str()),
            ],
        );
        err
    }
}
