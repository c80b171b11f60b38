//! Field and policy type definitions
//!
//! Field kinds:
//! - active: readable and writable, gets bound accessors
//! - retired: reserved name and storage key, leftover data is purged
//! - inactive: reserved name and storage key, leftover data is kept
//!
//! Every enum here also parses from its lowercase text form, failing with
//! `InvalidOption` on anything else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{SessionError, SessionResult};

/// Normalizes a field name: surrounding whitespace is trimmed, case is kept.
pub fn normalize_name(name: &str) -> SessionResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SessionError::invalid_option("name", name));
    }
    Ok(trimmed.to_string())
}

/// Lifecycle state of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Active,
    Retired,
    Inactive,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Active => "active",
            FieldKind::Retired => "retired",
            FieldKind::Inactive => "inactive",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = SessionError;

    fn from_str(s: &str) -> SessionResult<Self> {
        match s.trim() {
            // "normal" is the historical spelling of an active field
            "active" | "normal" => Ok(FieldKind::Active),
            "retired" => Ok(FieldKind::Retired),
            "inactive" => Ok(FieldKind::Inactive),
            _ => Err(SessionError::invalid_choice("type", s, &["active", "normal", "retired", "inactive"])),
        }
    }
}

/// Visibility of a field's named accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = SessionError;

    fn from_str(s: &str) -> SessionResult<Self> {
        match s.trim() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(SessionError::invalid_choice("visibility", s, &["public", "private"])),
        }
    }
}

/// What happens to store keys the schema does not claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFieldPolicy {
    #[default]
    Preserve,
    Delete,
}

impl UnknownFieldPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnknownFieldPolicy::Preserve => "preserve",
            UnknownFieldPolicy::Delete => "delete",
        }
    }
}

impl fmt::Display for UnknownFieldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UnknownFieldPolicy {
    type Err = SessionError;

    fn from_str(s: &str) -> SessionResult<Self> {
        match s.trim() {
            "preserve" => Ok(UnknownFieldPolicy::Preserve),
            "delete" => Ok(UnknownFieldPolicy::Delete),
            _ => Err(SessionError::invalid_choice("unknown_fields", s, &["preserve", "delete"])),
        }
    }
}

/// Per-field declaration options.
///
/// `visibility: None` means "use the registry's default visibility at the
/// moment of declaration". `storage_key: None` means "store under the name".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOptions {
    pub storage_key: Option<String>,
    pub kind: FieldKind,
    pub visibility: Option<Visibility>,
}

impl FieldOptions {
    pub fn active() -> Self {
        Self::default()
    }

    pub fn retired() -> Self {
        Self {
            kind: FieldKind::Retired,
            ..Self::default()
        }
    }

    pub fn inactive() -> Self {
        Self {
            kind: FieldKind::Inactive,
            ..Self::default()
        }
    }

    pub fn storage(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn public(self) -> Self {
        self.visibility(Visibility::Public)
    }

    pub fn private(self) -> Self {
        self.visibility(Visibility::Private)
    }

    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Immutable description of one declared field.
///
/// Two descriptors are equal iff schema, name, storage key, kind and
/// visibility all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    schema: String,
    name: String,
    storage_key: String,
    kind: FieldKind,
    visibility: Visibility,
}

impl FieldDescriptor {
    /// Builds a descriptor, normalizing the name and resolving defaults.
    pub fn new(
        schema: impl Into<String>,
        name: &str,
        options: FieldOptions,
        default_visibility: Visibility,
    ) -> SessionResult<Self> {
        let name = normalize_name(name)?;
        let storage_key = match options.storage_key {
            Some(key) => {
                let trimmed = key.trim();
                if trimmed.is_empty() {
                    return Err(SessionError::invalid_option("storage", key));
                }
                trimmed.to_string()
            }
            None => name.clone(),
        };

        Ok(Self {
            schema: schema.into(),
            name,
            storage_key,
            kind: options.kind,
            visibility: options.visibility.unwrap_or(default_visibility),
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Only active fields expose their data.
    pub fn allows_access(&self) -> bool {
        self.kind == FieldKind::Active
    }

    /// Data under a retired field's key is purged when unknown fields are deleted.
    pub fn purges_stored_data(&self) -> bool {
        self.kind == FieldKind::Retired
    }
}
