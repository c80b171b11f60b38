//! Schema subsystem
//!
//! A schema maps logical, typed fields onto keys of an external store and
//! carries the policies every session of that type enforces.
//!
//! # Design Principles
//!
//! - Field names and storage keys are globally unique within a schema
//! - Retired and inactive fields keep their name and key reserved
//! - Identical redeclaration is legal, anything else conflicting is fatal
//! - Built once, before first use; immutable afterwards

mod loader;
mod registry;
mod types;
mod validator;

pub use loader::{FieldDefinition, SchemaDefinition, SchemaLoader};
pub use registry::SchemaRegistry;
pub use types::{normalize_name, FieldDescriptor, FieldKind, FieldOptions, UnknownFieldPolicy, Visibility};
pub use validator::{ValueTypePolicy, ValueTypeValidator};
