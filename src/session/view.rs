//! Per-unit-of-work view over a raw store
//!
//! Construction:
//! 1. Resolve the physical store: the raw store itself, or the map stored
//!    under the schema's prefix. A missing prefix map is not allocated.
//! 2. If the schema deletes unknown fields, remove in one batch every key
//!    of the physical store that is unclaimed or belongs to a retired field.
//!    Inactive fields' keys are kept. Nothing to scan means nothing to do.
//!
//! Reads never allocate. The first write allocates an empty map under the
//! prefix if none is there. Writes are validated before the store is
//! touched. Nothing is cached: every call goes to the store.

use std::fmt;

use uuid::Uuid;

use crate::errors::{SessionError, SessionResult};
use crate::observability::{log_event, Event};
use crate::schema::{SchemaRegistry, UnknownFieldPolicy};
use crate::value::{MapValue, SessionValue};

use super::accessor::BoundAccessor;
use super::store::RawStore;

/// A session of one schema type over a borrowed store
pub struct SessionView<'s> {
    registry: &'s SchemaRegistry,
    store: &'s mut dyn RawStore,
    id: Uuid,
}

impl<'s> SessionView<'s> {
    /// Builds a view and runs the unknown-field purge.
    ///
    /// # Errors
    ///
    /// `PrefixConflict` if the prefix key holds something other than a map.
    pub fn construct(registry: &'s SchemaRegistry, store: &'s mut dyn RawStore) -> SessionResult<Self> {
        let mut view = Self {
            registry,
            store,
            id: Uuid::new_v4(),
        };
        view.purge_unknown_fields()?;

        let id = view.id.to_string();
        log_event(
            Event::SessionConstructed,
            &[
                ("prefix", registry.prefix().unwrap_or("none")),
                ("schema", registry.name()),
                ("session", id.as_str()),
            ],
        );
        Ok(view)
    }

    pub fn registry(&self) -> &'s SchemaRegistry {
        self.registry
    }

    /// Identifier of this view, used to correlate log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Reads an active field. Absent data, including a never-allocated
    /// prefix map, reads as `None`.
    pub fn get(&self, name: &str) -> SessionResult<Option<SessionValue>> {
        let registry = self.registry;
        let field = registry
            .accessible_field(name)
            .map_err(|e| self.rejected(Event::FieldAccessRejected, e))?;

        Ok(self
            .physical()?
            .and_then(|store| store.get(field.storage_key()))
            .cloned())
    }

    /// Writes an active field and returns the written value.
    ///
    /// # Errors
    ///
    /// - `NoSuchField` if the field is undeclared, retired or inactive
    /// - `ValueTypeViolation` if the schema's policy rejects the value;
    ///   the store is untouched in that case
    pub fn set(&mut self, name: &str, value: impl Into<SessionValue>) -> SessionResult<SessionValue> {
        let value = value.into();
        let registry = self.registry;
        let field = registry
            .accessible_field(name)
            .map_err(|e| self.rejected(Event::FieldAccessRejected, e))?;
        registry
            .value_type_validator()
            .validate(&value)
            .map_err(|e| self.rejected(Event::FieldWriteRejected, e))?;

        self.physical_or_allocate()?
            .set(field.storage_key(), value.clone());
        Ok(value)
    }

    /// Names of accessible fields currently holding a non-null value, sorted.
    pub fn keys(&self) -> SessionResult<Vec<String>> {
        let Some(store) = self.physical()? else {
            return Ok(Vec::new());
        };
        Ok(self
            .populated_fields(store)
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// `<Schema name: value, ...>` over populated accessible fields, sorted
    /// by name. When `abbreviate` is set, long value representations are cut.
    /// A prefix key holding something other than a map renders as
    /// `<Schema (prefix "p" holds text)>`.
    pub fn to_display_string(&self, abbreviate: bool) -> String {
        let pairs: Vec<String> = match self.physical() {
            Err(SessionError::PrefixConflict { prefix, found }) => {
                return format!("<{} (prefix {:?} holds {})>", self.registry.name(), prefix, found);
            }
            Ok(Some(store)) => self
                .populated_fields(store)
                .into_iter()
                .map(|(name, value)| {
                    let repr = if abbreviate {
                        value.abbreviated_repr()
                    } else {
                        value.repr()
                    };
                    format!("{}: {}", name, repr)
                })
                .collect(),
            _ => Vec::new(),
        };

        if pairs.is_empty() {
            format!("<{}>", self.registry.name())
        } else {
            format!("<{} {}>", self.registry.name(), pairs.join(", "))
        }
    }

    /// Calls a public getter by method name.
    pub fn invoke_getter(&self, method: &str) -> SessionResult<Option<SessionValue>> {
        let registry = self.registry;
        let accessor = self.public_accessor(method, registry.getter(method))?;
        self.get(accessor.field())
    }

    /// Calls a public setter by method name.
    pub fn invoke_setter(&mut self, method: &str, value: impl Into<SessionValue>) -> SessionResult<SessionValue> {
        let registry = self.registry;
        let accessor = self.public_accessor(method, registry.setter(method))?;
        self.set(accessor.field(), value)
    }

    fn public_accessor(
        &self,
        method: &str,
        bound: Option<&'s BoundAccessor>,
    ) -> SessionResult<&'s BoundAccessor> {
        let registry = self.registry;
        bound
            .filter(|a| a.is_public())
            .ok_or_else(|| {
                let public = registry
                    .accessors()
                    .iter()
                    .filter(|a| a.is_public())
                    .map(|a| a.field().to_string())
                    .collect();
                self.rejected(
                    Event::FieldAccessRejected,
                    SessionError::no_such_field(registry.name(), method, public),
                )
            })
    }

    fn populated_fields(&self, store: &dyn RawStore) -> Vec<(String, SessionValue)> {
        self.registry
            .fields()
            .filter(|f| f.allows_access())
            .filter_map(|f| match store.get(f.storage_key()) {
                Some(value) if !value.is_null() => Some((f.name().to_string(), value.clone())),
                _ => None,
            })
            .collect()
    }

    fn purge_unknown_fields(&mut self) -> SessionResult<()> {
        let registry = self.registry;
        if registry.unknown_field_policy() != UnknownFieldPolicy::Delete {
            return Ok(());
        }

        let id = self.id.to_string();
        let Some(store) = self.physical_mut()? else {
            return Ok(());
        };

        let doomed: Vec<String> = store
            .keys()
            .into_iter()
            .filter(|key| match registry.lookup_by_storage_key(key) {
                Some(field) => field.purges_stored_data(),
                None => true,
            })
            .collect();
        if doomed.is_empty() {
            return Ok(());
        }

        store.delete(&doomed);

        let count = doomed.len().to_string();
        let keys = doomed.join(",");
        log_event(
            Event::SessionPurge,
            &[
                ("deleted", count.as_str()),
                ("keys", keys.as_str()),
                ("schema", registry.name()),
                ("session", id.as_str()),
            ],
        );
        Ok(())
    }

    fn physical(&self) -> SessionResult<Option<&dyn RawStore>> {
        let Some(prefix) = self.registry.prefix() else {
            return Ok(Some(&*self.store));
        };
        match self.store.get(prefix) {
            None | Some(SessionValue::Null) => Ok(None),
            Some(SessionValue::Map(map)) => Ok(Some(map as &dyn RawStore)),
            Some(other) => Err(prefix_conflict(prefix, other)),
        }
    }

    fn physical_mut(&mut self) -> SessionResult<Option<&mut dyn RawStore>> {
        let Some(prefix) = self.registry.prefix() else {
            return Ok(Some(&mut *self.store));
        };
        match self.store.get_mut(prefix) {
            None | Some(SessionValue::Null) => Ok(None),
            Some(SessionValue::Map(map)) => Ok(Some(map as &mut dyn RawStore)),
            Some(other) => Err(prefix_conflict(prefix, other)),
        }
    }

    fn physical_or_allocate(&mut self) -> SessionResult<&mut dyn RawStore> {
        let Some(prefix) = self.registry.prefix() else {
            return Ok(&mut *self.store);
        };
        if matches!(self.store.get(prefix), None | Some(SessionValue::Null)) {
            self.store.set(prefix, SessionValue::Map(MapValue::new()));
        }
        match self.store.get_mut(prefix) {
            Some(SessionValue::Map(map)) => Ok(map as &mut dyn RawStore),
            Some(other) => Err(prefix_conflict(prefix, other)),
            None => Err(SessionError::PrefixConflict {
                prefix: prefix.to_string(),
                found: "nothing after allocation".to_string(),
            }),
        }
    }

    fn rejected(&self, event: Event, err: SessionError) -> SessionError {
        let id = self.id.to_string();
        let message = err.to_string();
        log_event(
            event,
            &[
                ("code", err.code().as_str()),
                ("message", message.as_str()),
                ("schema", self.registry.name()),
                ("session", id.as_str()),
            ],
        );
        err
    }
}

fn prefix_conflict(prefix: &str, found: &SessionValue) -> SessionError {
    SessionError::PrefixConflict {
        prefix: prefix.to_string(),
        found: found.type_name().to_string(),
    }
}

impl fmt::Display for SessionView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string(true))
    }
}

impl fmt::Debug for SessionView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionView")
            .field("schema", &self.registry.name())
            .field("prefix", &self.registry.prefix())
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::schema::{FieldOptions, ValueTypePolicy};
    use crate::session::MemoryStore;

    fn schema() -> SchemaRegistry {
        let mut schema = SchemaRegistry::new("Objsession");
        schema.declare_field("foo", FieldOptions::active()).unwrap();
        schema.declare_field("bar", FieldOptions::active().storage("b")).unwrap();
        schema
    }

    #[test]
    fn test_get_and_set_round_trip_through_storage_key() {
        let schema = schema();
        let mut store = MemoryStore::new();

        let mut view = SessionView::construct(&schema, &mut store).unwrap();
        assert_eq!(view.get("bar").unwrap(), None);
        assert_eq!(view.set("bar", 123).unwrap(), SessionValue::Integer(123));
        assert_eq!(view.get(" bar ").unwrap(), Some(SessionValue::Integer(123)));
        drop(view);

        assert_eq!(store.get("b"), Some(&SessionValue::Integer(123)));
        assert!(!store.contains_key("bar"));
    }

    #[test]
    fn test_unknown_field_raises() {
        let schema = schema();
        let mut store = MemoryStore::new();
        let mut view = SessionView::construct(&schema, &mut store).unwrap();

        let err = view.get("baz").unwrap_err();
        assert!(err.to_string().contains("baz"));
        assert!(err.to_string().contains("foo"));
        assert_eq!(view.set("baz", 1).unwrap_err().code(), ErrorCode::NoSuchField);
    }

    #[test]
    fn test_violation_leaves_store_untouched() {
        let mut schema = schema();
        schema.set_value_type_policy(ValueTypePolicy::Primitive);
        let mut store = MemoryStore::new().with("foo", 1);

        let mut view = SessionView::construct(&schema, &mut store).unwrap();
        let err = view.set("foo", vec![1, 2]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueTypeViolation);
        drop(view);

        assert_eq!(store.get("foo"), Some(&SessionValue::Integer(1)));
    }

    #[test]
    fn test_keys_skip_null_and_absent() {
        let schema = schema();
        let mut store = MemoryStore::new().with("foo", SessionValue::Null).with("b", "x");
        let view = SessionView::construct(&schema, &mut store).unwrap();
        assert_eq!(view.keys().unwrap(), vec!["bar"]);
    }

    #[test]
    fn test_prefix_holding_scalar_conflicts() {
        let mut schema = schema();
        schema.set_prefix(Some("prf")).unwrap();
        let mut store = MemoryStore::new().with("prf", "oops");

        let mut view = SessionView::construct(&schema, &mut store).unwrap();
        assert_eq!(view.get("foo").unwrap_err().code(), ErrorCode::PrefixConflict);
        assert_eq!(view.set("foo", 1).unwrap_err().code(), ErrorCode::PrefixConflict);
        assert_eq!(view.to_display_string(true), "<Objsession (prefix \"prf\" holds text)>");
    }

    #[test]
    fn test_invoke_by_method_name() {
        let mut schema = SchemaRegistry::new("Objsession");
        schema.declare_field("Nick", FieldOptions::active()).unwrap();
        schema.declare_field("token", FieldOptions::active().private()).unwrap();
        let mut store = MemoryStore::new();

        let mut view = SessionView::construct(&schema, &mut store).unwrap();
        view.invoke_setter("set_nick", "zed").unwrap();
        assert_eq!(view.invoke_getter("nick").unwrap(), Some(SessionValue::from("zed")));

        assert_eq!(view.invoke_getter("token").unwrap_err().code(), ErrorCode::NoSuchField);
        assert_eq!(view.invoke_setter("set_token", 1).unwrap_err().code(), ErrorCode::NoSuchField);
        assert_eq!(view.invoke_getter("set_nick").unwrap_err().code(), ErrorCode::NoSuchField);

        // keyed access still reaches the private field
        view.set("token", "abc").unwrap();
        assert_eq!(view.get("token").unwrap(), Some(SessionValue::from("abc")));
    }

    #[test]
    fn test_display_string() {
        let schema = schema();
        let mut store = MemoryStore::new()
            .with("foo", "x".repeat(60))
            .with("b", 3);
        let view = SessionView::construct(&schema, &mut store).unwrap();

        let short = view.to_display_string(true);
        assert!(short.starts_with("<Objsession bar: 3, foo: \""));
        assert!(short.ends_with("...>"));

        let full = view.to_display_string(false);
        assert!(full.contains(&"x".repeat(60)));
        assert!(!full.contains("..."));
        assert_eq!(format!("{}", view), short);
    }

    #[test]
    fn test_display_string_empty() {
        let schema = schema();
        let mut store = MemoryStore::new();
        let view = SessionView::construct(&schema, &mut store).unwrap();
        assert_eq!(view.to_display_string(true), "<Objsession>");
    }
}
