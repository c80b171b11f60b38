//! Named accessors for active fields
//!
//! Every active field gets a getter named after the lower-cased field name
//! and a setter named `set_<getter>`. Retired and inactive fields get none.
//!
//! Two realizations share the same table:
//! - at runtime, [`AccessorBinder`] maps method names to fields, and
//!   `SessionView::invoke_getter`/`invoke_setter` dispatch through it for
//!   public accessors only
//! - at compile time, [`session_type!`](crate::session_type) generates a typed
//!   session struct with real methods, `pub` or module-private, and checks
//!   them against the table on first use
//!
//! Private visibility hides the named accessor, never the keyed
//! `get`/`set` path.

use std::collections::BTreeMap;

use crate::errors::{SessionError, SessionResult};
use crate::schema::{FieldDescriptor, SchemaRegistry, Visibility};

/// Getter/setter pair bound to one active field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundAccessor {
    field: String,
    getter: String,
    setter: String,
    visibility: Visibility,
}

impl BoundAccessor {
    fn for_field(field: &FieldDescriptor) -> Self {
        let getter = field.name().to_lowercase();
        Self {
            field: field.name().to_string(),
            setter: format!("set_{}", getter),
            getter,
            visibility: field.visibility(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn getter(&self) -> &str {
        &self.getter
    }

    pub fn setter(&self) -> &str {
        &self.setter
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// Accessor table owned by a schema registry
///
/// Getters and setters live in separate namespaces, so a field called
/// `set_foo` never clashes with the setter of `foo`. A later field whose
/// getter name matches an earlier one takes the name over; the earlier
/// field stays reachable by keyed access.
#[derive(Debug, Clone, Default)]
pub struct AccessorBinder {
    by_field: BTreeMap<String, BoundAccessor>,
    /// getter name -> field name
    getters: BTreeMap<String, String>,
    /// setter name -> field name
    setters: BTreeMap<String, String>,
}

impl AccessorBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds accessors for an active field.
    pub(crate) fn bind(&mut self, field: &FieldDescriptor) {
        let accessor = BoundAccessor::for_field(field);
        self.getters
            .insert(accessor.getter.clone(), accessor.field.clone());
        self.setters
            .insert(accessor.setter.clone(), accessor.field.clone());
        self.by_field.insert(accessor.field.clone(), accessor);
    }

    /// Accessor whose getter is called `method`.
    pub fn by_getter(&self, method: &str) -> Option<&BoundAccessor> {
        self.getters
            .get(method)
            .and_then(|field| self.by_field.get(field))
    }

    /// Accessor whose setter is called `method`.
    pub fn by_setter(&self, method: &str) -> Option<&BoundAccessor> {
        self.setters
            .get(method)
            .and_then(|field| self.by_field.get(field))
    }

    pub fn for_field(&self, field: &str) -> Option<&BoundAccessor> {
        self.by_field.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundAccessor> {
        self.by_field.values()
    }

    pub fn len(&self) -> usize {
        self.by_field.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_field.is_empty()
    }

    /// Checks generated accessors against a registry: each listed field must
    /// be active and bound with the same visibility.
    pub fn verify(registry: &SchemaRegistry, generated: &[(&str, Visibility)]) -> SessionResult<()> {
        for (field, visibility) in generated {
            match registry.accessors().for_field(field) {
                Some(bound) if bound.visibility() == *visibility => {}
                Some(bound) => {
                    return Err(SessionError::invalid_option(
                        "visibility",
                        format!(
                            "{} accessor for {} in {}, declared {}",
                            visibility,
                            field,
                            registry.name(),
                            bound.visibility()
                        ),
                    ));
                }
                None => {
                    return Err(SessionError::invalid_option(
                        "field",
                        format!("{} has no active field {}", registry.name(), field),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Generates a typed session struct over a schema.
///
/// ```ignore
/// fn profile_schema() -> SessionResult<SchemaRegistry> {
///     let mut schema = SchemaRegistry::new("Profile");
///     schema.declare_field("user_id", FieldOptions::active().storage("uid"))?;
///     schema.declare_field("token", FieldOptions::active().private())?;
///     Ok(schema)
/// }
///
/// objsession::session_type! {
///     /// Per-request session data.
///     pub struct Profile => profile_schema;
///     pub fn user_id / set_user_id => "user_id";
///     fn token / set_token => "token";
/// }
/// ```
///
/// The schema function runs once; its registry must be named after the
/// struct. Accessors without `pub` are private to the invoking module and
/// must match a private field. Construct instances with
/// `construct_session::<Profile>(&mut store)`.
#[macro_export]
macro_rules! session_type {
    (
        $(#[$meta:meta])*
        $svis:vis struct $name:ident => $schema:path;
        $( $fvis:vis fn $getter:ident / $setter:ident => $field:literal; )*
    ) => {
        $(#[$meta])*
        $svis struct $name<'s> {
            view: $crate::session::SessionView<'s>,
        }

        #[allow(dead_code)]
        impl<'s> $name<'s> {
            $(
                $fvis fn $getter(&self) -> $crate::SessionResult<::std::option::Option<$crate::SessionValue>> {
                    self.view.get($field)
                }

                $fvis fn $setter(
                    &mut self,
                    value: impl ::std::convert::Into<$crate::SessionValue>,
                ) -> $crate::SessionResult<$crate::SessionValue> {
                    self.view.set($field, value)
                }
            )*

            /// Keyed access, including private fields.
            pub fn view_mut(&mut self) -> &mut $crate::session::SessionView<'s> {
                &mut self.view
            }
        }

        impl<'s> $crate::session::SessionType<'s> for $name<'s> {
            const TYPE_NAME: &'static str = stringify!($name);

            fn registry() -> $crate::SessionResult<&'static $crate::schema::SchemaRegistry> {
                static REGISTRY: ::std::sync::OnceLock<$crate::SessionResult<$crate::schema::SchemaRegistry>> =
                    ::std::sync::OnceLock::new();
                REGISTRY
                    .get_or_init(|| {
                        let registry = $schema()?;
                        $crate::session::AccessorBinder::verify(
                            &registry,
                            &[$((
                                $field,
                                if stringify!($fvis).is_empty() {
                                    $crate::schema::Visibility::Private
                                } else {
                                    $crate::schema::Visibility::Public
                                },
                            )),*],
                        )?;
                        Ok(registry)
                    })
                    .as_ref()
                    .map_err(::std::clone::Clone::clone)
            }

            fn from_view(
                view: $crate::session::SessionView<'s>,
            ) -> ::std::result::Result<Self, $crate::errors::ConstructorError> {
                Ok(Self { view })
            }

            fn view(&self) -> &$crate::session::SessionView<'s> {
                &self.view
            }
        }

        impl<'s> ::std::fmt::Display for $name<'s> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.view, f)
            }
        }
    };
}
