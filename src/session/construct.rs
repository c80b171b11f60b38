//! Construction boundary for typed sessions
//!
//! Building a typed session runs in two steps: a [`SessionView`] is
//! constructed over the store (purging unknown fields), then the type's own
//! constructor wraps it. Any failure in the constructor surfaces as
//! `ConstructionFailed` carrying the original error. A value whose view is
//! not bound to the type's own registry is rejected as `InvalidSessionObject`.

use std::ptr;

use crate::errors::{ConstructorError, SessionError, SessionResult};
use crate::observability::{log_event, Event};
use crate::schema::SchemaRegistry;

use super::store::RawStore;
use super::view::SessionView;

/// A session type: a schema registry plus a constructor over a view.
///
/// Usually implemented by [`session_type!`](crate::session_type).
pub trait SessionType<'s>: Sized {
    /// Name the registry must carry.
    const TYPE_NAME: &'static str;

    /// The type's schema, built once.
    fn registry() -> SessionResult<&'static SchemaRegistry>;

    /// Wraps a freshly constructed view.
    fn from_view(view: SessionView<'s>) -> Result<Self, ConstructorError>;

    fn view(&self) -> &SessionView<'s>;
}

/// Constructs a typed session over `store`.
///
/// # Errors
///
/// - errors from the schema function or the unknown-field purge, unchanged
/// - `ConstructionFailed` if `T::from_view` fails
/// - `InvalidSessionObject` if the result is not a session of `T`'s schema
pub fn construct_session<'s, T: SessionType<'s>>(store: &'s mut dyn RawStore) -> SessionResult<T> {
    let registry = T::registry()?;
    let view = SessionView::construct(registry, store)?;
    let id = view.id().to_string();

    let session = T::from_view(view).map_err(|source| {
        let err = SessionError::construction_failed(T::TYPE_NAME, source);
        let message = err.to_string();
        log_event(
            Event::SessionConstructionFailed,
            &[
                ("message", message.as_str()),
                ("session", id.as_str()),
                ("type", T::TYPE_NAME),
            ],
        );
        err
    })?;

    let bound = session.view().registry();
    if !ptr::eq(bound, registry) || bound.name() != T::TYPE_NAME {
        return Err(SessionError::InvalidSessionObject {
            expected: T::TYPE_NAME.to_string(),
            found: bound.name().to_string(),
        });
    }
    Ok(session)
}
