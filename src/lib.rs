//! objsession - typed field schemas over an external key-value store
//!
//! A [`schema::SchemaRegistry`] declares the fields a session type owns:
//! their names, the keys they occupy in the store, whether they are active,
//! retired or inactive, and the value-type policy writes must satisfy.
//! A [`session::SessionView`] applies that schema to a borrowed store.

pub mod errors;
pub mod observability;
pub mod schema;
pub mod session;
pub mod value;

pub use errors::{SessionError, SessionResult};
pub use value::{MapValue, SessionValue, Symbol};
