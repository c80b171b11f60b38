//! Session subsystem
//!
//! A session view reads and writes one schema's fields in a host-owned
//! key-value store, optionally nested under a prefix key.
//!
//! # Design Principles
//!
//! - The store is borrowed, never owned or cached
//! - Reads never allocate; the first write allocates the prefix map
//! - Writes are validated before the store is touched
//! - Unknown and retired data is purged in one batch at construction

mod accessor;
mod construct;
mod store;
mod view;

pub use accessor::{AccessorBinder, BoundAccessor};
pub use construct::{construct_session, SessionType};
pub use store::{MemoryStore, RawStore};
pub use view::SessionView;
