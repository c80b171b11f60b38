//! Raw key-value store contract
//!
//! The store belongs to the host; sessions only borrow it. Keys are
//! strings, values are [`SessionValue`]s. A nested [`MapValue`] stored under
//! a prefix key is itself a store, so prefixed sessions read and write it in
//! place.

use std::collections::BTreeMap;

use crate::value::{MapValue, SessionValue};

/// Key-value store a session reads from and writes to
pub trait RawStore {
    /// Value stored under `key`, if any
    fn get(&self, key: &str) -> Option<&SessionValue>;

    /// Mutable access to the value under `key`, if any
    fn get_mut(&mut self, key: &str) -> Option<&mut SessionValue>;

    /// Store `value` under `key`, replacing what was there
    fn set(&mut self, key: &str, value: SessionValue);

    /// Every key currently stored
    fn keys(&self) -> Vec<String>;

    /// Remove all listed keys in one call
    fn delete(&mut self, keys: &[String]);
}

/// In-memory store, suitable for tests and hosts without their own backend.
///
/// Every `delete` batch is recorded so callers can see exactly what a
/// purge removed.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, SessionValue>,
    deletions: Vec<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SessionValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Batches passed to `delete`, oldest first.
    pub fn deletions(&self) -> &[Vec<String>] {
        &self.deletions
    }
}

impl RawStore for MemoryStore {
    fn get(&self, key: &str) -> Option<&SessionValue> {
        self.entries.get(key)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut SessionValue> {
        self.entries.get_mut(key)
    }

    fn set(&mut self, key: &str, value: SessionValue) {
        self.entries.insert(key.to_string(), value);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn delete(&mut self, keys: &[String]) {
        for key in keys {
            self.entries.remove(key);
        }
        self.deletions.push(keys.to_vec());
    }
}

impl RawStore for MapValue {
    fn get(&self, key: &str) -> Option<&SessionValue> {
        self.get_by_key(key)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut SessionValue> {
        self.get_by_key_mut(key)
    }

    fn set(&mut self, key: &str, value: SessionValue) {
        self.insert_by_key(key, value);
    }

    fn keys(&self) -> Vec<String> {
        self.key_strings()
    }

    fn delete(&mut self, keys: &[String]) {
        self.remove_keys(keys);
    }
}
