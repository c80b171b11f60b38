//! Dynamic values held by a session store
//!
//! The store itself is opaque, but value-type policies need to look inside
//! what is being written, so everything crossing the session boundary is a
//! `SessionValue`.
//!
//! Supported shapes:
//! - null, bool, integer, float, text
//! - symbol: a short interned-style atom
//! - timestamp: UTC instant
//! - list: ordered sequence
//! - map: ordered key/value pairs, keys are values too
//! - opaque: anything else a host keeps in its session

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum characters of a value representation shown in abbreviated output.
pub const ABBREVIATED_REPR_LEN: usize = 40;

/// Marker appended to a truncated representation.
pub const ELLIPSIS: &str = "...";

/// A symbolic atom, distinct from text but addressed identically as a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

/// A value the host stored that has no structured meaning here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueValue {
    /// Host-side type name, e.g. `Regexp`
    pub type_name: String,
    /// Host-side textual representation
    pub repr: String,
}

impl OpaqueValue {
    pub fn new(type_name: impl Into<String>, repr: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            repr: repr.into(),
        }
    }
}

/// Ordered map whose keys may be any value.
///
/// Insertion order is preserved. When a map is addressed by string key
/// (as a nested store), text and symbol keys with the same spelling match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    entries: Vec<(SessionValue, SessionValue)>,
}

impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair without checking for an existing key.
    pub fn push(&mut self, key: impl Into<SessionValue>, value: impl Into<SessionValue>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn entries(&self) -> &[(SessionValue, SessionValue)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an entry by the string form of its key.
    pub fn get_by_key(&self, key: &str) -> Option<&SessionValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.key_string() == key)
            .map(|(_, v)| v)
    }

    pub fn get_by_key_mut(&mut self, key: &str) -> Option<&mut SessionValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k.key_string() == key)
            .map(|(_, v)| v)
    }

    /// Overwrites the entry whose key matches, or appends a text-keyed entry.
    pub fn insert_by_key(&mut self, key: &str, value: SessionValue) {
        match self.get_by_key_mut(key) {
            Some(slot) => *slot = value,
            None => self.entries.push((SessionValue::Text(key.to_string()), value)),
        }
    }

    /// String forms of every key, in insertion order.
    pub fn key_strings(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.key_string()).collect()
    }

    /// Drops every entry whose key string is listed.
    pub fn remove_keys(&mut self, keys: &[String]) {
        self.entries.retain(|(k, _)| !keys.contains(&k.key_string()));
    }
}

impl<K, V> FromIterator<(K, V)> for MapValue
where
    K: Into<SessionValue>,
    V: Into<SessionValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Any value that can be read from or written to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SessionValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Symbol(Symbol),
    Timestamp(DateTime<Utc>),
    List(Vec<SessionValue>),
    Map(MapValue),
    Opaque(OpaqueValue),
}

impl SessionValue {
    pub fn symbol(name: impl Into<String>) -> Self {
        SessionValue::Symbol(Symbol::new(name))
    }

    pub fn opaque(type_name: impl Into<String>, repr: impl Into<String>) -> Self {
        SessionValue::Opaque(OpaqueValue::new(type_name, repr))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SessionValue::Null)
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            SessionValue::Null => "null",
            SessionValue::Bool(_) => "bool",
            SessionValue::Integer(_) => "integer",
            SessionValue::Float(_) => "float",
            SessionValue::Text(_) => "text",
            SessionValue::Symbol(_) => "symbol",
            SessionValue::Timestamp(_) => "timestamp",
            SessionValue::List(_) => "list",
            SessionValue::Map(_) => "map",
            SessionValue::Opaque(o) => &o.type_name,
        }
    }

    /// The string a key is addressed by: text and symbols by their spelling,
    /// anything else by its representation.
    pub fn key_string(&self) -> String {
        match self {
            SessionValue::Text(s) => s.clone(),
            SessionValue::Symbol(s) => s.as_str().to_string(),
            other => other.repr(),
        }
    }

    /// Inspect-style representation.
    pub fn repr(&self) -> String {
        self.to_string()
    }

    /// Representation cut to [`ABBREVIATED_REPR_LEN`] characters plus [`ELLIPSIS`].
    pub fn abbreviated_repr(&self) -> String {
        let full = self.repr();
        if full.chars().count() <= ABBREVIATED_REPR_LEN {
            return full;
        }
        let mut out: String = full.chars().take(ABBREVIATED_REPR_LEN).collect();
        out.push_str(ELLIPSIS);
        out
    }
}

impl fmt::Display for SessionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionValue::Null => write!(f, "null"),
            SessionValue::Bool(b) => write!(f, "{}", b),
            SessionValue::Integer(i) => write!(f, "{}", i),
            SessionValue::Float(x) => write!(f, "{:?}", x),
            SessionValue::Text(s) => write!(f, "{:?}", s),
            SessionValue::Symbol(s) => write!(f, "{}", s),
            SessionValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            SessionValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            SessionValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.entries().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} => {}", k, v)?;
                }
                write!(f, "}}")
            }
            SessionValue::Opaque(o) => write!(f, "#<{} {}>", o.type_name, o.repr),
        }
    }
}

impl From<bool> for SessionValue {
    fn from(v: bool) -> Self {
        SessionValue::Bool(v)
    }
}

impl From<i64> for SessionValue {
    fn from(v: i64) -> Self {
        SessionValue::Integer(v)
    }
}

impl From<i32> for SessionValue {
    fn from(v: i32) -> Self {
        SessionValue::Integer(i64::from(v))
    }
}

impl From<f64> for SessionValue {
    fn from(v: f64) -> Self {
        SessionValue::Float(v)
    }
}

impl From<&str> for SessionValue {
    fn from(v: &str) -> Self {
        SessionValue::Text(v.to_string())
    }
}

impl From<String> for SessionValue {
    fn from(v: String) -> Self {
        SessionValue::Text(v)
    }
}

impl From<Symbol> for SessionValue {
    fn from(v: Symbol) -> Self {
        SessionValue::Symbol(v)
    }
}

impl From<DateTime<Utc>> for SessionValue {
    fn from(v: DateTime<Utc>) -> Self {
        SessionValue::Timestamp(v)
    }
}

impl From<MapValue> for SessionValue {
    fn from(v: MapValue) -> Self {
        SessionValue::Map(v)
    }
}

impl From<OpaqueValue> for SessionValue {
    fn from(v: OpaqueValue) -> Self {
        SessionValue::Opaque(v)
    }
}

impl<T: Into<SessionValue>> From<Vec<T>> for SessionValue {
    fn from(v: Vec<T>) -> Self {
        SessionValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<SessionValue>> From<Option<T>> for SessionValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SessionValue::Null, Into::into)
    }
}

impl From<serde_json::Value> for SessionValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => SessionValue::Null,
            Value::Bool(b) => SessionValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SessionValue::Integer(i),
                None => SessionValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => SessionValue::Text(s),
            Value::Array(items) => SessionValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(obj) => SessionValue::Map(obj.into_iter().collect()),
        }
    }
}
