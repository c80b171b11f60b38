//! Write-time value-type validation
//!
//! Policies:
//! - anything: every value is accepted
//! - primitive: null, bool, numbers, text, symbols, timestamps
//! - primitive_and_compound: primitives plus lists and maps whose every
//!   element (map keys included) is itself primitive or compound
//!
//! Validation runs before the store is touched; a rejected write never
//! reaches the store. A violation reports the top-level value being
//! assigned, not the offending leaf. Values are owned trees, so recursion
//! always terminates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{SessionError, SessionResult};
use crate::value::SessionValue;

/// Which values a schema allows to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTypePolicy {
    #[default]
    Anything,
    Primitive,
    PrimitiveAndCompound,
}

impl ValueTypePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueTypePolicy::Anything => "anything",
            ValueTypePolicy::Primitive => "primitive",
            ValueTypePolicy::PrimitiveAndCompound => "primitive_and_compound",
        }
    }
}

impl fmt::Display for ValueTypePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ValueTypePolicy {
    type Err = SessionError;

    fn from_str(s: &str) -> SessionResult<Self> {
        match s.trim() {
            "anything" => Ok(ValueTypePolicy::Anything),
            "primitive" => Ok(ValueTypePolicy::Primitive),
            "primitive_and_compound" => Ok(ValueTypePolicy::PrimitiveAndCompound),
            _ => Err(SessionError::invalid_choice(
                "allowed_value_types",
                s,
                &["anything", "primitive", "primitive_and_compound"],
            )),
        }
    }
}

/// Enforces a [`ValueTypePolicy`] on values about to be written.
#[derive(Debug, Clone, Copy)]
pub struct ValueTypeValidator {
    policy: ValueTypePolicy,
}

impl ValueTypeValidator {
    pub fn new(policy: ValueTypePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ValueTypePolicy {
        self.policy
    }

    /// Returns whether the policy accepts `value`.
    pub fn accepts(&self, value: &SessionValue) -> bool {
        match self.policy {
            ValueTypePolicy::Anything => true,
            ValueTypePolicy::Primitive => is_primitive(value),
            ValueTypePolicy::PrimitiveAndCompound => is_primitive_or_compound(value),
        }
    }

    /// Validates `value`, failing with `ValueTypeViolation` naming the whole value.
    pub fn validate(&self, value: &SessionValue) -> SessionResult<()> {
        if self.accepts(value) {
            Ok(())
        } else {
            Err(SessionError::ValueTypeViolation {
                value: value.clone(),
                policy: self.policy,
            })
        }
    }
}

/// Scalars the primitive policy accepts.
fn is_primitive(value: &SessionValue) -> bool {
    matches!(
        value,
        SessionValue::Null
            | SessionValue::Bool(_)
            | SessionValue::Integer(_)
            | SessionValue::Float(_)
            | SessionValue::Text(_)
            | SessionValue::Symbol(_)
            | SessionValue::Timestamp(_)
    )
}

/// Depth-first check of lists and maps down to primitive leaves.
fn is_primitive_or_compound(value: &SessionValue) -> bool {
    match value {
        SessionValue::List(items) => items.iter().all(is_primitive_or_compound),
        SessionValue::Map(map) => map
            .entries()
            .iter()
            .all(|(k, v)| is_primitive_or_compound(k) && is_primitive_or_compound(v)),
        other => is_primitive(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::MapValue;
    use chrono::Utc;

    fn scalars() -> Vec<SessionValue> {
        vec![
            SessionValue::from("foobar"),
            SessionValue::from(134832.32),
            SessionValue::from(true),
            SessionValue::from(false),
            SessionValue::Null,
            SessionValue::symbol("baz"),
            SessionValue::from(Utc::now()),
        ]
    }

    fn regex() -> SessionValue {
        SessionValue::opaque("Regexp", "/yo/")
    }

    fn compound_map() -> SessionValue {
        let mut inner = MapValue::new();
        inner.push(SessionValue::symbol("bar"), vec![SessionValue::symbol("foo"), "baz".into()]);
        let mut outer = MapValue::new();
        outer.push(vec![1, 2], "onetwo");
        outer.push(3, inner);
        SessionValue::Map(outer)
    }

    #[test]
    fn test_anything_accepts_opaque() {
        let validator = ValueTypeValidator::new(ValueTypePolicy::Anything);
        assert!(validator.validate(&regex()).is_ok());
        assert!(validator.validate(&compound_map()).is_ok());
    }

    #[test]
    fn test_primitive_accepts_scalars() {
        let validator = ValueTypeValidator::new(ValueTypePolicy::Primitive);
        for value in scalars() {
            assert!(validator.validate(&value).is_ok(), "rejected {}", value);
        }
    }

    #[test]
    fn test_primitive_rejects_collections() {
        let validator = ValueTypeValidator::new(ValueTypePolicy::Primitive);
        let list = SessionValue::from(vec![SessionValue::from(3), "foo".into(), SessionValue::symbol("zap")]);
        assert!(validator.validate(&list).is_err());
        assert!(validator.validate(&compound_map()).is_err());
        assert!(validator.validate(&regex()).is_err());
    }

    #[test]
    fn test_compound_accepts_nested_collections() {
        let validator = ValueTypeValidator::new(ValueTypePolicy::PrimitiveAndCompound);
        for value in scalars() {
            assert!(validator.validate(&value).is_ok());
        }
        let mut foo_bar = MapValue::new();
        foo_bar.push("foo", "bar");
        let list = SessionValue::List(vec![
            SessionValue::from(3),
            SessionValue::from(vec![2, 4]),
            SessionValue::Map(foo_bar),
        ]);
        assert!(validator.validate(&list).is_ok());
        assert!(validator.validate(&compound_map()).is_ok());
    }

    #[test]
    fn test_compound_rejects_any_opaque_leaf() {
        let validator = ValueTypeValidator::new(ValueTypePolicy::PrimitiveAndCompound);
        assert!(validator.validate(&regex()).is_err());

        let list = SessionValue::List(vec![SessionValue::from(1), SessionValue::from(2), regex()]);
        assert!(validator.validate(&list).is_err());

        let mut bad_value = MapValue::new();
        bad_value.push(SessionValue::symbol("foo"), regex());
        assert!(validator.validate(&SessionValue::Map(bad_value)).is_err());

        let mut bad_key = MapValue::new();
        bad_key.push(regex(), SessionValue::symbol("foo"));
        assert!(validator.validate(&SessionValue::Map(bad_key)).is_err());
    }

    #[test]
    fn test_violation_reports_top_level_value() {
        let validator = ValueTypeValidator::new(ValueTypePolicy::PrimitiveAndCompound);
        let deep = SessionValue::List(vec![SessionValue::List(vec![regex()])]);

        match validator.validate(&deep).unwrap_err() {
            SessionError::ValueTypeViolation { value, policy } => {
                assert_eq!(value, deep);
                assert_eq!(policy, ValueTypePolicy::PrimitiveAndCompound);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "primitive_and_compound".parse::<ValueTypePolicy>().unwrap(),
            ValueTypePolicy::PrimitiveAndCompound
        );
        let err = "scalars".parse::<ValueTypePolicy>().unwrap_err();
        assert!(err.is_fatal());
    }
}
