//! Attribute checks: the predicate language used by conditional ops and
//! searches (§3 Attribute check).

use serde::{Deserialize, Serialize};

use crate::datatype::{DataType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    Equals,
    LessThan,
    LessEqual,
    GreaterEqual,
    GreaterThan,
    Regex,
    LengthEquals,
    LengthLessEqual,
    LengthGreaterEqual,
    Contains,
    ContainsLessThan,
    Fail,
}

/// `{attr, datatype, value, predicate}`. `attr` is a position in the space's
/// schema (0 = key, though keyed checks on the key itself are typically
/// consumed before dispatch rather than sent as a search predicate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeCheck {
    pub attr: usize,
    pub datatype: DataType,
    pub value: Value,
    pub predicate: Predicate,
}

impl AttributeCheck {
    #[must_use]
    pub fn new(attr: usize, value: Value, predicate: Predicate) -> Self {
        let datatype = value.datatype();
        Self { attr, datatype, value, predicate }
    }

    /// Evaluates the check against a stored value for the same attribute.
    /// Returns `false` for `FAIL` and for any predicate/type combination the
    /// registry does not support.
    #[must_use]
    pub fn matches(&self, stored: &Value) -> bool {
        if !stored.datatype().supports_predicate(self.predicate) {
            return false;
        }
        match self.predicate {
            Predicate::Fail => false,
            Predicate::Equals => values_equal(stored, &self.value),
            Predicate::LessThan => matches!(stored.compare(&self.value), Some(std::cmp::Ordering::Less)),
            Predicate::LessEqual => {
                matches!(stored.compare(&self.value), Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal))
            }
            Predicate::GreaterEqual => {
                matches!(stored.compare(&self.value), Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal))
            }
            Predicate::GreaterThan => {
                matches!(stored.compare(&self.value), Some(std::cmp::Ordering::Greater))
            }
            Predicate::Regex => match (stored, &self.value) {
                (Value::String(s), Value::String(pattern)) => {
                    regex_lite_match(pattern, s)
                }
                _ => false,
            },
            Predicate::LengthEquals => stored.length() == self.value_as_u64(),
            Predicate::LengthLessEqual => {
                matches!((stored.length(), self.value_as_u64()), (Some(a), Some(b)) if a <= b)
            }
            Predicate::LengthGreaterEqual => {
                matches!((stored.length(), self.value_as_u64()), (Some(a), Some(b)) if a >= b)
            }
            Predicate::Contains => stored.contains(&self.value),
            Predicate::ContainsLessThan => container_contains_less_than(stored, &self.value),
        }
    }

    fn value_as_u64(&self) -> Option<u64> {
        match &self.value {
            Value::Int64(i) if *i >= 0 => Some(*i as u64),
            _ => None,
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match a.compare(b) {
        Some(std::cmp::Ordering::Equal) => true,
        Some(_) => false,
        None => a == b,
    }
}

fn container_contains_less_than(container: &Value, bound: &Value) -> bool {
    match (container, bound) {
        (Value::ListInt64(v) | Value::SetInt64(v), Value::Int64(b)) => v.iter().any(|x| x < b),
        (Value::ListFloat(v) | Value::SetFloat(v), Value::Float(b)) => {
            v.iter().any(|x| x.partial_cmp(b) == Some(std::cmp::Ordering::Less))
        }
        _ => false,
    }
}

/// A minimal, dependency-free glob-ish substring matcher used only as the
/// functional stand-in for `REGEX`; full regex evaluation is delegated to
/// the storage collaborator in the real system. Supports `*` wildcards.
fn regex_lite_match(pattern: &[u8], haystack: &[u8]) -> bool {
    fn matches(pattern: &[u8], haystack: &[u8]) -> bool {
        match pattern.split_first() {
            None => haystack.is_empty(),
            Some((b'*', rest)) => {
                matches(rest, haystack) || (!haystack.is_empty() && matches(pattern, &haystack[1..]))
            }
            Some((p, rest)) => haystack.first() == Some(p) && matches(rest, &haystack[1..]),
        }
    }
    matches(pattern, haystack)
}
