//! The closed set of typed leaves and container datatypes, and the capability
//! flags each one exposes (§3 Datatypes).

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::check::Predicate;

/// A concrete attribute type. Every secondary attribute and the key carry
/// exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    String,
    Int64,
    Float,
    Timestamp,
    Document,
    MacaroonSecret,
    ListString,
    ListInt64,
    ListFloat,
    SetString,
    SetInt64,
    SetFloat,
    MapStringString,
    MapStringInt64,
    MapStringFloat,
    MapInt64String,
    MapInt64Int64,
    MapInt64Float,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl DataType {
    /// The zero value a secondary attribute takes on when a `Put` creates a
    /// record without mentioning it explicitly -- every attribute in a
    /// schema has a stored value once a record exists, so a funcall that
    /// never touches one still needs something concrete to put there.
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            Self::String => Value::String(Vec::new()),
            Self::Int64 => Value::Int64(0),
            Self::Float => Value::Float(0.0),
            Self::Timestamp => Value::Timestamp(0),
            Self::Document => Value::Document(serde_json::Value::Null),
            Self::MacaroonSecret => Value::MacaroonSecret(Vec::new()),
            Self::ListString => Value::ListString(Vec::new()),
            Self::ListInt64 => Value::ListInt64(Vec::new()),
            Self::ListFloat => Value::ListFloat(Vec::new()),
            Self::SetString => Value::SetString(Vec::new()),
            Self::SetInt64 => Value::SetInt64(Vec::new()),
            Self::SetFloat => Value::SetFloat(Vec::new()),
            Self::MapStringString => Value::MapStringString(Vec::new()),
            Self::MapStringInt64 => Value::MapStringInt64(Vec::new()),
            Self::MapStringFloat => Value::MapStringFloat(Vec::new()),
            Self::MapInt64String => Value::MapInt64String(Vec::new()),
            Self::MapInt64Int64 => Value::MapInt64Int64(Vec::new()),
            Self::MapInt64Float => Value::MapInt64Float(Vec::new()),
        }
    }

    /// Whether the key's type may appear at attribute position 0 (§3 Schema).
    #[must_use]
    pub const fn hashable(self) -> bool {
        matches!(self, Self::String | Self::Int64 | Self::Float | Self::Timestamp)
    }

    /// Whether a subspace may be partitioned on this attribute.
    #[must_use]
    pub const fn indexable(self) -> bool {
        self.hashable()
    }

    /// Whether `<`, `<=`, `>=`, `>` are meaningful on this type.
    #[must_use]
    pub const fn comparable(self) -> bool {
        matches!(self, Self::String | Self::Int64 | Self::Float | Self::Timestamp)
    }

    #[must_use]
    pub const fn has_length(self) -> bool {
        matches!(
            self,
            Self::String
                | Self::ListString
                | Self::ListInt64
                | Self::ListFloat
                | Self::SetString
                | Self::SetInt64
                | Self::SetFloat
                | Self::MapStringString
                | Self::MapStringInt64
                | Self::MapStringFloat
                | Self::MapInt64String
                | Self::MapInt64Int64
                | Self::MapInt64Float
        )
    }

    #[must_use]
    pub const fn has_regex(self) -> bool {
        matches!(self, Self::String)
    }

    #[must_use]
    pub const fn has_contains(self) -> bool {
        matches!(
            self,
            Self::ListString
                | Self::ListInt64
                | Self::ListFloat
                | Self::SetString
                | Self::SetInt64
                | Self::SetFloat
                | Self::MapStringString
                | Self::MapStringInt64
                | Self::MapStringFloat
                | Self::MapInt64String
                | Self::MapInt64Int64
                | Self::MapInt64Float
        )
    }

    /// Whether this type supports document-predicate evaluation (dotted
    /// attribute-name subfield access).
    #[must_use]
    pub const fn is_document(self) -> bool {
        matches!(self, Self::Document)
    }

    #[must_use]
    pub const fn is_container(self) -> bool {
        self.has_contains()
    }

    #[must_use]
    pub const fn is_sensitive(self) -> bool {
        matches!(self, Self::MacaroonSecret)
    }

    /// Whether `predicate` is legal against a value of this type. Used by the
    /// client pipeline (§4.2 step 3) to reject a search predicate up front.
    #[must_use]
    pub const fn supports_predicate(self, predicate: Predicate) -> bool {
        match predicate {
            Predicate::Fail => true,
            Predicate::Equals => !self.is_document(),
            Predicate::LessThan | Predicate::LessEqual | Predicate::GreaterEqual | Predicate::GreaterThan => {
                self.comparable()
            }
            Predicate::Regex => self.has_regex(),
            Predicate::LengthEquals | Predicate::LengthLessEqual | Predicate::LengthGreaterEqual => {
                self.has_length()
            }
            Predicate::Contains => self.has_contains(),
            Predicate::ContainsLessThan => matches!(
                self,
                Self::ListInt64 | Self::ListFloat | Self::SetInt64 | Self::SetFloat
            ),
        }
    }
}

/// A typed value. The client↔server representation conversion named in
/// §3 is the identity for every variant here: wire encoding lives in
/// `hyperbase-wire`, which encodes/decodes a `Value` without altering its
/// logical content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(Vec<u8>),
    Int64(i64),
    Float(f64),
    Timestamp(i64),
    Document(serde_json::Value),
    MacaroonSecret(Vec<u8>),
    ListString(Vec<Vec<u8>>),
    ListInt64(Vec<i64>),
    ListFloat(Vec<f64>),
    SetString(Vec<Vec<u8>>),
    SetInt64(Vec<i64>),
    SetFloat(Vec<f64>),
    MapStringString(Vec<(Vec<u8>, Vec<u8>)>),
    MapStringInt64(Vec<(Vec<u8>, i64)>),
    MapStringFloat(Vec<(Vec<u8>, f64)>),
    MapInt64String(Vec<(i64, Vec<u8>)>),
    MapInt64Int64(Vec<(i64, i64)>),
    MapInt64Float(Vec<(i64, f64)>),
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

impl Value {
    #[must_use]
    pub const fn datatype(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Int64(_) => DataType::Int64,
            Self::Float(_) => DataType::Float,
            Self::Timestamp(_) => DataType::Timestamp,
            Self::Document(_) => DataType::Document,
            Self::MacaroonSecret(_) => DataType::MacaroonSecret,
            Self::ListString(_) => DataType::ListString,
            Self::ListInt64(_) => DataType::ListInt64,
            Self::ListFloat(_) => DataType::ListFloat,
            Self::SetString(_) => DataType::SetString,
            Self::SetInt64(_) => DataType::SetInt64,
            Self::SetFloat(_) => DataType::SetFloat,
            Self::MapStringString(_) => DataType::MapStringString,
            Self::MapStringInt64(_) => DataType::MapStringInt64,
            Self::MapStringFloat(_) => DataType::MapStringFloat,
            Self::MapInt64String(_) => DataType::MapInt64String,
            Self::MapInt64Int64(_) => DataType::MapInt64Int64,
            Self::MapInt64Float(_) => DataType::MapInt64Float,
        }
    }

    /// `validate(raw-bytes) -> bool` conceptually operates on the wire
    /// encoding; here, since the `Value` is already a decoded in-memory form,
    /// validation reduces to checking internal invariants a decoder cannot
    /// violate on its own (e.g. NaN floats, which compare inconsistently).
    #[must_use]
    pub fn validate(&self) -> bool {
        match self {
            Self::Float(f) => !f.is_nan(),
            Self::ListFloat(v) | Self::SetFloat(v) => v.iter().all(|f| !f.is_nan()),
            Self::MapStringFloat(v) => v.iter().all(|(_, f)| !f.is_nan()),
            Self::MapInt64Float(v) => v.iter().all(|(_, f)| !f.is_nan()),
            _ => true,
        }
    }

    /// Ordering used for comparisons, sort-based canonicalization, and
    /// region-box containment checks. Containers compare element-wise after
    /// canonicalization.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Int64(a), Self::Int64(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => Some(cmp_f64(*a, *b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// 64-bit hash coordinate used by the hyperspace hashing scheme. Leaves
    /// that are not `hashable()` have no meaningful coordinate.
    #[must_use]
    pub fn hash_coordinate(&self) -> Option<u64> {
        let bytes: Vec<u8> = match self {
            Self::String(s) => s.clone(),
            Self::Int64(i) => i.to_be_bytes().to_vec(),
            Self::Float(f) => f.to_be_bytes().to_vec(),
            Self::Timestamp(t) => t.to_be_bytes().to_vec(),
            _ => return None,
        };
        let digest = blake3::hash(&bytes);
        let mut coord = [0u8; 8];
        coord.copy_from_slice(&digest.as_bytes()[..8]);
        Some(u64::from_be_bytes(coord))
    }

    /// Length used by `LENGTH_*` predicates, where defined.
    #[must_use]
    pub fn length(&self) -> Option<u64> {
        match self {
            Self::String(s) => Some(s.len() as u64),
            Self::ListString(v) => Some(v.len() as u64),
            Self::ListInt64(v) => Some(v.len() as u64),
            Self::ListFloat(v) => Some(v.len() as u64),
            Self::SetString(v) => Some(v.len() as u64),
            Self::SetInt64(v) => Some(v.len() as u64),
            Self::SetFloat(v) => Some(v.len() as u64),
            Self::MapStringString(v) => Some(v.len() as u64),
            Self::MapStringInt64(v) => Some(v.len() as u64),
            Self::MapStringFloat(v) => Some(v.len() as u64),
            Self::MapInt64String(v) => Some(v.len() as u64),
            Self::MapInt64Int64(v) => Some(v.len() as u64),
            Self::MapInt64Float(v) => Some(v.len() as u64),
            _ => None,
        }
    }

    /// Canonicalizes containers in place: sets and maps are sorted by key
    /// under the datatype's compare, duplicates (by key) resolved by keeping
    /// the last writer. Idempotent: `canonicalize(canonicalize(x)) == canonicalize(x)`.
    pub fn canonicalize(&mut self) {
        match self {
            Self::SetString(v) => {
                v.sort();
                v.dedup();
            }
            Self::SetInt64(v) => {
                v.sort_unstable();
                v.dedup();
            }
            Self::SetFloat(v) => {
                v.sort_by(|a, b| cmp_f64(*a, *b));
                v.dedup_by(|a, b| a == b);
            }
            Self::MapStringString(v) => canonicalize_map(v, Ord::cmp),
            Self::MapStringInt64(v) => canonicalize_map(v, Ord::cmp),
            Self::MapStringFloat(v) => canonicalize_map(v, Ord::cmp),
            Self::MapInt64String(v) => canonicalize_map(v, Ord::cmp),
            Self::MapInt64Int64(v) => canonicalize_map(v, Ord::cmp),
            Self::MapInt64Float(v) => canonicalize_map(v, Ord::cmp),
            _ => {}
        }
    }

    /// Checks whether a container value contains `needle` (the `CONTAINS`
    /// predicate for sets/lists, or key membership for maps).
    #[must_use]
    pub fn contains(&self, needle: &Self) -> bool {
        match (self, needle) {
            (Self::ListString(v) | Self::SetString(v), Self::String(n)) => v.contains(n),
            (Self::ListInt64(v) | Self::SetInt64(v), Self::Int64(n)) => v.contains(n),
            (Self::ListFloat(v) | Self::SetFloat(v), Self::Float(n)) => v.iter().any(|f| f == n),
            (Self::MapStringString(v), Self::String(n)) => v.iter().any(|(k, _)| k == n),
            (Self::MapStringInt64(v), Self::String(n)) => v.iter().any(|(k, _)| k == n),
            (Self::MapStringFloat(v), Self::String(n)) => v.iter().any(|(k, _)| k == n),
            (Self::MapInt64String(v), Self::Int64(n)) => v.iter().any(|(k, _)| k == n),
            (Self::MapInt64Int64(v), Self::Int64(n)) => v.iter().any(|(k, _)| k == n),
            (Self::MapInt64Float(v), Self::Int64(n)) => v.iter().any(|(k, _)| k == n),
            _ => false,
        }
    }
}

fn canonicalize_map<K: Ord + PartialEq + Clone, V>(v: &mut Vec<(K, V)>, cmp: impl Fn(&K, &K) -> Ordering) {
    v.sort_by(|a, b| cmp(&a.0, &b.0));
    v.dedup_by(|a, b| a.0 == b.0);
}
