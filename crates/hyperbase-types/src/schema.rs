//! Space schemas (§3 Schema).

use serde::{Deserialize, Serialize};

use crate::datatype::DataType;

/// One named, typed field. Position 0 in a [`Schema`] is always the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub datatype: DataType,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self { name: name.into(), datatype }
    }
}

/// Returns true if `name` is a valid C identifier that does not start with
/// the reserved `__` prefix.
#[must_use]
pub fn is_valid_attribute_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    !name.is_empty() && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Ordered list of attributes for a space. Immutable within a space version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub attributes: Vec<Attribute>,
    /// Set when the space requires auth-wallet capability checks (§4.5).
    pub authorization: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("schema has no attributes")]
    Empty,
    #[error("key type is not hashable")]
    KeyNotHashable,
    #[error("duplicate attribute name")]
    DuplicateName,
    #[error("invalid attribute name")]
    InvalidName,
    #[error("authorization requires a macaroon-secret attribute")]
    MissingSecretAttribute,
}

impl Schema {
    pub fn new(attributes: Vec<Attribute>, authorization: bool) -> Result<Self, SchemaError> {
        let schema = Self { attributes, authorization };
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.attributes.is_empty() {
            return Err(SchemaError::Empty);
        }
        if !self.attributes[0].datatype.hashable() {
            return Err(SchemaError::KeyNotHashable);
        }
        let mut names = std::collections::HashSet::new();
        for attr in &self.attributes {
            if !is_valid_attribute_name(&attr.name) {
                return Err(SchemaError::InvalidName);
            }
            if !names.insert(attr.name.as_str()) {
                return Err(SchemaError::DuplicateName);
            }
        }
        if self.authorization && !self.attributes.iter().any(|a| a.datatype.is_sensitive()) {
            return Err(SchemaError::MissingSecretAttribute);
        }
        Ok(())
    }

    #[must_use]
    pub fn key(&self) -> &Attribute {
        &self.attributes[0]
    }

    #[must_use]
    pub fn secondary_attributes(&self) -> &[Attribute] {
        &self.attributes[1..]
    }

    /// Resolves an attribute by name to its position (0 = key).
    #[must_use]
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    #[must_use]
    pub fn secret_attribute_position(&self) -> Option<usize> {
        self.attributes.iter().position(|a| a.datatype.is_sensitive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv_schema() -> Schema {
        Schema::new(
            vec![Attribute::new("k", DataType::String), Attribute::new("v", DataType::String)],
            false,
        )
        .unwrap()
    }

    #[test]
    fn key_must_be_hashable() {
        let bad = Schema::new(vec![Attribute::new("k", DataType::Document)], false);
        assert_eq!(bad.unwrap_err(), SchemaError::KeyNotHashable);
    }

    #[test]
    fn duplicate_names_rejected() {
        let bad = Schema::new(
            vec![Attribute::new("k", DataType::String), Attribute::new("k", DataType::Int64)],
            false,
        );
        assert_eq!(bad.unwrap_err(), SchemaError::DuplicateName);
    }

    #[test]
    fn reserved_prefix_rejected() {
        assert!(!is_valid_attribute_name("__hidden"));
        assert!(is_valid_attribute_name("visible"));
    }

    #[test]
    fn authorization_requires_secret_attribute() {
        let bad = Schema::new(vec![Attribute::new("k", DataType::String)], true);
        assert_eq!(bad.unwrap_err(), SchemaError::MissingSecretAttribute);
    }

    #[test]
    fn position_lookup() {
        let schema = kv_schema();
        assert_eq!(schema.position_of("v"), Some(1));
        assert_eq!(schema.position_of("missing"), None);
    }
}
