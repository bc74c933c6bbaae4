//! Request preparation (§4.2 "Request preparation for keyed ops").
//!
//! Turns the caller's name-addressed selections, attribute writes, and map
//! writes into schema-position-addressed [`AttributeCheck`]/[`Funcall`]
//! lists, in the order the wire body expects them.

use hyperbase_types::{AttributeCheck, DataType, Funcall, FuncallName, Predicate, ResultCode, Schema, Value};

use crate::error::ClientError;

/// Resolves `name` to a schema position. A dotted name (`"profile.age"`)
/// addresses a subfield of a `Document` attribute; only the attribute
/// itself is schema-resolved here; the subfield path is carried by the
/// caller alongside the resolved position; it cannot be folded into
/// [`AttributeCheck`] because that type has no subfield slot (§3).
#[track_caller]
pub fn resolve_attr(schema: &Schema, name: &str) -> Result<usize, ClientError> {
    let head = name.split('.').next().unwrap_or(name);
    schema.position_of(head).ok_or_else(|| ClientError::new(ResultCode::UnknownAttr))
}

/// One predicate named by attribute, before schema resolution (§4.2 step 3).
#[derive(Debug, Clone)]
pub struct RawCheck {
    pub attr_name: String,
    pub value: Value,
    pub predicate: Predicate,
}

/// Resolves and validates `raw` against `schema`, producing the
/// attribute-position-addressed checks the wire body carries, stably
/// sorted by attribute number (§4.2 step 6).
#[track_caller]
pub fn prepare_checks(schema: &Schema, raw: Vec<RawCheck>) -> Result<Vec<AttributeCheck>, ClientError> {
    let mut out = Vec::with_capacity(raw.len());
    for check in raw {
        let attr = resolve_attr(schema, &check.attr_name)?;
        let datatype = schema.attributes[attr].datatype;
        if !datatype.supports_predicate(check.predicate) {
            return Err(ClientError::new(ResultCode::WrongType));
        }
        out.push(AttributeCheck::new(attr, check.value, check.predicate));
    }
    out.sort_by_key(|c| c.attr);
    Ok(out)
}

/// One attribute write, before schema resolution (§4.2 step 4).
#[derive(Debug, Clone)]
pub struct RawAttr {
    pub attr_name: String,
    pub value: Value,
}

/// Resolves `raw` into `SET` funcalls, rejecting the key position with
/// `DONTUSEKEY` and parsing document attributes' JSON payload into the
/// canonical `Value::Document` representation (§4.2 step 4).
#[track_caller]
pub fn prepare_attrs(schema: &Schema, raw: Vec<RawAttr>) -> Result<Vec<Funcall>, ClientError> {
    let mut out = Vec::with_capacity(raw.len());
    for attr in raw {
        let pos = resolve_attr(schema, &attr.attr_name)?;
        if pos == 0 {
            return Err(ClientError::new(ResultCode::DontUseKey));
        }
        let datatype = schema.attributes[pos].datatype;
        let value = coerce_document(datatype, attr.value)?;
        out.push(Funcall::set(pos, value));
    }
    sort_funcalls_stable(&mut out);
    Ok(out)
}

/// One map-attribute write: a key/value pair addressed by attribute name
/// (§4.2 step 5).
#[derive(Debug, Clone)]
pub struct RawMapAttr {
    pub attr_name: String,
    pub key: Value,
    pub value: Value,
}

#[track_caller]
pub fn prepare_map_attrs(schema: &Schema, raw: Vec<RawMapAttr>) -> Result<Vec<Funcall>, ClientError> {
    let mut out = Vec::with_capacity(raw.len());
    for entry in raw {
        let pos = resolve_attr(schema, &entry.attr_name)?;
        if pos == 0 {
            return Err(ClientError::new(ResultCode::DontUseKey));
        }
        out.push(Funcall::map_entry(pos, FuncallName::MapAdd, entry.key, entry.value));
    }
    sort_funcalls_stable(&mut out);
    Ok(out)
}

/// If `value` is a string destined for a `Document` attribute, parses it as
/// JSON text into `Value::Document`; otherwise passes it through unchanged.
/// A malformed payload fails with `WRONGTYPE`.
#[track_caller]
fn coerce_document(datatype: DataType, value: Value) -> Result<Value, ClientError> {
    if !datatype.is_document() {
        return Ok(value);
    }
    match value {
        Value::Document(_) => Ok(value),
        Value::String(bytes) => {
            let text = std::str::from_utf8(&bytes).map_err(|_| ClientError::new(ResultCode::WrongType))?;
            let parsed: serde_json::Value =
                serde_json::from_str(text).map_err(|_| ClientError::new(ResultCode::WrongType))?;
            Ok(Value::Document(parsed))
        }
        _ => Err(ClientError::new(ResultCode::WrongType)),
    }
}

/// Stable sort by attribute number; funcalls on the same attribute keep
/// their relative order since the mutation primitives are not in general
/// commutative (§4.2 step 6).
pub fn sort_funcalls_stable(funcalls: &mut [Funcall]) {
    funcalls.sort_by_key(|f| f.attr);
}

/// Validates the key's datatype against the schema's declared key type
/// (§4.2 step 2).
#[track_caller]
pub fn validate_key(schema: &Schema, key: &Value) -> Result<(), ClientError> {
    if key.datatype() != schema.key().datatype || !key.validate() {
        return Err(ClientError::new(ResultCode::WrongType));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperbase_types::Attribute;

    fn schema() -> Schema {
        Schema::new(
            vec![
                Attribute::new("k", DataType::String),
                Attribute::new("age", DataType::Int64),
                Attribute::new("profile", DataType::Document),
            ],
            false,
        )
        .unwrap()
    }

    #[test]
    fn key_position_is_rejected_for_attrs() {
        let err = prepare_attrs(&schema(), vec![RawAttr { attr_name: "k".into(), value: Value::String(b"x".to_vec()) }])
            .unwrap_err();
        assert_eq!(err.code, ResultCode::DontUseKey);
    }

    #[test]
    fn unknown_attribute_name_fails() {
        let err = resolve_attr(&schema(), "nope").unwrap_err();
        assert_eq!(err.code, ResultCode::UnknownAttr);
    }

    #[test]
    fn dotted_name_resolves_its_document_head() {
        assert_eq!(resolve_attr(&schema(), "profile.nested.field").unwrap(), 2);
    }

    #[test]
    fn document_attribute_parses_json_string_payload() {
        let funcalls = prepare_attrs(
            &schema(),
            vec![RawAttr { attr_name: "profile".into(), value: Value::String(br#"{"a":1}"#.to_vec()) }],
        )
        .unwrap();
        assert_eq!(funcalls[0].arg1, Some(Value::Document(serde_json::json!({"a": 1}))));
    }

    #[test]
    fn malformed_document_json_is_wrongtype() {
        let err = prepare_attrs(
            &schema(),
            vec![RawAttr { attr_name: "profile".into(), value: Value::String(b"{not json".to_vec()) }],
        )
        .unwrap_err();
        assert_eq!(err.code, ResultCode::WrongType);
    }

    #[test]
    fn checks_sort_stably_by_attribute() {
        let checks = prepare_checks(
            &schema(),
            vec![
                RawCheck { attr_name: "age".into(), value: Value::Int64(1), predicate: Predicate::GreaterThan },
                RawCheck { attr_name: "k".into(), value: Value::String(b"a".to_vec()), predicate: Predicate::Equals },
            ],
        )
        .unwrap();
        assert_eq!(checks[0].attr, 0);
        assert_eq!(checks[1].attr, 1);
    }

    #[test]
    fn key_validation_rejects_wrong_datatype() {
        let err = validate_key(&schema(), &Value::Int64(1)).unwrap_err();
        assert_eq!(err.code, ResultCode::WrongType);
    }

    use test_case::test_case;

    #[test_case("k", Ok(0); "key_resolves_to_position_zero")]
    #[test_case("age", Ok(1); "second_attribute_resolves")]
    #[test_case("profile", Ok(2); "third_attribute_resolves")]
    #[test_case("profile.nested.field", Ok(2); "dotted_path_resolves_its_head")]
    #[test_case("ghost", Err(ResultCode::UnknownAttr); "unknown_name_is_rejected")]
    fn resolve_attr_table(name: &str, expect: Result<usize, ResultCode>) {
        let result = resolve_attr(&schema(), name).map_err(|e| e.code);
        assert_eq!(result, expect);
    }

    use proptest::prelude::*;

    proptest! {
        /// Funcalls on the same attribute keep their relative input order
        /// after a stable sort by attribute number, however the attributes
        /// are interleaved.
        #[test]
        fn sort_funcalls_stable_preserves_same_attr_order(attrs in prop::collection::vec(0usize..4, 0..20)) {
            let mut funcalls: Vec<Funcall> = attrs
                .iter()
                .enumerate()
                .map(|(i, &attr)| Funcall::set(attr, Value::Int64(i as i64)))
                .collect();
            sort_funcalls_stable(&mut funcalls);
            let mut last_seen: std::collections::HashMap<usize, i64> = std::collections::HashMap::new();
            for f in &funcalls {
                let Some(Value::Int64(seq)) = f.arg1.clone() else { unreachable!() };
                if let Some(&prev) = last_seen.get(&f.attr) {
                    prop_assert!(prev < seq);
                }
                last_seen.insert(f.attr, seq);
            }
        }
    }
}
