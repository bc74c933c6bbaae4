//! Container byte layout (§6) — the wire (and, in the real system, on-disk)
//! encoding for list/set/map values. Sets and maps are canonicalized
//! (sorted by key under the datatype's compare) before serialization, so
//! two equal containers always encode identically.
//!
//! Layout: a little-endian 32-bit element count, then elements back to
//! back. Strings are themselves length-prefixed (little-endian 32-bit);
//! ints are little-endian fixed 8 bytes; floats are little-endian
//! IEEE-754 doubles.

use hyperbase_types::Value;

use crate::error::WireError;

fn encode_count(n: usize, out: &mut Vec<u8>) {
    out.extend_from_slice(&(n as u32).to_le_bytes());
}

fn decode_count(bytes: &[u8]) -> Result<(u32, &[u8]), WireError> {
    if bytes.len() < 4 {
        return Err(WireError::Truncated { need: 4, have: bytes.len() });
    }
    let (head, rest) = bytes.split_at(4);
    Ok((u32::from_le_bytes(head.try_into().unwrap()), rest))
}

fn encode_string(s: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s);
}

fn decode_string(bytes: &[u8]) -> Result<(Vec<u8>, &[u8]), WireError> {
    let (len, rest) = decode_count(bytes)?;
    let len = len as usize;
    if rest.len() < len {
        return Err(WireError::Truncated { need: len, have: rest.len() });
    }
    let (s, rest) = rest.split_at(len);
    Ok((s.to_vec(), rest))
}

fn decode_i64(bytes: &[u8]) -> Result<(i64, &[u8]), WireError> {
    if bytes.len() < 8 {
        return Err(WireError::Truncated { need: 8, have: bytes.len() });
    }
    let (head, rest) = bytes.split_at(8);
    Ok((i64::from_le_bytes(head.try_into().unwrap()), rest))
}

fn decode_f64(bytes: &[u8]) -> Result<(f64, &[u8]), WireError> {
    if bytes.len() < 8 {
        return Err(WireError::Truncated { need: 8, have: bytes.len() });
    }
    let (head, rest) = bytes.split_at(8);
    Ok((f64::from_le_bytes(head.try_into().unwrap()), rest))
}

/// Encodes a container value. Returns `MalformedContainer` for a scalar
/// (non-container) value.
pub fn encode_container(value: &Value) -> Result<Vec<u8>, WireError> {
    let mut value = value.clone();
    value.canonicalize();
    let mut out = Vec::new();
    match &value {
        Value::ListString(v) | Value::SetString(v) => {
            encode_count(v.len(), &mut out);
            for s in v {
                encode_string(s, &mut out);
            }
        }
        Value::ListInt64(v) | Value::SetInt64(v) => {
            encode_count(v.len(), &mut out);
            for i in v {
                out.extend_from_slice(&i.to_le_bytes());
            }
        }
        Value::ListFloat(v) | Value::SetFloat(v) => {
            encode_count(v.len(), &mut out);
            for f in v {
                out.extend_from_slice(&f.to_le_bytes());
            }
        }
        Value::MapStringString(m) => {
            encode_count(m.len(), &mut out);
            for (k, v) in m {
                encode_string(k, &mut out);
                encode_string(v, &mut out);
            }
        }
        Value::MapStringInt64(m) => {
            encode_count(m.len(), &mut out);
            for (k, v) in m {
                encode_string(k, &mut out);
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        Value::MapStringFloat(m) => {
            encode_count(m.len(), &mut out);
            for (k, v) in m {
                encode_string(k, &mut out);
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        Value::MapInt64String(m) => {
            encode_count(m.len(), &mut out);
            for (k, v) in m {
                out.extend_from_slice(&k.to_le_bytes());
                encode_string(v, &mut out);
            }
        }
        Value::MapInt64Int64(m) => {
            encode_count(m.len(), &mut out);
            for (k, v) in m {
                out.extend_from_slice(&k.to_le_bytes());
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        Value::MapInt64Float(m) => {
            encode_count(m.len(), &mut out);
            for (k, v) in m {
                out.extend_from_slice(&k.to_le_bytes());
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        _ => return Err(WireError::MalformedContainer),
    }
    Ok(out)
}

/// Decodes a container value of the shape named by `datatype`.
pub fn decode_container(datatype: hyperbase_types::DataType, bytes: &[u8]) -> Result<Value, WireError> {
    use hyperbase_types::DataType as D;
    let (count, mut rest) = decode_count(bytes)?;
    let count = count as usize;
    match datatype {
        D::ListString | D::SetString => {
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let (s, r) = decode_string(rest)?;
                items.push(s);
                rest = r;
            }
            Ok(if datatype == D::ListString { Value::ListString(items) } else { Value::SetString(items) })
        }
        D::ListInt64 | D::SetInt64 => {
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let (i, r) = decode_i64(rest)?;
                items.push(i);
                rest = r;
            }
            Ok(if datatype == D::ListInt64 { Value::ListInt64(items) } else { Value::SetInt64(items) })
        }
        D::ListFloat | D::SetFloat => {
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let (f, r) = decode_f64(rest)?;
                items.push(f);
                rest = r;
            }
            Ok(if datatype == D::ListFloat { Value::ListFloat(items) } else { Value::SetFloat(items) })
        }
        D::MapStringString => {
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let (k, r) = decode_string(rest)?;
                let (v, r) = decode_string(r)?;
                items.push((k, v));
                rest = r;
            }
            Ok(Value::MapStringString(items))
        }
        D::MapStringInt64 => {
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let (k, r) = decode_string(rest)?;
                let (v, r) = decode_i64(r)?;
                items.push((k, v));
                rest = r;
            }
            Ok(Value::MapStringInt64(items))
        }
        D::MapStringFloat => {
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let (k, r) = decode_string(rest)?;
                let (v, r) = decode_f64(r)?;
                items.push((k, v));
                rest = r;
            }
            Ok(Value::MapStringFloat(items))
        }
        D::MapInt64String => {
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let (k, r) = decode_i64(rest)?;
                let (v, r) = decode_string(r)?;
                items.push((k, v));
                rest = r;
            }
            Ok(Value::MapInt64String(items))
        }
        D::MapInt64Int64 => {
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let (k, r) = decode_i64(rest)?;
                let (v, r) = decode_i64(r)?;
                items.push((k, v));
                rest = r;
            }
            Ok(Value::MapInt64Int64(items))
        }
        D::MapInt64Float => {
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let (k, r) = decode_i64(rest)?;
                let (v, r) = decode_f64(r)?;
                items.push((k, v));
                rest = r;
            }
            Ok(Value::MapInt64Float(items))
        }
        _ => Err(WireError::MalformedContainer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperbase_types::DataType;

    #[test]
    fn list_string_round_trips() {
        let v = Value::ListString(vec![b"b".to_vec(), b"a".to_vec()]);
        let bytes = encode_container(&v).unwrap();
        let decoded = decode_container(DataType::ListString, &bytes).unwrap();
        assert_eq!(decoded, Value::ListString(vec![b"b".to_vec(), b"a".to_vec()]));
    }

    #[test]
    fn set_int64_is_canonicalized_before_encoding() {
        let v = Value::SetInt64(vec![3, 1, 2, 1]);
        let bytes = encode_container(&v).unwrap();
        let decoded = decode_container(DataType::SetInt64, &bytes).unwrap();
        assert_eq!(decoded, Value::SetInt64(vec![1, 2, 3]));
    }

    #[test]
    fn map_string_int64_round_trips_sorted() {
        let v = Value::MapStringInt64(vec![(b"z".to_vec(), 1), (b"a".to_vec(), 2)]);
        let bytes = encode_container(&v).unwrap();
        let decoded = decode_container(DataType::MapStringInt64, &bytes).unwrap();
        assert_eq!(decoded, Value::MapStringInt64(vec![(b"a".to_vec(), 2), (b"z".to_vec(), 1)]));
    }

    #[test]
    fn truncated_container_is_rejected() {
        assert!(decode_container(DataType::ListInt64, &[2, 0, 0, 0, 1]).is_err());
    }

    #[test]
    fn scalar_value_is_not_a_container() {
        assert!(encode_container(&Value::Int64(5)).is_err());
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn list_int64_round_trips_for_any_contents(items in prop::collection::vec(any::<i64>(), 0..32)) {
            let v = Value::ListInt64(items);
            let bytes = encode_container(&v).unwrap();
            let decoded = decode_container(DataType::ListInt64, &bytes).unwrap();
            prop_assert_eq!(decoded, v);
        }

        #[test]
        fn set_string_round_trips_sorted_and_deduped(
            items in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..8), 0..16),
        ) {
            let mut expected = items.clone();
            expected.sort_unstable();
            expected.dedup();
            let bytes = encode_container(&Value::SetString(items)).unwrap();
            let decoded = decode_container(DataType::SetString, &bytes).unwrap();
            prop_assert_eq!(decoded, Value::SetString(expected));
        }

        #[test]
        fn map_int64_int64_round_trips_for_any_contents(
            keys in prop::collection::vec(any::<i64>(), 0..16),
            values in prop::collection::vec(any::<i64>(), 0..16),
        ) {
            let n = keys.len().min(values.len());
            let mut entries: Vec<(i64, i64)> = keys.into_iter().zip(values).take(n).collect();
            entries.sort_by_key(|(k, _)| *k);
            entries.dedup_by(|a, b| a.0 == b.0);
            let bytes = encode_container(&Value::MapInt64Int64(entries.clone())).unwrap();
            let decoded = decode_container(DataType::MapInt64Int64, &bytes).unwrap();
            prop_assert_eq!(decoded, Value::MapInt64Int64(entries));
        }
    }
}
