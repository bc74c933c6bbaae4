//! Message bodies (§6). The header layout is fixed-width and hand-rolled
//! (see [`crate::header`]); bodies are variable-shape structures, so they
//! are serialized through `postcard` -- only the semantics named in §6
//! are guaranteed, not a specific byte layout.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use hyperbase_types::{AttributeCheck, AuthWallet, Funcall, ResultCode, Value};

use crate::error::WireError;

pub fn encode_body<T: Serialize>(body: &T) -> Result<Vec<u8>, WireError> {
    Ok(postcard::to_allocvec(body)?)
}

pub fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    Ok(postcard::from_bytes(bytes)?)
}

/// `key ‖ flags ‖ attribute_check[] ‖ funcall[] ‖ [auth_wallet]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedRequestBody {
    pub key: Value,
    pub checks: Vec<AttributeCheck>,
    pub funcalls: Vec<Funcall>,
    pub wallet: Option<AuthWallet>,
}

/// Reply to a keyed read: the secondary attribute values in schema order
/// (sensitive attributes already stripped by the server, §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetReplyBody {
    pub code: ResultCode,
    pub attrs: Vec<Value>,
}

/// Reply to a keyed write/delete: just the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReplyBody {
    pub code: ResultCode,
}

/// `client_id ‖ attribute_check[]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequestBody {
    pub client_id: u64,
    pub checks: Vec<AttributeCheck>,
}

/// `key ‖ value[]`, one per matching record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchItemFrame {
    pub key: Value,
    pub attrs: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchNextFrame {
    pub client_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDoneFrame {
    pub client_id: u64,
}

/// `attribute_check[] ‖ limit ‖ sort_attr ‖ maximize(1 byte)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortedSearchRequestBody {
    pub checks: Vec<AttributeCheck>,
    pub limit: u64,
    pub sort_attr: usize,
    pub maximize: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortedSearchReplyBody {
    pub code: ResultCode,
    pub items: Vec<SearchItemFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountRequestBody {
    pub checks: Vec<AttributeCheck>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountReplyBody {
    pub code: ResultCode,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SumRequestBody {
    pub checks: Vec<AttributeCheck>,
    pub attr: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SumReplyBody {
    pub code: ResultCode,
    pub sum: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDelRequestBody {
    pub checks: Vec<AttributeCheck>,
}

/// `attribute_check[] ‖ flags ‖ funcall[]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAtomicRequestBody {
    pub checks: Vec<AttributeCheck>,
    pub flags: u8,
    pub funcalls: Vec<Funcall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDescribeRequestBody {
    pub checks: Vec<AttributeCheck>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDescribeReplyBody {
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperbase_types::Predicate;

    #[test]
    fn keyed_request_body_round_trips() {
        let body = KeyedRequestBody {
            key: Value::String(b"hello".to_vec()),
            checks: vec![AttributeCheck::new(1, Value::Int64(5), Predicate::Equals)],
            funcalls: vec![Funcall::set(1, Value::Int64(6))],
            wallet: None,
        };
        let bytes = encode_body(&body).unwrap();
        let decoded: KeyedRequestBody = decode_body(&bytes).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn get_reply_round_trips() {
        let body = GetReplyBody { code: ResultCode::Success, attrs: vec![Value::Int64(1)] };
        let bytes = encode_body(&body).unwrap();
        let decoded: GetReplyBody = decode_body(&bytes).unwrap();
        assert_eq!(decoded.attrs, body.attrs);
    }
}
