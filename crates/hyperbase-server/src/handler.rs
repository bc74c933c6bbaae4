//! Routes decoded requests to the region store, the replication chain and
//! the auth layer, and builds the wire reply (§4.6).
//!
//! This is the point where the three in-scope daemon responsibilities meet:
//! §4.5 auth wrapping, the §4.6 storage/replication boundaries, and the §6
//! wire bodies. A real daemon drives one `RequestHandler` per hosted
//! `(region, virtual_server)`; this crate never decides *which* daemon a
//! request should have reached -- that routing happens client-side and
//! coordinator-side (`hyperbase-directory`, `hyperbase-client`).

use hyperbase_types::{Funcall, Schema, Value, sort_funcalls};
use hyperbase_wire::{
    CountReplyBody, CountRequestBody, GetReplyBody, GroupAtomicRequestBody, GroupDelRequestBody, MessageType,
    ResponseHeader, SearchDescribeReplyBody, SearchDescribeRequestBody, StatusReplyBody, SumReplyBody,
    SumRequestBody, decode_body, encode_body,
};
use hyperbase_types::ResultCode;

use crate::auth::{self, AuthDecision};
use crate::error::{ServerError, ServerResult};
use crate::replication::{ChainLink, ChainOutcome};
use crate::storage::RegionStore;

/// Decoded request body shapes share just enough (`checks`, `wallet`) that
/// the handler only needs `hyperbase_wire::decode_body::<T>` at the
/// dispatch site, not a trait -- matching the closed set of message types
/// in §6.
pub struct RequestHandler<S, C> {
    schema: Schema,
    store: S,
    chain: C,
}

impl<S: RegionStore, C: ChainLink> RequestHandler<S, C> {
    pub fn new(schema: Schema, store: S, chain: C) -> Self {
        Self { schema, store, chain }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handles one already-deframed request, returning the encoded
    /// response header and body ready to queue on a connection.
    pub fn handle(
        &mut self,
        header: &hyperbase_wire::RequestHeader,
        body: &[u8],
        now_unix_seconds: u64,
    ) -> ServerResult<(ResponseHeader, Vec<u8>)> {
        use MessageType as M;
        let (reply_type, code, payload) = match header.message_type {
            M::Get => self.handle_get(body, header, now_unix_seconds)?,
            M::Put | M::CondPut => self.handle_put(body, header, now_unix_seconds)?,
            M::Del | M::CondDel => self.handle_del(body, header, now_unix_seconds)?,
            M::Atomic => self.handle_put(body, header, now_unix_seconds)?,
            M::Count => self.handle_count(body)?,
            M::Sum => self.handle_sum(body)?,
            M::GroupDel => self.handle_group_del(body)?,
            M::GroupAtomic => self.handle_group_atomic(body)?,
            M::SearchDescribe => self.handle_search_describe(body)?,
            _unsupported => {
                return Ok((
                    ResponseHeader {
                        message_type: MessageType::ServerError,
                        dest_virtual_server: header.dest_virtual_server,
                        nonce: header.nonce,
                    },
                    encode_body(&StatusReplyBody { code: ResultCode::Malformed })?,
                ));
            }
        };
        let _ = code;
        let response_header =
            ResponseHeader { message_type: reply_type, dest_virtual_server: header.dest_virtual_server, nonce: header.nonce };
        Ok((response_header, payload))
    }

    fn current_secret_wallet<'a>(
        &self,
        wallet: &'a Option<hyperbase_types::AuthWallet>,
    ) -> hyperbase_types::AuthWallet {
        wallet.clone().unwrap_or_default()
    }

    fn handle_get(
        &mut self,
        body: &[u8],
        header: &hyperbase_wire::RequestHeader,
        now: u64,
    ) -> ServerResult<(MessageType, ResultCode, Vec<u8>)> {
        let req: hyperbase_wire::KeyedRequestBody = decode_body(body)?;
        let stored = self.store.get(&req.key).map_err(|e| ServerError::Storage(e.to_string()))?;
        let code = match &stored {
            None => ResultCode::NotFound,
            Some(attrs) => {
                if self.schema.authorization {
                    let wallet = self.current_secret_wallet(&req.wallet);
                    match auth::authorize_read(&self.schema, attrs, &wallet, now) {
                        AuthDecision::Allowed => ResultCode::Success,
                        AuthDecision::Denied => ResultCode::NoCanDo,
                    }
                } else {
                    ResultCode::Success
                }
            }
        };
        let _ = header;
        let mut attrs = stored.unwrap_or_default();
        if code == ResultCode::Success {
            auth::strip_sensitive(&self.schema, &mut attrs);
        } else {
            attrs.clear();
        }
        let reply = GetReplyBody { code, attrs };
        Ok((MessageType::GetReply, code, encode_body(&reply)?))
    }

    fn handle_put(
        &mut self,
        body: &[u8],
        header: &hyperbase_wire::RequestHeader,
        now: u64,
    ) -> ServerResult<(MessageType, ResultCode, Vec<u8>)> {
        let mut req: hyperbase_wire::KeyedRequestBody = decode_body(body)?;
        let stored = self.store.get(&req.key).map_err(|e| ServerError::Storage(e.to_string()))?;

        if header.fail_if_found() && stored.is_some() {
            return Ok((MessageType::PutReply, ResultCode::CmpFail, encode_body(&StatusReplyBody { code: ResultCode::CmpFail })?));
        }
        if header.fail_if_not_found() && stored.is_none() {
            return Ok((MessageType::PutReply, ResultCode::NotFound, encode_body(&StatusReplyBody { code: ResultCode::NotFound })?));
        }
        if let Some(attrs) = &stored {
            if !req.checks.iter().all(|c| check_matches(&self.schema, c, attrs)) {
                return Ok((MessageType::PutReply, ResultCode::CmpFail, encode_body(&StatusReplyBody { code: ResultCode::CmpFail })?));
            }
        }

        if self.schema.authorization {
            let wallet = self.current_secret_wallet(&req.wallet);
            let decision = auth::authorize_write(&self.schema, stored.as_deref(), &wallet, &req.funcalls, now);
            if decision == AuthDecision::Denied {
                return Ok((MessageType::PutReply, ResultCode::NoCanDo, encode_body(&StatusReplyBody { code: ResultCode::NoCanDo })?));
            }
        }

        sort_funcalls(&mut req.funcalls);
        let new_attrs = apply_funcalls(&self.schema, stored.as_deref(), &req.funcalls);

        let outcome =
            self.chain.replicate(&req.key, &new_attrs).map_err(|e| ServerError::Replication(e.to_string()))?;
        let code = match outcome {
            ChainOutcome::Acknowledged | ChainOutcome::NotOriginator => {
                self.store.put(&req.key, new_attrs).map_err(|e| ServerError::Storage(e.to_string()))?;
                ResultCode::Success
            }
            ChainOutcome::Failed => ResultCode::ServerError,
        };
        Ok((MessageType::PutReply, code, encode_body(&StatusReplyBody { code })?))
    }

    fn handle_del(
        &mut self,
        body: &[u8],
        header: &hyperbase_wire::RequestHeader,
        now: u64,
    ) -> ServerResult<(MessageType, ResultCode, Vec<u8>)> {
        let req: hyperbase_wire::KeyedRequestBody = decode_body(body)?;
        let stored = self.store.get(&req.key).map_err(|e| ServerError::Storage(e.to_string()))?;
        if header.fail_if_not_found() && stored.is_none() {
            return Ok((MessageType::DelReply, ResultCode::NotFound, encode_body(&StatusReplyBody { code: ResultCode::NotFound })?));
        }
        let code = match &stored {
            None => ResultCode::NotFound,
            Some(attrs) => {
                if !req.checks.iter().all(|c| check_matches(&self.schema, c, attrs)) {
                    ResultCode::CmpFail
                } else if self.schema.authorization
                    && auth::authorize_write(&self.schema, Some(attrs), &self.current_secret_wallet(&req.wallet), &[], now)
                        == AuthDecision::Denied
                {
                    ResultCode::NoCanDo
                } else {
                    self.store.delete(&req.key).map_err(|e| ServerError::Storage(e.to_string()))?;
                    ResultCode::Success
                }
            }
        };
        Ok((MessageType::DelReply, code, encode_body(&StatusReplyBody { code })?))
    }

    fn handle_count(&mut self, body: &[u8]) -> ServerResult<(MessageType, ResultCode, Vec<u8>)> {
        let req: CountRequestBody = decode_body(body)?;
        let records = self.store.scan().map_err(|e| ServerError::Storage(e.to_string()))?;
        let count = records
            .iter()
            .filter(|(_, attrs)| req.checks.iter().all(|c| check_matches(&self.schema, c, attrs)))
            .count() as u64;
        let reply = CountReplyBody { code: ResultCode::Success, count };
        Ok((MessageType::CountReply, ResultCode::Success, encode_body(&reply)?))
    }

    fn handle_sum(&mut self, body: &[u8]) -> ServerResult<(MessageType, ResultCode, Vec<u8>)> {
        let req: SumRequestBody = decode_body(body)?;
        let records = self.store.scan().map_err(|e| ServerError::Storage(e.to_string()))?;
        let mut int_total: i64 = 0;
        let mut float_total = 0.0_f64;
        let mut is_float = false;
        let mut any = false;
        for (_, attrs) in &records {
            if !req.checks.iter().all(|c| check_matches(&self.schema, c, attrs)) {
                continue;
            }
            let Some(idx) = req.attr.checked_sub(1) else { continue };
            match attrs.get(idx) {
                Some(Value::Int64(v)) => {
                    int_total += v;
                    any = true;
                }
                Some(Value::Float(v)) => {
                    is_float = true;
                    float_total += v;
                    any = true;
                }
                _ => {}
            }
        }
        let sum = if !any {
            None
        } else if is_float {
            Some(Value::Float(float_total + int_total as f64))
        } else {
            Some(Value::Int64(int_total))
        };
        let reply = SumReplyBody { code: ResultCode::Success, sum };
        Ok((MessageType::SumReply, ResultCode::Success, encode_body(&reply)?))
    }

    fn handle_group_del(&mut self, body: &[u8]) -> ServerResult<(MessageType, ResultCode, Vec<u8>)> {
        let req: GroupDelRequestBody = decode_body(body)?;
        let records = self.store.scan().map_err(|e| ServerError::Storage(e.to_string()))?;
        let mut count: u64 = 0;
        for (key, attrs) in &records {
            if req.checks.iter().all(|c| check_matches(&self.schema, c, attrs)) {
                self.store.delete(key).map_err(|e| ServerError::Storage(e.to_string()))?;
                count += 1;
            }
        }
        let reply = CountReplyBody { code: ResultCode::Success, count };
        Ok((MessageType::GroupDelReply, ResultCode::Success, encode_body(&reply)?))
    }

    fn handle_group_atomic(&mut self, body: &[u8]) -> ServerResult<(MessageType, ResultCode, Vec<u8>)> {
        let mut req: GroupAtomicRequestBody = decode_body(body)?;
        sort_funcalls(&mut req.funcalls);
        let records = self.store.scan().map_err(|e| ServerError::Storage(e.to_string()))?;
        let mut count: u64 = 0;
        for (key, attrs) in &records {
            if !req.checks.iter().all(|c| check_matches(&self.schema, c, attrs)) {
                continue;
            }
            let new_attrs = apply_funcalls(&self.schema, Some(attrs), &req.funcalls);
            self.store.put(key, new_attrs).map_err(|e| ServerError::Storage(e.to_string()))?;
            count += 1;
        }
        let reply = CountReplyBody { code: ResultCode::Success, count };
        Ok((MessageType::GroupAtomicReply, ResultCode::Success, encode_body(&reply)?))
    }

    fn handle_search_describe(&mut self, body: &[u8]) -> ServerResult<(MessageType, ResultCode, Vec<u8>)> {
        let req: SearchDescribeRequestBody = decode_body(body)?;
        let description = format!(
            "space({} attrs, authorization={}) matching {} checks",
            self.schema.attributes.len(),
            self.schema.authorization,
            req.checks.len()
        );
        let reply = SearchDescribeReplyBody { description };
        Ok((MessageType::SearchDescribeReply, ResultCode::Success, encode_body(&reply)?))
    }
}

/// Evaluates an attribute check against a record's secondary attributes.
/// `check.attr == 0` addresses the key, which a daemon-level check never
/// needs (the client already resolved it to a point leader before this
/// request was sent); such a check is treated as never matching.
fn check_matches(schema: &Schema, check: &hyperbase_types::AttributeCheck, attrs: &[Value]) -> bool {
    let Some(idx) = check.attr.checked_sub(1) else { return false };
    let _ = schema;
    attrs.get(idx).is_some_and(|v| check.matches(v))
}

/// Applies a (pre-sorted) contiguous-by-attribute funcall list to a
/// record's current secondary attributes, filling in any attribute never
/// touched with its datatype's default -- every attribute in a schema has
/// a stored value once a record exists.
fn apply_funcalls(schema: &Schema, current: Option<&[Value]>, funcalls: &[Funcall]) -> Vec<Value> {
    let secondary = &schema.attributes[1..];
    let mut attrs: Vec<Option<Value>> = match current {
        Some(existing) => existing.iter().cloned().map(Some).collect(),
        None => vec![None; secondary.len()],
    };
    attrs.resize(secondary.len(), None);
    for f in funcalls {
        let Some(idx) = f.attr.checked_sub(1) else { continue };
        if idx >= attrs.len() {
            continue;
        }
        attrs[idx] = f.apply(attrs[idx].as_ref());
    }
    attrs
        .into_iter()
        .zip(secondary.iter())
        .map(|(v, attr)| v.unwrap_or_else(|| attr.datatype.default_value()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::SingletonChain;
    use crate::storage::MemoryRegionStore;
    use hyperbase_types::{Attribute, DataType, Predicate};
    use hyperbase_wire::{RequestHeader, request_flags};

    fn schema() -> Schema {
        Schema::new(
            vec![Attribute::new("k", DataType::String), Attribute::new("v", DataType::Int64)],
            false,
        )
        .unwrap()
    }

    fn req_header(mt: MessageType, flags: u8) -> RequestHeader {
        RequestHeader { message_type: mt, flags, configuration_version: 1, dest_virtual_server: 1, nonce: 1 }
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut handler = RequestHandler::new(schema(), MemoryRegionStore::new(), SingletonChain);
        let put_body = encode_body(&hyperbase_wire::KeyedRequestBody {
            key: Value::String(b"hello".to_vec()),
            checks: vec![],
            funcalls: vec![Funcall::set(1, Value::Int64(7))],
            wallet: None,
        })
        .unwrap();
        let (_, payload) = handler.handle(&req_header(MessageType::Put, request_flags::WRITE), &put_body, 0).unwrap();
        let reply: StatusReplyBody = decode_body(&payload).unwrap();
        assert_eq!(reply.code, ResultCode::Success);

        let get_body = encode_body(&hyperbase_wire::KeyedRequestBody {
            key: Value::String(b"hello".to_vec()),
            checks: vec![],
            funcalls: vec![],
            wallet: None,
        })
        .unwrap();
        let (_, payload) = handler.handle(&req_header(MessageType::Get, 0), &get_body, 0).unwrap();
        let reply: GetReplyBody = decode_body(&payload).unwrap();
        assert_eq!(reply.code, ResultCode::Success);
        assert_eq!(reply.attrs, vec![Value::Int64(7)]);
    }

    #[test]
    fn fail_if_found_rejects_an_existing_key() {
        let mut handler = RequestHandler::new(schema(), MemoryRegionStore::new(), SingletonChain);
        let body = encode_body(&hyperbase_wire::KeyedRequestBody {
            key: Value::String(b"k".to_vec()),
            checks: vec![],
            funcalls: vec![Funcall::set(1, Value::Int64(1))],
            wallet: None,
        })
        .unwrap();
        let flags = request_flags::WRITE | request_flags::FAIL_IF_FOUND;
        let (_, first) = handler.handle(&req_header(MessageType::Put, flags), &body, 0).unwrap();
        assert_eq!(decode_body::<StatusReplyBody>(&first).unwrap().code, ResultCode::Success);
        let (_, second) = handler.handle(&req_header(MessageType::Put, flags), &body, 0).unwrap();
        assert_eq!(decode_body::<StatusReplyBody>(&second).unwrap().code, ResultCode::CmpFail);
    }

    #[test]
    fn conditional_put_fails_when_check_does_not_match() {
        let mut handler = RequestHandler::new(schema(), MemoryRegionStore::new(), SingletonChain);
        let create = encode_body(&hyperbase_wire::KeyedRequestBody {
            key: Value::String(b"k".to_vec()),
            checks: vec![],
            funcalls: vec![Funcall::set(1, Value::Int64(1))],
            wallet: None,
        })
        .unwrap();
        handler.handle(&req_header(MessageType::Put, request_flags::WRITE), &create, 0).unwrap();

        let cond = encode_body(&hyperbase_wire::KeyedRequestBody {
            key: Value::String(b"k".to_vec()),
            checks: vec![hyperbase_types::AttributeCheck::new(1, Value::Int64(99), Predicate::Equals)],
            funcalls: vec![Funcall::set(1, Value::Int64(2))],
            wallet: None,
        })
        .unwrap();
        let (_, payload) =
            handler.handle(&req_header(MessageType::CondPut, request_flags::WRITE), &cond, 0).unwrap();
        assert_eq!(decode_body::<StatusReplyBody>(&payload).unwrap().code, ResultCode::CmpFail);
    }

    #[test]
    fn get_on_missing_key_is_not_found() {
        let mut handler = RequestHandler::new(schema(), MemoryRegionStore::new(), SingletonChain);
        let body = encode_body(&hyperbase_wire::KeyedRequestBody {
            key: Value::String(b"ghost".to_vec()),
            checks: vec![],
            funcalls: vec![],
            wallet: None,
        })
        .unwrap();
        let (_, payload) = handler.handle(&req_header(MessageType::Get, 0), &body, 0).unwrap();
        assert_eq!(decode_body::<GetReplyBody>(&payload).unwrap().code, ResultCode::NotFound);
    }
}
