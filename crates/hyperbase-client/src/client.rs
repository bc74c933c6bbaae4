//! The `Client` struct: the single-threaded, cooperative request pipeline
//! (§4.2, §5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hyperbase_types::{
    AttributeCheck, AuthWallet, Configuration, DataType, Funcall, ResultCode, ServerId, Space, Value,
};
use hyperbase_wire::header::{RequestHeader, ResponseHeader, request_flags};
use hyperbase_wire::message::MessageType;
use hyperbase_wire::{
    CountReplyBody, CountRequestBody, GetReplyBody, GroupAtomicRequestBody, GroupDelRequestBody, KeyedRequestBody,
    SearchDescribeReplyBody, SearchDescribeRequestBody, SearchItemFrame, SearchRequestBody, SortedSearchReplyBody,
    SortedSearchRequestBody, StatusReplyBody, decode_body, encode_body,
};

use crate::aggregation::{combine_sums, merge_sorted_search};
use crate::dispatch::{self, RawAttr, RawCheck, RawMapAttr};
use crate::error::{ClientError, TransportError};
use crate::pending::{Completion, CountOp, DescribeOp, GroupOp, KeyedOp, PendingOp, SearchOp, SortedSearchOp, SumOp};
use crate::transport::Transport;

/// What one `loop_once` call hands back.
#[derive(Debug)]
pub enum LoopOutcome {
    /// `client_id` is yieldable; `completion` is its result for this step
    /// (a search op may yield multiple times, once per item, before
    /// finally yielding `SearchDone`).
    Yielded { client_id: u64, completion: Completion },
    /// No op became yieldable within the timeout budget (§4.2
    /// "Cancellation... `loop(timeout_ms)` returns `TIMEOUT`").
    Timeout,
    /// The transport itself failed; pending ops are left untouched.
    Transport(TransportError),
}

/// The client request pipeline: owns the cached configuration, the
/// pending-op table, and a transport. Not `Send`+`Sync` by design — §5
/// requires one client per thread.
pub struct Client<T: Transport> {
    config: Arc<Configuration>,
    pending: HashMap<u64, PendingOp>,
    failure_queue: Vec<u64>,
    next_id: u64,
    transport: T,
}

impl<T: Transport> Client<T> {
    #[must_use]
    pub fn new(config: Configuration, transport: T) -> Self {
        let mut client = Self { config: Arc::new(config), pending: HashMap::new(), failure_queue: Vec::new(), next_id: 1, transport };
        client.register_endpoints();
        client
    }

    fn register_endpoints(&mut self) {
        for server in &self.config.servers {
            self.transport.set_endpoint(server.id, server.bind_to.clone());
        }
    }

    /// Installs a newer configuration, failing any pending op whose
    /// virtual-server routing no longer matches the fresh topology (§4.2
    /// "Configuration acquisition").
    #[tracing::instrument(skip_all, fields(version = config.version))]
    pub fn install_configuration(&mut self, config: Configuration) {
        self.config = Arc::new(config);
        self.register_endpoints();
        let stale: Vec<u64> = self
            .pending
            .iter()
            .filter_map(|(&id, op)| if let PendingOp::Keyed(k) = op { self.is_stale(k).then_some(id) } else { None })
            .collect();
        self.failure_queue.extend(stale);
    }

    fn is_stale(&self, op: &KeyedOp) -> bool {
        self.config.server(op.target).is_none()
    }

    fn next_client_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn space(&self, space_name: &str) -> Result<&Space, ClientError> {
        self.config.space_by_name(space_name).ok_or_else(|| ClientError::new(ResultCode::UnknownSpace))
    }

    /// `GET`: dispatched to the key's point leader (§4.2 "Keyed op").
    #[tracing::instrument(skip_all, fields(space = space_name))]
    pub fn get(&mut self, space_name: &str, key: Value, wallet: Option<AuthWallet>) -> Result<u64, ClientError> {
        let space = self.space(space_name)?;
        dispatch::validate_key(&space.schema, &key)?;
        self.dispatch_keyed(space_name, key, Vec::new(), Vec::new(), wallet, MessageType::Get, 0)
    }

    /// `PUT`: writes `attrs` (attribute name -> value) to `key`'s record.
    #[tracing::instrument(skip_all, fields(space = space_name))]
    pub fn put(
        &mut self,
        space_name: &str,
        key: Value,
        attrs: Vec<(String, Value)>,
        wallet: Option<AuthWallet>,
    ) -> Result<u64, ClientError> {
        let space = self.space(space_name)?;
        dispatch::validate_key(&space.schema, &key)?;
        let raw = attrs.into_iter().map(|(attr_name, value)| RawAttr { attr_name, value }).collect();
        let funcalls = dispatch::prepare_attrs(&space.schema, raw)?;
        self.dispatch_keyed(space_name, key, Vec::new(), funcalls, wallet, MessageType::Put, request_flags::WRITE)
    }

    /// `COND_PUT`: `PUT` guarded by `checks` (attribute name -> predicate).
    #[tracing::instrument(skip_all, fields(space = space_name))]
    pub fn cond_put(
        &mut self,
        space_name: &str,
        key: Value,
        checks: Vec<RawCheck>,
        attrs: Vec<(String, Value)>,
        wallet: Option<AuthWallet>,
    ) -> Result<u64, ClientError> {
        let space = self.space(space_name)?;
        dispatch::validate_key(&space.schema, &key)?;
        let checks = dispatch::prepare_checks(&space.schema, checks)?;
        let raw = attrs.into_iter().map(|(attr_name, value)| RawAttr { attr_name, value }).collect();
        let funcalls = dispatch::prepare_attrs(&space.schema, raw)?;
        self.dispatch_keyed(space_name, key, checks, funcalls, wallet, MessageType::CondPut, request_flags::WRITE)
    }

    /// `DEL`.
    #[tracing::instrument(skip_all, fields(space = space_name))]
    pub fn del(&mut self, space_name: &str, key: Value, wallet: Option<AuthWallet>) -> Result<u64, ClientError> {
        let space = self.space(space_name)?;
        dispatch::validate_key(&space.schema, &key)?;
        self.dispatch_keyed(space_name, key, Vec::new(), Vec::new(), wallet, MessageType::Del, request_flags::WRITE)
    }

    /// `ATOMIC`: an arbitrary funcall batch against one key's record.
    #[tracing::instrument(skip_all, fields(space = space_name))]
    pub fn atomic(
        &mut self,
        space_name: &str,
        key: Value,
        checks: Vec<RawCheck>,
        attrs: Vec<(String, Value)>,
        map_attrs: Vec<RawMapAttr>,
        wallet: Option<AuthWallet>,
    ) -> Result<u64, ClientError> {
        let space = self.space(space_name)?;
        dispatch::validate_key(&space.schema, &key)?;
        let checks = dispatch::prepare_checks(&space.schema, checks)?;
        let raw = attrs.into_iter().map(|(attr_name, value)| RawAttr { attr_name, value }).collect();
        let mut funcalls = dispatch::prepare_attrs(&space.schema, raw)?;
        funcalls.extend(dispatch::prepare_map_attrs(&space.schema, map_attrs)?);
        dispatch::sort_funcalls_stable(&mut funcalls);
        self.dispatch_keyed(space_name, key, checks, funcalls, wallet, MessageType::Atomic, request_flags::WRITE)
    }

    fn dispatch_keyed(
        &mut self,
        space_name: &str,
        key: Value,
        checks: Vec<AttributeCheck>,
        funcalls: Vec<Funcall>,
        wallet: Option<AuthWallet>,
        message_type: MessageType,
        extra_flags: u8,
    ) -> Result<u64, ClientError> {
        let space = self.space(space_name)?;
        let leader = hyperbase_directory::lookup_point_leader(space, &key).ok_or_else(|| ClientError::new(ResultCode::Offline))?;
        let client_id = self.next_client_id();
        let mut flags = extra_flags;
        if wallet.is_some() {
            flags |= request_flags::AUTH_WALLET_PRESENT;
        }
        let header = RequestHeader {
            message_type,
            flags,
            configuration_version: self.config.version,
            dest_virtual_server: leader.virt.get(),
            nonce: client_id,
        };
        let body = KeyedRequestBody { key, checks, funcalls, wallet };
        self.send_request(leader.server, &header, &body)?;
        self.pending.insert(client_id, PendingOp::Keyed(KeyedOp { target: leader.server }));
        Ok(client_id)
    }

    /// `SEARCH`: fans out to the smallest matching subspace's tail replicas
    /// (§4.2 "Search / aggregation").
    #[tracing::instrument(skip_all, fields(space = space_name))]
    pub fn search(&mut self, space_name: &str, checks: Vec<RawCheck>) -> Result<u64, ClientError> {
        let (client_id, targets, _) = self.dispatch_search_targets(space_name, checks)?;
        for target in &targets {
            let header = self.control_header(MessageType::SearchStart, client_id, target.virt.get());
            let body = SearchRequestBody { client_id, checks: Vec::new() };
            self.send_request(target.server, &header, &body)?;
        }
        self.pending.insert(client_id, PendingOp::Search(SearchOp::new(targets.iter().map(|t| t.server))));
        Ok(client_id)
    }

    /// `COUNT`.
    #[tracing::instrument(skip_all, fields(space = space_name))]
    pub fn count(&mut self, space_name: &str, checks: Vec<RawCheck>) -> Result<u64, ClientError> {
        let (client_id, targets, resolved) = self.dispatch_search_targets(space_name, checks)?;
        for target in &targets {
            let header = self.control_header(MessageType::Count, client_id, target.virt.get());
            let body = CountRequestBody { checks: resolved.clone() };
            self.send_request(target.server, &header, &body)?;
        }
        self.pending.insert(client_id, PendingOp::Count(CountOp::new(targets.iter().map(|t| t.server))));
        Ok(client_id)
    }

    /// `SUM` over `attr_name` (which must be numeric).
    #[tracing::instrument(skip_all, fields(space = space_name))]
    pub fn sum(&mut self, space_name: &str, checks: Vec<RawCheck>, attr_name: &str) -> Result<u64, ClientError> {
        let attr = {
            let space = self.space(space_name)?;
            let pos = dispatch::resolve_attr(&space.schema, attr_name)?;
            if !matches!(space.schema.attributes[pos].datatype, DataType::Int64 | DataType::Float) {
                return Err(ClientError::new(ResultCode::WrongType));
            }
            pos
        };
        let (client_id, targets, resolved) = self.dispatch_search_targets(space_name, checks)?;
        for target in &targets {
            let header = self.control_header(MessageType::Sum, client_id, target.virt.get());
            let body = hyperbase_wire::SumRequestBody { checks: resolved.clone(), attr };
            self.send_request(target.server, &header, &body)?;
        }
        self.pending.insert(client_id, PendingOp::Sum(SumOp::new(targets.iter().map(|t| t.server))));
        Ok(client_id)
    }

    /// `SORTED_SEARCH`: top-`limit` items ordered by `sort_attr_name`.
    #[tracing::instrument(skip_all, fields(space = space_name))]
    pub fn sorted_search(
        &mut self,
        space_name: &str,
        checks: Vec<RawCheck>,
        sort_attr_name: &str,
        limit: u64,
        maximize: bool,
    ) -> Result<u64, ClientError> {
        let sort_attr = {
            let space = self.space(space_name)?;
            dispatch::resolve_attr(&space.schema, sort_attr_name)?
        };
        let (client_id, targets, resolved) = self.dispatch_search_targets(space_name, checks)?;
        for target in &targets {
            let header = self.control_header(MessageType::SortedSearch, client_id, target.virt.get());
            let body = SortedSearchRequestBody { checks: resolved.clone(), limit, sort_attr, maximize };
            self.send_request(target.server, &header, &body)?;
        }
        self.pending.insert(
            client_id,
            PendingOp::SortedSearch(SortedSearchOp::new(targets.iter().map(|t| t.server), limit, sort_attr, maximize)),
        );
        Ok(client_id)
    }

    /// `GROUP_DEL`: deletes every record matching `checks`.
    #[tracing::instrument(skip_all, fields(space = space_name))]
    pub fn group_del(&mut self, space_name: &str, checks: Vec<RawCheck>) -> Result<u64, ClientError> {
        let (client_id, targets, resolved) = self.dispatch_search_targets(space_name, checks)?;
        for target in &targets {
            let header = self.control_header(MessageType::GroupDel, client_id, target.virt.get());
            let body = GroupDelRequestBody { checks: resolved.clone() };
            self.send_request(target.server, &header, &body)?;
        }
        self.pending.insert(client_id, PendingOp::GroupDel(GroupOp::new(targets.iter().map(|t| t.server))));
        Ok(client_id)
    }

    /// `GROUP_ATOMIC`: applies `funcalls` to every record matching `checks`.
    #[tracing::instrument(skip_all, fields(space = space_name))]
    pub fn group_atomic(
        &mut self,
        space_name: &str,
        checks: Vec<RawCheck>,
        attrs: Vec<(String, Value)>,
    ) -> Result<u64, ClientError> {
        let space_schema = self.space(space_name)?.schema.clone();
        let raw = attrs.into_iter().map(|(attr_name, value)| RawAttr { attr_name, value }).collect();
        let funcalls = dispatch::prepare_attrs(&space_schema, raw)?;
        let (client_id, targets, resolved) = self.dispatch_search_targets(space_name, checks)?;
        for target in &targets {
            let header = self.control_header(MessageType::GroupAtomic, client_id, target.virt.get());
            let body = GroupAtomicRequestBody { checks: resolved.clone(), flags: 0, funcalls: funcalls.clone() };
            self.send_request(target.server, &header, &body)?;
        }
        self.pending.insert(client_id, PendingOp::GroupAtomic(GroupOp::new(targets.iter().map(|t| t.server))));
        Ok(client_id)
    }

    /// `SEARCH_DESCRIBE`: a single-target textual search plan explanation.
    #[tracing::instrument(skip_all, fields(space = space_name))]
    pub fn search_describe(&mut self, space_name: &str, checks: Vec<RawCheck>) -> Result<u64, ClientError> {
        let (client_id, targets, resolved) = self.dispatch_search_targets(space_name, checks)?;
        let target = targets.first().copied().ok_or_else(|| ClientError::new(ResultCode::Offline))?;
        let header = self.control_header(MessageType::SearchDescribe, client_id, target.virt.get());
        let body = SearchDescribeRequestBody { checks: resolved };
        self.send_request(target.server, &header, &body)?;
        self.pending.insert(client_id, PendingOp::Describe(DescribeOp { target: target.server }));
        Ok(client_id)
    }

    /// Resolves `checks` against `space_name`'s schema, plans the search
    /// (§4.3), and mints the client-visible id the caller will insert its
    /// pending op under.
    fn dispatch_search_targets(
        &mut self,
        space_name: &str,
        checks: Vec<RawCheck>,
    ) -> Result<(u64, Vec<hyperbase_types::Replica>, Vec<AttributeCheck>), ClientError> {
        let space = self.config.space_by_name(space_name).ok_or_else(|| ClientError::new(ResultCode::UnknownSpace))?;
        let resolved = dispatch::prepare_checks(&space.schema, checks)?;
        let plans = hyperbase_directory::plan_search(space, &resolved);
        let targets = hyperbase_directory::smallest_plan(&plans).map(|p| p.targets.clone()).unwrap_or_default();
        Ok((self.next_client_id(), targets, resolved))
    }

    fn control_header(&self, message_type: MessageType, nonce: u64, dest_virtual_server: u64) -> RequestHeader {
        RequestHeader { message_type, flags: 0, configuration_version: self.config.version, dest_virtual_server, nonce }
    }

    fn send_request<B: serde::Serialize>(
        &mut self,
        target: ServerId,
        header: &RequestHeader,
        body: &B,
    ) -> Result<(), ClientError> {
        let mut frame = header.encode().to_vec();
        frame.extend(encode_body(body).map_err(|_| ClientError::new(ResultCode::Malformed))?);
        self.transport.send(target, &frame).map_err(|_| ClientError::new(ResultCode::CoordFail))
    }

    /// The sole suspension point (§4.2 "Yield contract", §5). Drains the
    /// transport, feeds replies to their owning pending op, and returns as
    /// soon as one op becomes yieldable, or `TIMEOUT` after `timeout`
    /// elapses with nothing to report.
    #[tracing::instrument(skip_all)]
    pub fn loop_once(&mut self, timeout: Duration) -> LoopOutcome {
        if let Some(client_id) = self.failure_queue.pop() {
            self.pending.remove(&client_id);
            return LoopOutcome::Yielded {
                client_id,
                completion: Completion::Status(ResultCode::Reconfigure),
            };
        }
        let frames = match self.transport.poll(timeout) {
            Ok(frames) => frames,
            Err(e) => return LoopOutcome::Transport(e),
        };
        for frame in frames {
            if let Some(outcome) = self.handle_frame(frame) {
                return outcome;
            }
        }
        LoopOutcome::Timeout
    }

    /// Drains every currently pending op, calling `on_yield` once per
    /// yielded completion, until `NONEPENDING` (§7 "returned only when the
    /// client has truly no outstanding work"). A thin convenience wrapper
    /// over repeated [`Client::loop_once`] calls -- it adds no semantics
    /// beyond what the cooperative loop already specifies.
    pub fn loop_all(&mut self, timeout: Duration, mut on_yield: impl FnMut(u64, Completion)) {
        loop {
            if self.pending.is_empty() && self.failure_queue.is_empty() {
                return;
            }
            match self.loop_once(timeout) {
                LoopOutcome::Yielded { client_id, completion } => on_yield(client_id, completion),
                LoopOutcome::Timeout | LoopOutcome::Transport(_) => return,
            }
        }
    }

    fn handle_frame(&mut self, frame: crate::transport::InboundFrame) -> Option<LoopOutcome> {
        let header = ResponseHeader::decode(&frame.bytes).ok()?;
        let payload = &frame.bytes[hyperbase_wire::header::RESPONSE_HEADER_LEN..];
        let client_id = header.nonce;

        if header.message_type == MessageType::ConfigMismatch {
            self.pending.remove(&client_id);
            return Some(LoopOutcome::Yielded { client_id, completion: Completion::Status(ResultCode::Reconfigure) });
        }

        let op = self.pending.get_mut(&client_id)?;
        match apply_reply(op, frame.from, header.message_type, payload) {
            ReplyOutcome::Yield { remove, completion } => {
                if remove {
                    self.pending.remove(&client_id);
                }
                Some(LoopOutcome::Yielded { client_id, completion })
            }
            ReplyOutcome::NotYetYieldable => None,
            ReplyOutcome::Malformed => {
                self.pending.remove(&client_id);
                Some(LoopOutcome::Yielded { client_id, completion: Completion::Status(ResultCode::ServerError) })
            }
        }
    }
}

enum ReplyOutcome {
    Yield { remove: bool, completion: Completion },
    /// A fan-out leg reported in, but the op as a whole has nothing new to
    /// surface yet (§4.2 "returns as soon as one op becomes yieldable").
    NotYetYieldable,
    /// The reply's message type didn't match the pending op's shape (§4.2
    /// "Reply parsing... otherwise the op fails with `SERVERERROR`").
    Malformed,
}

fn yielded(completion: Completion) -> ReplyOutcome {
    ReplyOutcome::Yield { remove: true, completion }
}

/// Applies one decoded reply to its pending op.
fn apply_reply(op: &mut PendingOp, from: ServerId, message_type: MessageType, payload: &[u8]) -> ReplyOutcome {
    match (op, message_type) {
        (PendingOp::Keyed(keyed), MessageType::GetReply) => {
            if keyed.target != from {
                return ReplyOutcome::Malformed;
            }
            let Ok(body) = decode_body::<GetReplyBody>(payload) else { return ReplyOutcome::Malformed };
            yielded(Completion::Get { code: body.code, attrs: body.attrs })
        }
        (
            PendingOp::Keyed(keyed),
            MessageType::PutReply
            | MessageType::CondPutReply
            | MessageType::DelReply
            | MessageType::CondDelReply
            | MessageType::AtomicReply,
        ) => {
            if keyed.target != from {
                return ReplyOutcome::Malformed;
            }
            let Ok(body) = decode_body::<StatusReplyBody>(payload) else { return ReplyOutcome::Malformed };
            yielded(Completion::Status(body.code))
        }
        (PendingOp::Search(_), MessageType::SearchItem) => {
            let Ok(body) = decode_body::<SearchItemFrame>(payload) else { return ReplyOutcome::Malformed };
            ReplyOutcome::Yield {
                remove: false,
                completion: Completion::SearchItem { key: body.key, attrs: body.attrs },
            }
        }
        (PendingOp::Search(search), MessageType::SearchDone) => {
            search.outstanding.remove(&from);
            if search.is_done() {
                yielded(Completion::SearchDone)
            } else {
                ReplyOutcome::NotYetYieldable
            }
        }
        (PendingOp::Count(count), MessageType::CountReply) => {
            let Ok(body) = decode_body::<CountReplyBody>(payload) else { return ReplyOutcome::Malformed };
            count.record(from, body.code, body.count);
            if count.is_done() {
                yielded(Completion::Count { code: count.code, count: count.total })
            } else {
                ReplyOutcome::NotYetYieldable
            }
        }
        (PendingOp::Sum(sum), MessageType::SumReply) => {
            let Ok(body) = decode_body::<hyperbase_wire::SumReplyBody>(payload) else {
                return ReplyOutcome::Malformed;
            };
            sum.outstanding.remove(&from);
            if sum.code == ResultCode::Success {
                sum.code = body.code;
            }
            sum.sum = combine_sums(sum.sum.take(), body.sum);
            if sum.is_done() {
                yielded(Completion::Sum { code: sum.code, sum: sum.sum.clone() })
            } else {
                ReplyOutcome::NotYetYieldable
            }
        }
        (PendingOp::SortedSearch(sorted), MessageType::SortedSearchReply) => {
            let Ok(body) = decode_body::<SortedSearchReplyBody>(payload) else {
                return ReplyOutcome::Malformed;
            };
            sorted.outstanding.remove(&from);
            if sorted.code == ResultCode::Success {
                sorted.code = body.code;
            }
            sorted.items.extend(body.items);
            if sorted.is_done() {
                let merged = merge_sorted_search(
                    std::mem::take(&mut sorted.items),
                    sorted.limit,
                    sorted.sort_attr,
                    sorted.maximize,
                );
                yielded(Completion::SortedSearch { code: sorted.code, items: merged })
            } else {
                ReplyOutcome::NotYetYieldable
            }
        }
        (
            PendingOp::GroupDel(group) | PendingOp::GroupAtomic(group),
            MessageType::GroupDelReply | MessageType::GroupAtomicReply,
        ) => {
            let Ok(body) = decode_body::<StatusReplyBody>(payload) else { return ReplyOutcome::Malformed };
            group.record(from, body.code);
            if group.is_done() {
                yielded(Completion::Status(group.code))
            } else {
                ReplyOutcome::NotYetYieldable
            }
        }
        (PendingOp::Describe(describe), MessageType::SearchDescribeReply) => {
            if describe.target != from {
                return ReplyOutcome::Malformed;
            }
            let Ok(body) = decode_body::<SearchDescribeReplyBody>(payload) else {
                return ReplyOutcome::Malformed;
            };
            yielded(Completion::Describe { description: body.description })
        }
        _ => ReplyOutcome::Malformed,
    }
}
