//! The pending-op table (§4.2, §9): every outstanding request is tracked by
//! its client-visible id (the request nonce) until every server it targeted
//! has replied or the op is abandoned on reconfiguration.
//!
//! Each variant here is a plain value behind one `HashMap<u64, PendingOp>`
//! entry -- there is no cyclic ownership to break on completion, only a
//! map removal.

use std::collections::HashSet;

use hyperbase_types::{ResultCode, ServerId, Value};
use hyperbase_wire::SearchItemFrame;

use crate::error::ClientError;

/// What a completed op hands back to the caller that issued it.
#[derive(Debug, Clone)]
pub enum Completion {
    Status(ResultCode),
    Get { code: ResultCode, attrs: Vec<Value> },
    SearchItem { key: Value, attrs: Vec<Value> },
    SearchDone,
    Count { code: ResultCode, count: u64 },
    Sum { code: ResultCode, sum: Option<Value> },
    SortedSearch { code: ResultCode, items: Vec<SearchItemFrame> },
    Describe { description: String },
}

/// A single-reply keyed op: `GET`/`PUT`/`COND_PUT`/`DEL`/`COND_DEL`/`ATOMIC`.
#[derive(Debug, Clone, Copy)]
pub struct KeyedOp {
    pub target: ServerId,
}

/// A streaming search: one `SEARCH_ITEM`/`SEARCH_DONE` stream per target
/// server, fanned in until every target has reported done (§4.2 step 7).
#[derive(Debug, Clone)]
pub struct SearchOp {
    pub outstanding: HashSet<ServerId>,
    pub failure: Option<ResultCode>,
}

impl SearchOp {
    #[must_use]
    pub fn new(targets: impl IntoIterator<Item = ServerId>) -> Self {
        Self { outstanding: targets.into_iter().collect(), failure: None }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.outstanding.is_empty()
    }
}

/// A fan-out op with one reply expected per target and a code that should be
/// reported as soon as any target fails (`GROUP_DEL`/`GROUP_ATOMIC`).
#[derive(Debug, Clone)]
pub struct GroupOp {
    pub outstanding: HashSet<ServerId>,
    pub code: ResultCode,
}

impl GroupOp {
    #[must_use]
    pub fn new(targets: impl IntoIterator<Item = ServerId>) -> Self {
        Self { outstanding: targets.into_iter().collect(), code: ResultCode::Success }
    }

    /// Records one target's reply. Keeps the first non-success code seen.
    pub fn record(&mut self, from: ServerId, code: ResultCode) {
        self.outstanding.remove(&from);
        if self.code == ResultCode::Success {
            self.code = code;
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.outstanding.is_empty()
    }
}

/// `COUNT`: sums the per-target counts; the first non-success code wins.
#[derive(Debug, Clone)]
pub struct CountOp {
    pub outstanding: HashSet<ServerId>,
    pub code: ResultCode,
    pub total: u64,
}

impl CountOp {
    #[must_use]
    pub fn new(targets: impl IntoIterator<Item = ServerId>) -> Self {
        Self { outstanding: targets.into_iter().collect(), code: ResultCode::Success, total: 0 }
    }

    pub fn record(&mut self, from: ServerId, code: ResultCode, count: u64) {
        self.outstanding.remove(&from);
        if self.code == ResultCode::Success {
            self.code = code;
        }
        self.total += count;
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.outstanding.is_empty()
    }
}

/// `SUM`: combines per-target partial sums with `crate::aggregation::combine_sums`.
#[derive(Debug, Clone)]
pub struct SumOp {
    pub outstanding: HashSet<ServerId>,
    pub code: ResultCode,
    pub sum: Option<Value>,
}

impl SumOp {
    #[must_use]
    pub fn new(targets: impl IntoIterator<Item = ServerId>) -> Self {
        Self { outstanding: targets.into_iter().collect(), code: ResultCode::Success, sum: None }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.outstanding.is_empty()
    }
}

/// `SORTED_SEARCH`: each target already returns its own top-`limit` slice;
/// the client merges them and re-truncates (§4.2 step 7 "fixed-size heap").
#[derive(Debug, Clone)]
pub struct SortedSearchOp {
    pub outstanding: HashSet<ServerId>,
    pub code: ResultCode,
    pub limit: u64,
    pub sort_attr: usize,
    pub maximize: bool,
    pub items: Vec<SearchItemFrame>,
}

impl SortedSearchOp {
    #[must_use]
    pub fn new(targets: impl IntoIterator<Item = ServerId>, limit: u64, sort_attr: usize, maximize: bool) -> Self {
        Self {
            outstanding: targets.into_iter().collect(),
            code: ResultCode::Success,
            limit,
            sort_attr,
            maximize,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.outstanding.is_empty()
    }
}

/// `SEARCH_DESCRIBE`: a single-target request/reply, not a fan-out.
#[derive(Debug, Clone, Copy)]
pub struct DescribeOp {
    pub target: ServerId,
}

/// The tagged union of every op shape a client id can be waiting on.
#[derive(Debug, Clone)]
pub enum PendingOp {
    Keyed(KeyedOp),
    Search(SearchOp),
    SortedSearch(SortedSearchOp),
    Count(CountOp),
    Sum(SumOp),
    GroupDel(GroupOp),
    GroupAtomic(GroupOp),
    Describe(DescribeOp),
}

impl PendingOp {
    /// The kind name used in tracing spans and error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Keyed(_) => "keyed",
            Self::Search(_) => "search",
            Self::SortedSearch(_) => "sorted_search",
            Self::Count(_) => "count",
            Self::Sum(_) => "sum",
            Self::GroupDel(_) => "group_del",
            Self::GroupAtomic(_) => "group_atomic",
            Self::Describe(_) => "search_describe",
        }
    }
}

/// Bridges a [`PendingOp`] status to the client-visible terminal error.
/// Any non-success status on a single-reply op terminates it immediately
/// (§7 "the first non-success terminates the op").
#[must_use]
#[track_caller]
pub fn status_error(code: ResultCode) -> Option<ClientError> {
    (code != ResultCode::Success).then(|| ClientError::new(code))
}
