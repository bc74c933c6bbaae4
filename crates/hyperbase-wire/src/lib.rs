//! # hyperbase-wire: binary wire protocol (§6)
//!
//! Fixed-width request/response headers, postcard-serialized bodies, the
//! container byte layout, and configuration-blob encoding. This crate owns
//! everything "below the HyperDex message header" that the distillation
//! still specifies semantics for; byte-for-byte compatibility with any
//! existing wire format is explicitly out of scope (§1 Non-goals) — only
//! the field order, widths and semantics in §6 are guaranteed.

pub mod body;
pub mod config;
pub mod container;
pub mod error;
pub mod header;
pub mod message;

pub use body::{
    CountReplyBody, CountRequestBody, GetReplyBody, GroupAtomicRequestBody, GroupDelRequestBody,
    KeyedRequestBody, SearchDescribeReplyBody, SearchDescribeRequestBody, SearchDoneFrame, SearchItemFrame,
    SearchNextFrame, SearchRequestBody, SortedSearchReplyBody, SortedSearchRequestBody, StatusReplyBody,
    SumReplyBody, SumRequestBody, decode_body, encode_body,
};
pub use config::{decode_configuration, encode_configuration};
pub use container::{decode_container, encode_container};
pub use error::WireError;
pub use header::{REQUEST_HEADER_LEN, RESPONSE_HEADER_LEN, RequestHeader, ResponseHeader, request_flags};
pub use message::MessageType;
