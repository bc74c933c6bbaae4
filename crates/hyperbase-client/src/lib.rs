//! # hyperbase-client: the client request pipeline (§4.2)
//!
//! Request preparation ([`dispatch`]) turns name-addressed reads/writes into
//! schema-position-addressed wire bodies; dispatch locates the key's point
//! leader (keyed ops) or the smallest matching subspace's tail replicas
//! (search/aggregation), via `hyperbase-directory`; [`pending`] tracks every
//! in-flight op by client-visible id; [`aggregation`] combines per-leg
//! replies; [`client::Client::loop_once`] is the single suspension point
//! (§5: "client: single-threaded cooperative").
//!
//! This crate never awaits: [`transport::Transport`] is a synchronous,
//! non-blocking-by-contract boundary, so the pipeline stays usable without
//! any async runtime. The optional `tokio` feature only adds one concrete
//! transport implementation over it.

pub mod aggregation;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod pending;
pub mod transport;

pub use client::{Client, LoopOutcome};
pub use dispatch::{RawAttr, RawCheck, RawMapAttr};
pub use error::{ClientError, TransportError};
pub use pending::Completion;
pub use transport::{InboundFrame, LoopbackTransport, Transport};
