//! # hyperbase-agent-protocol: the per-daemon coordinator link (§4.4)
//!
//! Every storage daemon runs one [`link::CoordinatorLink`]: a long-lived
//! follow on the coordinator's `config` condition variable, a second
//! follow on `checkpoint`, a cache of the most recently installed
//! [`hyperbase_types::Configuration`], and an idempotent outbound
//! notification queue (`config_ack`, `config_stable`,
//! `checkpoint_report_stable`, `transfer_go_live`, `transfer_complete`,
//! `report_tcp_disconnect`, and a defended `server_online` retransmit).
//!
//! The link itself never opens a socket -- `Follow` and `CoordinatorRpc`
//! are the transport boundary, mirroring how `hyperbase-client::Transport`
//! keeps the client pipeline runtime-agnostic. A concrete daemon binary
//! supplies implementations backed by whatever RPC the replicated-log
//! service exposes and drives `CoordinatorLink::maintain` from its own
//! dedicated thread, sleeping for the returned backoff between calls.

pub mod backoff;
pub mod error;
pub mod follow;
pub mod link;
pub mod rpc;

pub use backoff::Backoff;
pub use error::LinkError;
pub use follow::{CheckpointFollow, CheckpointMirror, ConfigFollow, Follow, LoopbackFollow};
pub use link::{CoordinatorLink, MaintainOutcome};
pub use rpc::{CoordinatorRpc, Notification, NotifyQueue};
