//! # Hyperbase
//!
//! A hyperspace-hashing distributed, searchable key-value store: a
//! replicated coordinator state machine, a hyperspace geometry that maps
//! keys and attribute predicates to regions, a client request pipeline
//! aware of the current configuration, and a per-region daemon exposing
//! that data plane over TCP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             hyperbase                             │
//! │  ┌─────────────┐   ┌───────────────┐   ┌───────────┐  ┌────────┐ │
//! │  │ Coordinator │ → │ hyperbase-    │ → │  Daemon   │→ │ Client │ │
//! │  │ (kernel FSM)│   │ directory     │   │ (server + │  │(pipe-  │ │
//! │  │             │   │ (geometry)    │   │agent-proto│  │ line)  │ │
//! │  └─────────────┘   └───────────────┘   └───────────┘  └────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate is glue: the coordinator state machine, the hyperspace
//! geometry, the wire protocol and the client pipeline are each a
//! complete, independently-testable crate in the workspace
//! (`hyperbase-kernel`, `hyperbase-directory`, `hyperbase-wire`,
//! `hyperbase-client`). [`Coordinator`] and [`Daemon`] exist only to wire
//! them into the two process roles a deployment actually runs.
//!
//! # Quick start
//!
//! ```ignore
//! use hyperbase::Coordinator;
//! use hyperbase_kernel::runtime::ReplicatedLog;
//!
//! let mut coordinator = Coordinator::new(my_replicated_log);
//! coordinator.init_cluster(42)?;
//! coordinator.register_server(ServerId::new(1), "10.0.0.1:2012")?;
//! ```

mod coordinator;
mod daemon;
mod error;

pub use coordinator::Coordinator;
pub use daemon::Daemon;
pub use error::{HyperbaseError, Result};

// Re-export the data model every layer shares.
pub use hyperbase_types::{
    AttributeCheck, Attribute, AuthWallet, Configuration, DataType, Funcall, FuncallName, Predicate, Region,
    RegionId, ResultCode, Schema, Server, ServerId, ServerState, Space, SpaceId, Value,
};

// Re-export the hyperspace geometry.
pub use hyperbase_directory::{coordinate_of, lookup_point_leader, plan_search};

// Re-export the coordinator's pure core.
pub use hyperbase_kernel::command::{Command, SpaceBuilder};
pub use hyperbase_kernel::kernel::{CommandOutcome, apply_command};
pub use hyperbase_kernel::runtime::ReplicatedLog;
pub use hyperbase_kernel::state::State;

// Re-export the wire types.
pub use hyperbase_wire::{MessageType, RequestHeader, ResponseHeader};

// Re-export the client pipeline.
pub use hyperbase_client::{Client, ClientError};

// Re-export the daemon shell's trait boundaries.
pub use hyperbase_server::{ChainLink, ChainOutcome, MemoryRegionStore, RegionStore, SingletonChain};

// Re-export the coordinator link.
pub use hyperbase_agent_protocol::{CoordinatorLink, MaintainOutcome};

// Re-export configuration loading.
pub use hyperbase_config::{ConfigLoader, HyperbaseConfig};
