//! # hyperbase-types: core data model
//!
//! Pure value types shared by every other crate in the workspace: the
//! identifier kinds, the closed datatype/value set, schemas, attribute
//! checks and funcalls, and the hyperspace placement model (space,
//! subspace, region, server, transfer, configuration).
//!
//! No IO, no clocks, no randomness beyond what a hash function needs. These
//! types only describe what the cluster looks like and what an operation
//! asks for; `hyperbase-directory` turns them into routing decisions and
//! `hyperbase-kernel` turns commands into new configurations.

pub mod check;
pub mod datatype;
pub mod funcall;
pub mod ids;
pub mod schema;
pub mod space;
pub mod wallet;

pub use check::{AttributeCheck, Predicate};
pub use datatype::{DataType, Value};
pub use funcall::{Funcall, FuncallName, sort_funcalls};
pub use ids::{IdCounter, IndexId, RegionId, ServerId, SpaceId, SubspaceId, TransferId, VirtualServerId};
pub use schema::{Attribute, Schema, SchemaError, is_valid_attribute_name};
pub use space::{
    ConfigFlags, Configuration, Region, RegionIntent, Replica, Server, ServerState, Space, SpaceError,
    Subspace, Transfer,
};
pub use wallet::AuthWallet;

/// Result codes shared across the coordinator, the client and the daemon
/// link (§6). Not every code is reachable from every component; each
/// component's own error enum maps a subset of these onto its own failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ResultCode {
    Success,
    NotFound,
    SearchDone,
    CmpFail,
    ReadOnly,
    UnknownSpace,
    CoordFail,
    ServerError,
    PollFailed,
    Overflow,
    Reconfigure,
    Timeout,
    UnknownAttr,
    DupeAttr,
    NonePending,
    DontUseKey,
    WrongType,
    NoMem,
    BadConfig,
    Duplicate,
    Interrupted,
    ClusterJump,
    CoordLogged,
    Offline,
    Internal,
    Exception,
    Garbage,
    Malformed,
    NoCanDo,
    Uninitialized,
}
