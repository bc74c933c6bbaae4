//! Broadcast effects: everything the coordinator asks its shell to
//! publish after a command. The kernel never performs the broadcast itself
//! -- `apply_command` only ever returns these as data.

use serde::{Deserialize, Serialize};

/// Which of the five acknowledgment condition variables a barrier closed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckKind {
    Ack,
    Stable,
    Checkp,
    Checkps,
    Checkpgc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// A new configuration version is ready; wake every follower waiting on
    /// the `config` condition variable.
    BroadcastConfig { version: u64 },
    /// A new checkpoint number was struck; wake followers of `checkp`.
    BroadcastCheckpoint { checkpoint: u64 },
    /// A barrier closed on version `version` for `kind`; wake the matching
    /// condition variable exactly once per crossed version.
    BroadcastAck { kind: AckKind, version: u64 },
}
