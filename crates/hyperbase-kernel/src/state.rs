//! Coordinator state.
//!
//! Everything the state machine needs to answer the next command and to
//! re-derive the configuration blob handed to clients and daemons. The
//! counter, permutation and barriers exist only here -- they are internal
//! bookkeeping, never serialized into the public [`Configuration`] a client
//! sees.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hyperbase_types::{
    ConfigFlags, Configuration, IdCounter, RegionId, RegionIntent, Replica, Server, ServerId, ServerState, Space,
    Transfer,
};

use crate::barrier::Barrier;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct State {
    pub cluster: u64,
    pub version: u64,
    pub flags: ConfigFlags,
    pub counter: IdCounter,
    pub servers: Vec<Server>,
    pub spaces: Vec<Space>,
    pub transfers: Vec<Transfer>,
    /// The coordinator's declared wish for each region; convergence drives
    /// `region.replicas` toward `desired_replicas` over successive passes.
    pub intents: BTreeMap<RegionId, RegionIntent>,
    /// Regions whose chain emptied because their sole remaining server went
    /// `SHUTDOWN` -- remembered so the region can be restored if that server
    /// comes back `AVAILABLE`.
    pub offline: BTreeMap<RegionId, Replica>,
    /// A permutation of every `AVAILABLE` server id, reshuffled whenever the
    /// available set's size crosses a threshold rather than appended to, to
    /// keep the scatter-width distribution bounded (resolved Open Question).
    pub permutation: Vec<ServerId>,
    pub spares: Vec<ServerId>,
    pub spare_quota: usize,
    pub checkpoint: u64,
    pub stable_checkpoint: u64,
    pub gc_watermark: u64,
    pub ack_barrier: Barrier,
    pub stable_barrier: Barrier,
    pub checkp_barrier: Barrier,
    pub checkps_barrier: Barrier,
    pub checkpgc_barrier: Barrier,
}

impl State {
    #[must_use]
    pub fn new() -> Self {
        Self { spare_quota: 2, ..Self::default() }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cluster != 0
    }

    #[must_use]
    pub fn server(&self, id: ServerId) -> Option<&Server> {
        self.servers.iter().find(|s| s.id == id)
    }

    pub fn server_mut(&mut self, id: ServerId) -> Option<&mut Server> {
        self.servers.iter_mut().find(|s| s.id == id)
    }

    #[must_use]
    pub fn server_by_address(&self, bind_to: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.bind_to == bind_to)
    }

    #[must_use]
    pub fn space_index(&self, name: &str) -> Option<usize> {
        self.spaces.iter().position(|s| s.name == name)
    }

    #[must_use]
    pub fn available_servers(&self) -> Vec<ServerId> {
        self.servers.iter().filter(|s| s.is_available()).map(|s| s.id).collect()
    }

    /// Reshuffles `permutation` to exactly the current `AVAILABLE` set,
    /// deterministically ordered by id, whenever the set's size crosses a
    /// power-of-two threshold since the last reshuffle. Appending instead of
    /// reshuffling on every small change keeps chain assignments stable
    /// across unrelated server churn.
    pub fn repermute_if_needed(&mut self) {
        let available = self.available_servers();
        let old_len = self.permutation.len();
        let new_len = available.len();
        let crossed_threshold = old_len.next_power_of_two() != new_len.next_power_of_two();
        if crossed_threshold || self.permutation.iter().any(|id| !available.contains(id)) {
            let mut perm = available;
            perm.sort_unstable();
            self.permutation = perm;
        } else {
            for id in available {
                if !self.permutation.contains(&id) {
                    self.permutation.push(id);
                }
            }
        }
    }

    /// Opens a new configuration version: bumps `version`, arms every
    /// barrier over the current membership, and returns the version number
    /// the caller should broadcast.
    pub fn advance_configuration(&mut self) -> u64 {
        self.version += 1;
        let members: std::collections::BTreeSet<ServerId> = self.available_servers().into_iter().collect();
        self.ack_barrier.open(self.version, members.clone());
        self.stable_barrier.open(self.version, members);
        self.version
    }

    /// Rebuilds the wire-level configuration blob from scratch on every call
    /// -- there is no incremental cache to invalidate.
    #[must_use]
    pub fn to_configuration(&self) -> Configuration {
        Configuration {
            cluster: self.cluster,
            version: self.version,
            flags: self.flags,
            servers: self.servers.clone(),
            spaces: self.spaces.clone(),
            transfers: self.transfers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_not_initialized() {
        assert!(!State::new().is_initialized());
    }

    #[test]
    fn advance_configuration_is_monotonic() {
        let mut s = State::new();
        s.servers.push(Server { id: ServerId::new(1), bind_to: "a:1".into(), state: ServerState::Available });
        let v1 = s.advance_configuration();
        let v2 = s.advance_configuration();
        assert!(v2 > v1);
    }

    #[test]
    fn to_configuration_reflects_servers() {
        let mut s = State::new();
        s.servers.push(Server { id: ServerId::new(1), bind_to: "a:1".into(), state: ServerState::Available });
        let cfg = s.to_configuration();
        assert_eq!(cfg.servers.len(), 1);
    }
}
