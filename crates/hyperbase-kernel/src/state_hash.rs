//! Deterministic state hashing.
//!
//! Two coordinator replicas fed the same command sequence must reach
//! byte-identical state. Hashing every field in a fixed order turns that
//! claim into a single `blake3::Hash` comparison property tests can assert
//! on directly, without comparing the whole struct.

use blake3::Hasher;

use hyperbase_types::{Region, Server, Space, Subspace, Transfer};

use crate::state::State;

// `ServerState` carries no explicit discriminant values worth depending on,
// so hash its `Debug` rendering instead of transmuting the enum.
fn hash_server(hasher: &mut Hasher, server: &Server) {
    hasher.update(&server.id.get().to_le_bytes());
    hasher.update(server.bind_to.as_bytes());
    hasher.update(format!("{:?}", server.state).as_bytes());
}

impl State {
    /// Computes a deterministic digest of the entire coordinator state.
    /// Order is fixed: cluster/version/flags/checkpoints, then servers,
    /// spaces (with subspaces and regions), and transfers, each sorted by
    /// id so insertion order never affects the hash.
    #[must_use]
    pub fn deterministic_hash(&self) -> blake3::Hash {
        let mut hasher = Hasher::new();
        hasher.update(&self.cluster.to_le_bytes());
        hasher.update(&self.version.to_le_bytes());
        hasher.update(&self.flags.bits().to_le_bytes());
        hasher.update(&self.checkpoint.to_le_bytes());
        hasher.update(&self.stable_checkpoint.to_le_bytes());

        let mut servers = self.servers.clone();
        servers.sort_by_key(|s| s.id);
        for server in &servers {
            hash_server(&mut hasher, server);
        }

        let mut spaces: Vec<&Space> = self.spaces.iter().collect();
        spaces.sort_by_key(|s| s.id);
        for space in spaces {
            hasher.update(&space.id.get().to_le_bytes());
            hasher.update(space.name.as_bytes());
            hasher.update(&space.fault_tolerance.to_le_bytes());
            let mut subspaces: Vec<&Subspace> = space.subspaces.iter().collect();
            subspaces.sort_by_key(|ss| ss.id);
            for subspace in subspaces {
                hasher.update(&subspace.id.get().to_le_bytes());
                let mut regions: Vec<&Region> = subspace.regions.iter().collect();
                regions.sort_by_key(|r| r.id);
                for region in regions {
                    hasher.update(&region.id.get().to_le_bytes());
                    for &coord in &region.lower_coord {
                        hasher.update(&coord.to_le_bytes());
                    }
                    for &coord in &region.upper_coord {
                        hasher.update(&coord.to_le_bytes());
                    }
                    for replica in &region.replicas {
                        hasher.update(&replica.server.get().to_le_bytes());
                        hasher.update(&replica.virt.get().to_le_bytes());
                    }
                }
            }
        }

        let mut transfers: Vec<&Transfer> = self.transfers.iter().collect();
        transfers.sort_by_key(|t| t.id);
        for transfer in transfers {
            hasher.update(&transfer.id.get().to_le_bytes());
            hasher.update(&transfer.region_id.get().to_le_bytes());
            hasher.update(&transfer.src_server.get().to_le_bytes());
            hasher.update(&transfer.dst_server.get().to_le_bytes());
        }

        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use hyperbase_types::ServerId;

    use super::*;
    use crate::command::Command;
    use crate::kernel::apply_command;

    #[test]
    fn same_command_sequence_yields_same_hash() {
        let run = || {
            let mut state = State::new();
            (state, _) = apply_command(state, Command::Init { cluster_token: 7 });
            (state, _) = apply_command(
                state,
                Command::ServerRegister { id: ServerId::new(1), bind_to: "a:1".into() },
            );
            state
        };
        assert_eq!(run().deterministic_hash(), run().deterministic_hash());
    }

    #[test]
    fn differing_state_hashes_differ() {
        let mut a = State::new();
        (a, _) = apply_command(a, Command::Init { cluster_token: 1 });
        let mut b = State::new();
        (b, _) = apply_command(b, Command::Init { cluster_token: 2 });
        assert_ne!(a.deterministic_hash(), b.deterministic_hash());
    }
}
