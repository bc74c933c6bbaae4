//! Replica placement.
//!
//! Chain selection is pure and depends on nothing but its inputs: the
//! permutation of `AVAILABLE` servers and a fixed seed. Two coordinator
//! replicas fed the same commands in the same order compute byte-identical
//! chains.

use std::collections::HashMap;

use hyperbase_types::ServerId;

/// Seed for the tie-break shuffle inside `compute_replica_sets`. Fixed so
/// replication of the state machine stays deterministic; never derived from
/// wall-clock time or `getrandom`.
const PLACEMENT_SEED: u64 = 0x5D9C_23B1_E740_F9A7;

/// A small splitmix64 stream, seeded once per call so tie-break ordering is
/// reproducible from `(seed, server_id)` alone rather than call order.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn tie_break_key(seed: u64, server: ServerId) -> u64 {
    splitmix64(seed ^ server.get())
}

/// One replica chain assigned to a region, in chain order (point leader
/// first, tail last).
pub type Chain = Vec<ServerId>;

/// Scatter width: how many distinct servers a given server is already
/// chained alongside, used to spread load evenly.
#[derive(Debug, Default, Clone)]
struct ScatterTracker {
    width: HashMap<ServerId, u32>,
    collocated: HashMap<ServerId, Vec<ServerId>>,
}

impl ScatterTracker {
    fn scatter_width(&self, server: ServerId) -> u32 {
        *self.width.get(&server).unwrap_or(&0)
    }

    fn is_collocated(&self, a: ServerId, b: ServerId) -> bool {
        self.collocated.get(&a).is_some_and(|peers| peers.contains(&b))
    }

    fn record_chain(&mut self, chain: &[ServerId]) {
        for &server in chain {
            *self.width.entry(server).or_insert(0) += 1;
            let peers = self.collocated.entry(server).or_default();
            for &other in chain {
                if other != server && !peers.contains(&other) {
                    peers.push(other);
                }
            }
        }
    }
}

/// Computes replica chains for `region_count` regions of width `r` given the
/// permutation of `AVAILABLE` servers, using `predecessor_width` to derive
/// the scatter target `s = r * predecessor_width` (the number of distinct
/// collocation partners a server may accumulate before it is deprioritized).
///
/// Returns one chain per region, in the same order regions are requested.
/// A region that cannot find `r` non-collocated candidates gets a chain
/// shorter than `r` (callers treat that as "not enough servers yet").
#[must_use]
pub fn compute_replica_sets(
    permutation: &[ServerId],
    region_count: usize,
    r: u32,
    predecessor_width: u32,
) -> Vec<Chain> {
    if permutation.is_empty() || r == 0 {
        return vec![Vec::new(); region_count];
    }
    let scatter_target = r.saturating_mul(predecessor_width.max(1));
    let mut tracker = ScatterTracker::default();
    let mut chains = Vec::with_capacity(region_count);

    for region_index in 0..region_count {
        let seed = PLACEMENT_SEED ^ (region_index as u64).wrapping_mul(0x1000_0001);
        let mut candidates: Vec<ServerId> = permutation.to_vec();
        candidates.sort_by_key(|&s| (tracker.scatter_width(s) >= scatter_target, tracker.scatter_width(s), tie_break_key(seed, s)));

        let mut chain = Vec::with_capacity(r as usize);
        for candidate in candidates {
            if chain.len() as u32 >= r {
                break;
            }
            if chain.iter().any(|&existing| tracker.is_collocated(existing, candidate) || existing == candidate) {
                continue;
            }
            chain.push(candidate);
        }

        if chain.len() as u32 == r {
            tracker.record_chain(&chain);
        }
        chains.push(chain);
    }

    chains
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u64) -> Vec<ServerId> {
        (1..=n).map(ServerId::new).collect()
    }

    #[test]
    fn full_chain_when_enough_servers() {
        let perm = ids(3);
        let chains = compute_replica_sets(&perm, 1, 3, 1);
        assert_eq!(chains[0].len(), 3);
        let mut sorted = chains[0].clone();
        sorted.sort();
        assert_eq!(sorted, ids(3));
    }

    #[test]
    fn short_chain_when_not_enough_servers() {
        let perm = ids(2);
        let chains = compute_replica_sets(&perm, 1, 3, 1);
        assert_eq!(chains[0].len(), 2);
    }

    #[test]
    fn deterministic_across_calls() {
        let perm = ids(5);
        let a = compute_replica_sets(&perm, 2, 3, 1);
        let b = compute_replica_sets(&perm, 2, 3, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_permutation_yields_empty_chains() {
        let chains = compute_replica_sets(&[], 2, 3, 1);
        assert!(chains.iter().all(Vec::is_empty));
    }

    use test_case::test_case;

    #[test_case(3, 3, 3; "exact_fit_uses_every_server")]
    #[test_case(2, 3, 2; "too_few_servers_yields_a_short_chain")]
    #[test_case(5, 3, 3; "surplus_servers_are_capped_at_r")]
    fn chain_length_matches_available_servers_capped_at_r(server_count: u64, r: u32, expect_len: usize) {
        let perm = ids(server_count);
        let chains = compute_replica_sets(&perm, 1, r, 1);
        assert_eq!(chains[0].len(), expect_len);
    }

    use proptest::prelude::*;

    proptest! {
        /// The placement-soundness property: the same permutation and
        /// parameters always produce byte-identical chains, no matter how
        /// many servers or regions are involved -- required for two
        /// coordinator replicas to converge on the same state.
        #[test]
        fn compute_replica_sets_is_always_deterministic(
            server_count in 0u64..10,
            region_count in 0usize..5,
            r in 0u32..4,
            predecessor_width in 0u32..3,
        ) {
            let perm = ids(server_count);
            let a = compute_replica_sets(&perm, region_count, r, predecessor_width);
            let b = compute_replica_sets(&perm, region_count, r, predecessor_width);
            prop_assert_eq!(a, b);
        }
    }
}
