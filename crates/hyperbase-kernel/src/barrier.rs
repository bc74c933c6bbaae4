//! Per-configuration-version acknowledgment tracking.
//!
//! A barrier opens one entry per configuration version with the set of
//! servers expected to acknowledge it. Acknowledging a version closes it
//! for that server (and every earlier still-open version: an ack for a
//! later version subsumes the earlier ones). The barrier's `complete_through`
//! watermark only ever advances through a prefix of versions with no gaps,
//! so closing `v` can cascade and close several versions already waiting on
//! nothing else. Closed versions are deleted outright rather than kept
//! around for inspection -- reclaiming everything up to the last
//! entirely-acked version is simpler than bounding an ever-growing map.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use hyperbase_types::ServerId;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Barrier {
    waiting: BTreeMap<u64, BTreeSet<ServerId>>,
    complete_through: u64,
}

impl Barrier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `version` with `members` still owed. A version with no members
    /// closes immediately on the next `ack` cascade check.
    pub fn open(&mut self, version: u64, members: BTreeSet<ServerId>) {
        self.waiting.entry(version).or_insert(members);
        self.advance();
    }

    /// Records that `server` has acknowledged through `version`. Returns the
    /// versions that newly closed, in increasing order -- each is exactly one
    /// broadcast point.
    pub fn ack(&mut self, server: ServerId, version: u64) -> Vec<u64> {
        for (&v, members) in &mut self.waiting {
            if v <= version {
                members.remove(&server);
            }
        }
        self.advance()
    }

    fn advance(&mut self) -> Vec<u64> {
        let mut closed = Vec::new();
        loop {
            let next = self.complete_through + 1;
            match self.waiting.get(&next) {
                Some(members) if members.is_empty() => {
                    self.waiting.remove(&next);
                    self.complete_through = next;
                    closed.push(next);
                }
                _ => break,
            }
        }
        closed
    }

    #[must_use]
    pub const fn complete_through(&self) -> u64 {
        self.complete_through
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(n: u64) -> ServerId {
        ServerId::new(n)
    }

    #[test]
    fn closes_only_once_every_member_acks() {
        let mut b = Barrier::new();
        b.open(1, BTreeSet::from([sid(1), sid(2)]));
        assert!(b.ack(sid(1), 1).is_empty());
        assert_eq!(b.ack(sid(2), 1), vec![1]);
        assert_eq!(b.complete_through(), 1);
    }

    #[test]
    fn ack_at_later_version_subsumes_earlier_ones() {
        let mut b = Barrier::new();
        b.open(1, BTreeSet::from([sid(1)]));
        b.open(2, BTreeSet::from([sid(1)]));
        let closed = b.ack(sid(1), 2);
        assert_eq!(closed, vec![1, 2]);
    }

    #[test]
    fn empty_membership_closes_on_open() {
        let mut b = Barrier::new();
        b.open(1, BTreeSet::new());
        assert_eq!(b.complete_through(), 1);
    }

    #[test]
    fn gap_blocks_cascade() {
        let mut b = Barrier::new();
        b.open(1, BTreeSet::from([sid(1)]));
        b.open(2, BTreeSet::from([sid(2)]));
        assert!(b.ack(sid(2), 2).is_empty());
        assert_eq!(b.complete_through(), 0);
        assert_eq!(b.ack(sid(1), 1), vec![1, 2]);
    }

    use proptest::prelude::*;

    proptest! {
        /// However the per-server acks for a single-owner chain of versions
        /// arrive, once every version has been acked `complete_through`
        /// lands on the highest version opened -- no version is ever skipped
        /// or double-counted regardless of ack order.
        #[test]
        fn every_order_of_single_owner_acks_fully_closes(count in 1usize..12, seed in 0u64..1000) {
            let mut b = Barrier::new();
            for v in 1..=count as u64 {
                b.open(v, BTreeSet::from([sid(1)]));
            }
            let mut order: Vec<u64> = (1..=count as u64).collect();
            // A cheap deterministic shuffle so the order varies with `seed`
            // without pulling in a shuffling dependency.
            for i in (1..order.len()).rev() {
                let j = (seed.wrapping_mul(2654435761).wrapping_add(i as u64)) as usize % (i + 1);
                order.swap(i, j);
            }
            for v in order {
                b.ack(sid(1), v);
            }
            prop_assert_eq!(b.complete_through(), count as u64);
        }
    }
}
