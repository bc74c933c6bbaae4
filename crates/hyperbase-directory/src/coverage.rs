//! Hashing-volume helpers: the full box a subspace tiles, and the
//! coverage/overlap check the test suite's *Hashing coverage* property
//! (§8) exercises.

use hyperbase_types::Region;

/// The box spanning the entire hashing volume for `dims` dimensions —
/// every region starts life as (or is carved out of) this box.
#[must_use]
pub fn full_volume_box(dims: usize) -> (Vec<u64>, Vec<u64>) {
    (vec![0; dims], vec![u64::MAX; dims])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CoverageError {
    #[error("regions overlap")]
    Overlap,
    #[error("regions do not cover the full volume")]
    Gap,
}

/// Verifies that `regions` (1-dimensional only — the general multi-dim
/// case reduces to checking each axis independently, which this workspace
/// does not need since the kernel never splits a box along more than one
/// axis at a time) exactly tile `[0, u64::MAX]` with no overlap and no gap.
pub fn verify_coverage_1d(regions: &[Region]) -> Result<(), CoverageError> {
    let mut spans: Vec<(u64, u64)> = regions.iter().map(|r| (r.lower_coord[0], r.upper_coord[0])).collect();
    spans.sort_unstable();
    let mut expect_start = 0u64;
    for (lo, hi) in spans {
        if lo > expect_start {
            return Err(CoverageError::Gap);
        }
        if lo < expect_start {
            return Err(CoverageError::Overlap);
        }
        if hi == u64::MAX {
            expect_start = u64::MAX;
        } else {
            expect_start = hi + 1;
        }
    }
    if expect_start != u64::MAX {
        return Err(CoverageError::Gap);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperbase_types::{RegionId, Replica, ServerId, VirtualServerId};

    fn region(lo: u64, hi: u64) -> Region {
        Region {
            id: RegionId::new(1),
            lower_coord: vec![lo],
            upper_coord: vec![hi],
            replicas: vec![Replica { server: ServerId::new(1), virt: VirtualServerId::new(1) }],
        }
    }

    #[test]
    fn single_region_covers_whole_volume() {
        assert!(verify_coverage_1d(&[region(0, u64::MAX)]).is_ok());
    }

    #[test]
    fn split_regions_cover_without_gap_or_overlap() {
        let regions = [region(0, u64::MAX / 2), region(u64::MAX / 2 + 1, u64::MAX)];
        assert!(verify_coverage_1d(&regions).is_ok());
    }

    #[test]
    fn gap_is_detected() {
        let regions = [region(0, 10), region(20, u64::MAX)];
        assert_eq!(verify_coverage_1d(&regions), Err(CoverageError::Gap));
    }

    #[test]
    fn overlap_is_detected() {
        let regions = [region(0, 20), region(10, u64::MAX)];
        assert_eq!(verify_coverage_1d(&regions), Err(CoverageError::Overlap));
    }

    use proptest::prelude::*;

    proptest! {
        /// Any set of strictly increasing split points, fed through the same
        /// construction `apply_command` uses to carve a box in half
        /// repeatedly, still tiles the full volume with no gap or overlap.
        #[test]
        fn recursive_splits_always_tile_the_volume(mut splits in prop::collection::vec(1u64..u64::MAX, 0..6)) {
            splits.sort_unstable();
            splits.dedup();
            let mut bounds = vec![0u64];
            bounds.extend(splits);
            bounds.push(u64::MAX);
            let regions: Vec<Region> = bounds
                .windows(2)
                .map(|w| {
                    let hi = if w[1] == u64::MAX { w[1] } else { w[1] - 1 };
                    region(w[0], hi)
                })
                .collect();
            prop_assert!(verify_coverage_1d(&regions).is_ok());
        }
    }
}
