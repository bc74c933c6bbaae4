//! Point-leader and search-pruning lookups against a [`Space`]'s regions.

use hyperbase_types::{Region, Replica, Space, Subspace, Value};

use crate::range::{Range, compute_ranges};

/// The hashing dimensions of a subspace: attribute indices, in order, whose
/// coordinates make up a region's box. Subspace 0 is implicit and keyed on
/// the primary key (attribute index 0) regardless of its (empty) `attrs`.
#[must_use]
fn hashing_attrs(subspace_index: usize, subspace: &Subspace) -> Vec<usize> {
    if subspace_index == 0 { vec![0] } else { subspace.attrs.clone() }
}

/// Computes the hash coordinate vector for `values` (one value per hashing
/// attribute, in `hashing_attrs` order). Returns `None` if any attribute's
/// type is not hashable.
#[must_use]
pub fn coordinate_of(values: &[&Value]) -> Option<Vec<u64>> {
    values.iter().map(|v| v.hash_coordinate()).collect()
}

/// Finds the region whose box contains `coord` within `subspace`.
#[must_use]
pub fn region_for_coordinate<'a>(subspace: &'a Subspace, coord: &[u64]) -> Option<&'a Region> {
    subspace.regions.iter().find(|r| r.contains_coord(coord))
}

/// §4.2 keyed dispatch: hashes the key under subspace 0 and returns the
/// point leader of the region it lands in. `None` means the space has no
/// implicit subspace yet (shouldn't happen for a validated space) or the
/// region is offline.
#[must_use]
pub fn lookup_point_leader(space: &Space, key: &Value) -> Option<Replica> {
    let subspace0 = space.subspaces.first()?;
    let coord = vec![key.hash_coordinate()?];
    let region = region_for_coordinate(subspace0, &coord)?;
    region.point_leader()
}

/// One subspace's search-pruning result: the regions whose box intersects
/// every applicable range, targeted at their tail replica.
#[derive(Debug, Clone, Default)]
pub struct SubspacePlan {
    pub subspace_index: usize,
    pub targets: Vec<Replica>,
}

impl SubspacePlan {
    #[must_use]
    pub fn distinct_server_count(&self) -> usize {
        let mut servers: Vec<_> = self.targets.iter().map(|r| r.server).collect();
        servers.sort();
        servers.dedup();
        servers.len()
    }
}

fn region_matches(region: &Region, dims: &[usize], ranges: &std::collections::HashMap<usize, Range>) -> bool {
    for (pos, &attr) in dims.iter().enumerate() {
        let Some(range) = ranges.get(&attr) else { continue };
        if let Some(lower) = &range.lower {
            let Some(h) = lower.hash_coordinate() else { continue };
            if !(region.lower_coord[pos]..=region.upper_coord[pos]).contains(&h) {
                return false;
            }
        }
        if let Some(upper) = &range.upper {
            let Some(h) = upper.hash_coordinate() else { continue };
            if !(region.lower_coord[pos]..=region.upper_coord[pos]).contains(&h) {
                return false;
            }
        }
    }
    true
}

/// §4.2 / §4.3 search dispatch: computes the range intersection, then for
/// every subspace enumerates matching, online regions and targets their
/// tail. Returns the plan for the subspace with the smallest distinct
/// server set. An empty `targets` (on the chosen plan, or when no subspace
/// has a plan) means the search is satisfiable by no server — `OFFLINE`/
/// empty result upstream, not an error.
#[must_use]
pub fn plan_search(space: &Space, checks: &[hyperbase_types::AttributeCheck]) -> Vec<SubspacePlan> {
    let Some(ranges) = compute_ranges(checks) else {
        return Vec::new();
    };
    space
        .subspaces
        .iter()
        .enumerate()
        .map(|(index, subspace)| {
            let dims = hashing_attrs(index, subspace);
            let targets = subspace
                .regions
                .iter()
                .filter(|r| !r.is_offline())
                .filter(|r| region_matches(r, &dims, &ranges))
                .filter_map(Region::tail)
                .collect();
            SubspacePlan { subspace_index: index, targets }
        })
        .collect()
}

/// Picks the smallest-server-set plan among `plans` (§4.2: "choose the
/// subspace whose non-empty server set is smallest").
#[must_use]
pub fn smallest_plan(plans: &[SubspacePlan]) -> Option<&SubspacePlan> {
    plans.iter().filter(|p| !p.targets.is_empty()).min_by_key(|p| p.distinct_server_count())
}
