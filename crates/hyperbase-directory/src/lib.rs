//! # hyperbase-directory: hyperspace geometry
//!
//! Turns a [`hyperbase_types::Space`]'s subspaces and regions into routing
//! decisions: hashing a key or attribute value to a coordinate, finding the
//! region whose box contains it, and collapsing a search's attribute
//! checks into per-attribute ranges for region pruning (§4.3).
//!
//! This crate does no IO and holds no state of its own — every function
//! takes a `&Space` (or a slice of regions) and returns a borrowed or
//! owned answer. The coordinator (`hyperbase-kernel`) is the only writer
//! of the structures this crate reads.

pub mod coverage;
pub mod lookup;
pub mod range;

pub use coverage::{CoverageError, full_volume_box, verify_coverage_1d};
pub use lookup::{
    SubspacePlan, coordinate_of, lookup_point_leader, plan_search, region_for_coordinate, smallest_plan,
};
pub use range::{Range, compute_ranges};
