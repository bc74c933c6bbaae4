//! # hyperbase-kernel: the coordinator's pure functional core
//!
//! The kernel is the deterministic heart of the coordinator. It receives
//! committed commands and produces new state plus broadcast effects.
//!
//! ## Key principles
//!
//! - **No IO**: the kernel never touches disk, network, or any clock
//! - **No randomness**: `compute_replica_sets` is seeded, never `getrandom`
//! - **Pure functions**: `apply_command(state, command) -> (state, outcome)`
//!
//! ## Layout
//!
//! - [`command`]: every input the state machine accepts, plus the
//!   [`command::SpaceBuilder`] that replaces the source material's
//!   exception-style space construction
//! - [`state`]: the coordinator's in-memory state
//! - [`effects`]: broadcasts the shell must publish after a command
//! - [`barrier`]: per-configuration-version acknowledgment tracking
//! - [`placement`]: `compute_replica_sets`, the deterministic chain planner
//! - [`kernel`]: `apply_command`, tying the above together
//! - [`runtime`]: the replicated-log and clock boundary the kernel sits
//!   inside, owned by the shell rather than the kernel itself
//! - [`state_hash`]: a deterministic digest used to assert state equality
//!   across replicas without comparing the whole struct

pub mod barrier;
pub mod command;
pub mod effects;
pub mod kernel;
pub mod placement;
pub mod runtime;
pub mod state;
pub mod state_hash;

#[cfg(test)]
mod tests;

pub use barrier::Barrier;
pub use command::{Command, NewAttribute, NewSpace, NewSubspace, SpaceBuildError, SpaceBuilder};
pub use effects::{AckKind, Effect};
pub use kernel::{CommandOutcome, apply_command};
pub use placement::{Chain, compute_replica_sets};
pub use runtime::{Clock, ReplicatedLog, SystemClock};
pub use state::State;
