//! Monotonic 64-bit identifiers.
//!
//! Every kind is a distinct newtype so a `RegionId` can never be passed where
//! a `ServerId` is expected. Zero is reserved for "none" (`NONE` /
//! `Default::default()`); the coordinator's counter never reuses a value.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const NONE: Self = Self(0);

            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            #[must_use]
            pub const fn is_none(self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

id_type!(ServerId);
id_type!(VirtualServerId);
id_type!(RegionId);
id_type!(SubspaceId);
id_type!(SpaceId);
id_type!(TransferId);
id_type!(IndexId);

/// Monotonic ID factory carried in coordinator state.
///
/// IDs flow outward and are treated as opaque by peers; the counter is
/// never rewound, even across space/server deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdCounter(u64);

impl IdCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Allocates the next id, starting at 1 (0 is reserved for "none").
    pub fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}
