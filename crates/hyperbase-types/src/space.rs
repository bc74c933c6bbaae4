//! Hyperspace placement model: spaces, subspaces, regions, servers and
//! transfers (§3).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ids::{RegionId, ServerId, SpaceId, SubspaceId, TransferId, VirtualServerId};
use crate::schema::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerState {
    Assigned,
    NotAvailable,
    Available,
    Shutdown,
    Killed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: ServerId,
    pub bind_to: String,
    pub state: ServerState,
}

impl Server {
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self.state, ServerState::Available)
    }
}

/// One link in a region's replication chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replica {
    pub server: ServerId,
    pub virt: VirtualServerId,
}

/// An axis-aligned box in a subspace's hashing volume, replicated by a
/// chain of servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub lower_coord: Vec<u64>,
    pub upper_coord: Vec<u64>,
    pub replicas: Vec<Replica>,
}

impl Region {
    #[must_use]
    pub fn point_leader(&self) -> Option<Replica> {
        self.replicas.first().copied()
    }

    #[must_use]
    pub fn tail(&self) -> Option<Replica> {
        self.replicas.last().copied()
    }

    #[must_use]
    pub const fn is_offline(&self) -> bool {
        self.replicas.is_empty()
    }

    /// Whether `coord` (one value per subspace attribute) falls within this
    /// region's inclusive box.
    #[must_use]
    pub fn contains_coord(&self, coord: &[u64]) -> bool {
        coord.len() == self.lower_coord.len()
            && coord
                .iter()
                .zip(self.lower_coord.iter())
                .zip(self.upper_coord.iter())
                .all(|((c, lo), hi)| c >= lo && c <= hi)
    }
}

/// A projection of a space onto a chosen list of attributes, partitioned
/// into regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subspace {
    pub id: SubspaceId,
    /// Attribute indices into the owning space's schema, in hashing order.
    pub attrs: Vec<usize>,
    pub regions: Vec<Region>,
}

/// The coordinator's declarative wish for a region's composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionIntent {
    pub region_id: RegionId,
    pub desired_replicas: Vec<Replica>,
    pub checkpoint: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub name: String,
    pub schema: Schema,
    pub fault_tolerance: u32,
    pub predecessor_width: u32,
    pub subspaces: Vec<Subspace>,
    pub indices: Vec<crate::ids::IndexId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpaceError {
    #[error("fault tolerance must be at least 1")]
    FaultToleranceZero,
    #[error("subspace attribute list is empty")]
    EmptySubspaceAttrs,
    #[error("subspace attribute list has duplicates")]
    DuplicateSubspaceAttr,
    #[error("subspace references an attribute outside the schema's secondary attributes")]
    SubspaceAttrNotSecondary,
}

impl Space {
    pub fn validate_subspaces(&self) -> Result<(), SpaceError> {
        if self.fault_tolerance < 1 {
            return Err(SpaceError::FaultToleranceZero);
        }
        let secondary_count = self.schema.secondary_attributes().len();
        for subspace in &self.subspaces {
            if subspace.attrs.is_empty() && self.subspaces.len() > 1 {
                // the implicit first subspace (keyed only) is allowed to be empty
            }
            let mut seen = HashSet::new();
            for &attr in &subspace.attrs {
                if attr == 0 || attr > secondary_count {
                    return Err(SpaceError::SubspaceAttrNotSecondary);
                }
                if !seen.insert(attr) {
                    return Err(SpaceError::DuplicateSubspaceAttr);
                }
            }
        }
        Ok(())
    }
}

/// Created when the coordinator decides a region must gain/lose/replace a
/// replica. A transfer is *live* once the tail of the chain is `dst_virtual`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub region_id: RegionId,
    pub src_server: ServerId,
    pub src_virtual: VirtualServerId,
    pub dst_server: ServerId,
    pub dst_virtual: VirtualServerId,
}

/// Cluster-wide configuration flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigFlags(u32);

impl ConfigFlags {
    pub const READ_ONLY: Self = Self(0b0000_0001);
    pub const NONE: Self = Self(0);

    #[must_use]
    pub const fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 == flag.0
    }

    #[must_use]
    pub const fn with(self, flag: Self) -> Self {
        Self(self.0 | flag.0)
    }

    #[must_use]
    pub const fn without(self, flag: Self) -> Self {
        Self(self.0 & !flag.0)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

/// An immutable snapshot of cluster topology. Every new version strictly
/// increases; this is the sole authoritative input to routing decisions
/// anywhere in the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub cluster: u64,
    pub version: u64,
    pub flags: ConfigFlags,
    pub servers: Vec<Server>,
    pub spaces: Vec<Space>,
    pub transfers: Vec<Transfer>,
}

impl Configuration {
    #[must_use]
    pub fn server(&self, id: ServerId) -> Option<&Server> {
        self.servers.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn space_by_name(&self, name: &str) -> Option<&Space> {
        self.spaces.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn space(&self, id: SpaceId) -> Option<&Space> {
        self.spaces.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.flags.contains(ConfigFlags::READ_ONLY)
    }

    /// Looks up a virtual server's owning physical server, for routing
    /// validation (§4.2 reconfiguration detection).
    #[must_use]
    pub fn server_for_virtual(&self, virt: VirtualServerId) -> Option<ServerId> {
        self.spaces.iter().flat_map(|s| &s.subspaces).flat_map(|ss| &ss.regions).flat_map(|r| &r.replicas).find_map(
            |r| (r.virt == virt).then_some(r.server),
        )
    }
}
