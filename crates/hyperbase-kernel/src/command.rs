//! Coordinator commands.

use hyperbase_types::{DataType, IndexId, SchemaError, ServerId, SpaceError, TransferId};

/// One attribute in a space under construction, before any id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttribute {
    pub name: String,
    pub datatype: DataType,
}

/// One subspace under construction: the secondary-attribute positions (1-based
/// into the final schema) it hashes on. An empty list describes the implicit,
/// keyed-only first subspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubspace {
    pub attrs: Vec<usize>,
}

/// A fully-validated space description, ready for `Command::SpaceAdd`. Only
/// reachable through [`SpaceBuilder::build`], so a kernel that receives one
/// never has to re-derive whether it is well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSpace {
    pub name: String,
    pub attributes: Vec<NewAttribute>,
    pub authorization: bool,
    pub fault_tolerance: u32,
    pub predecessor_width: u32,
    pub subspaces: Vec<NewSubspace>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpaceBuildError {
    #[error("space name is empty")]
    EmptyName,
    #[error("space must declare at least a key attribute")]
    NoAttributes,
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Topology(#[from] SpaceError),
}

/// Builds a [`NewSpace`] one field at a time, replacing the exception-style
/// construction with setters that
/// either accept the value or hand back a structured error immediately.
#[derive(Debug, Clone, Default)]
pub struct SpaceBuilder {
    name: String,
    attributes: Vec<NewAttribute>,
    authorization: bool,
    fault_tolerance: u32,
    predecessor_width: u32,
    subspaces: Vec<NewSubspace>,
}

impl SpaceBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { fault_tolerance: 1, predecessor_width: 1, ..Self::default() }.with_name(name)
    }

    fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Appends an attribute. The first attribute becomes the key.
    pub fn attribute(mut self, name: impl Into<String>, datatype: DataType) -> Result<Self, SpaceBuildError> {
        let name = name.into();
        if !hyperbase_types::is_valid_attribute_name(&name) {
            return Err(SchemaError::InvalidName.into());
        }
        self.attributes.push(NewAttribute { name, datatype });
        Ok(self)
    }

    #[must_use]
    pub fn authorization(mut self, authorization: bool) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn fault_tolerance(mut self, r: u32) -> Result<Self, SpaceBuildError> {
        if r == 0 {
            return Err(SpaceError::FaultToleranceZero.into());
        }
        self.fault_tolerance = r;
        Ok(self)
    }

    #[must_use]
    pub fn predecessor_width(mut self, p: u32) -> Self {
        self.predecessor_width = p;
        self
    }

    /// Declares an additional subspace hashing on the given secondary
    /// attribute positions (1-based). The implicit keyed subspace does not
    /// need to be declared; call this only for extra ones.
    #[must_use]
    pub fn subspace(mut self, attrs: Vec<usize>) -> Self {
        self.subspaces.push(NewSubspace { attrs });
        self
    }

    /// Validates the accumulated fields against the same rules a stored
    /// [`hyperbase_types::Space`] must satisfy, and returns the finished
    /// description or the first violated invariant.
    pub fn build(self) -> Result<NewSpace, SpaceBuildError> {
        if self.name.is_empty() {
            return Err(SpaceBuildError::EmptyName);
        }
        if self.attributes.is_empty() {
            return Err(SpaceBuildError::NoAttributes);
        }
        let schema_attrs: Vec<hyperbase_types::Attribute> = self
            .attributes
            .iter()
            .map(|a| hyperbase_types::Attribute::new(a.name.clone(), a.datatype))
            .collect();
        let schema = hyperbase_types::Schema::new(schema_attrs, self.authorization)?;

        let mut subspaces = vec![NewSubspace { attrs: Vec::new() }];
        subspaces.extend(self.subspaces);

        let secondary_count = schema.secondary_attributes().len();
        for ss in &subspaces {
            let mut seen = std::collections::HashSet::new();
            for &attr in &ss.attrs {
                if attr == 0 || attr > secondary_count {
                    return Err(SpaceError::SubspaceAttrNotSecondary.into());
                }
                if !seen.insert(attr) {
                    return Err(SpaceError::DuplicateSubspaceAttr.into());
                }
            }
        }

        Ok(NewSpace {
            name: self.name,
            attributes: self.attributes,
            authorization: self.authorization,
            fault_tolerance: self.fault_tolerance,
            predecessor_width: self.predecessor_width,
            subspaces,
        })
    }
}

/// Every input the coordinator state machine accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Init { cluster_token: u64 },
    ReadOnly(bool),
    FaultTolerance { space: String, replication_factor: u32 },
    ConfigGet,
    ConfigAck { server: ServerId, version: u64 },
    ConfigStable { server: ServerId, version: u64 },
    ServerRegister { id: ServerId, bind_to: String },
    ServerOnline { id: ServerId, bind_to: Option<String> },
    ServerOffline { id: ServerId },
    ServerShutdown { id: ServerId },
    ServerKill { id: ServerId },
    ServerForget { id: ServerId },
    ServerSuspect { id: ServerId, version: u64 },
    /// The reason string, when present, is advisory only -- resolved Open
    /// Question: the state machine must ignore it and act solely on
    /// `(server, version)`.
    ReportDisconnect { server: ServerId, version: u64, reason: Option<String> },
    SpaceAdd { space: NewSpace },
    SpaceRm { name: String },
    SpaceMv { from: String, to: String },
    IndexAdd { space: String, attr: usize },
    IndexRm { space: String, index: IndexId },
    TransferGoLive { version: u64, transfer: TransferId },
    TransferComplete { version: u64, transfer: TransferId },
    CheckpointStable { server: ServerId, configuration_version: u64, checkpoint_number: u64 },
    Periodic,
    Checkpoints,
    Checkpoint,
    Alarm,
    DebugDump,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_zero_fault_tolerance() {
        let err = SpaceBuilder::new("kv").fault_tolerance(0).unwrap_err();
        assert_eq!(err, SpaceBuildError::Topology(SpaceError::FaultToleranceZero));
    }

    #[test]
    fn builder_rejects_invalid_attribute_name() {
        let err = SpaceBuilder::new("kv").attribute("__hidden", DataType::String).unwrap_err();
        assert!(matches!(err, SpaceBuildError::Schema(SchemaError::InvalidName)));
    }

    #[test]
    fn builder_produces_space_with_key_first() {
        let space = SpaceBuilder::new("kv")
            .attribute("k", DataType::String)
            .unwrap()
            .attribute("v", DataType::String)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(space.attributes[0].name, "k");
        assert_eq!(space.fault_tolerance, 1);
    }

    #[test]
    fn builder_rejects_subspace_on_key_position() {
        let err = SpaceBuilder::new("kv")
            .attribute("k", DataType::String)
            .unwrap()
            .attribute("v", DataType::Int64)
            .unwrap()
            .subspace(vec![0])
            .build()
            .unwrap_err();
        assert!(matches!(err, SpaceBuildError::Topology(SpaceError::SubspaceAttrNotSecondary)));
    }
}
