//! Configuration blob encoding (§6): `cluster‖version‖flags‖|servers|‖
//! |spaces|‖|transfers|‖servers[]‖spaces[]‖transfers[]`. Read by clients
//! and daemons off the coordinator's config condition variable.

use hyperbase_types::{ConfigFlags, Configuration, Server, Space, Transfer};
use serde::{Deserialize, Serialize};

use crate::body::{decode_body, encode_body};
use crate::error::WireError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct WireConfiguration {
    cluster: u64,
    version: u64,
    flags: u32,
    servers: Vec<Server>,
    spaces: Vec<Space>,
    transfers: Vec<Transfer>,
}

pub fn encode_configuration(config: &Configuration) -> Result<Vec<u8>, WireError> {
    encode_body(&WireConfiguration {
        cluster: config.cluster,
        version: config.version,
        flags: config.flags.bits(),
        servers: config.servers.clone(),
        spaces: config.spaces.clone(),
        transfers: config.transfers.clone(),
    })
}

pub fn decode_configuration(bytes: &[u8]) -> Result<Configuration, WireError> {
    let wire: WireConfiguration = decode_body(bytes)?;
    Ok(Configuration {
        cluster: wire.cluster,
        version: wire.version,
        flags: ConfigFlags::from_bits(wire.flags),
        servers: wire.servers,
        spaces: wire.spaces,
        transfers: wire.transfers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperbase_types::ServerState;

    #[test]
    fn configuration_round_trips() {
        let config = Configuration {
            cluster: 42,
            version: 1,
            flags: ConfigFlags::READ_ONLY,
            servers: vec![Server { id: 1.into(), bind_to: "a:1".into(), state: ServerState::Available }],
            spaces: vec![],
            transfers: vec![],
        };
        let bytes = encode_configuration(&config).unwrap();
        let decoded = decode_configuration(&bytes).unwrap();
        assert_eq!(decoded, config);
        assert!(decoded.is_read_only());
    }
}
