//! The storage daemon host: owns a [`Listener`] for client traffic and a
//! [`CoordinatorLink`] for the control plane, and ties the two together
//! (§4.4, §4.6).
//!
//! Nothing here is novel machinery: it is wiring that makes
//! `hyperbase-server` and `hyperbase-agent-protocol` usable from one
//! `main`.

use std::time::Duration;

use hyperbase_agent_protocol::{CheckpointFollow, ConfigFollow, CoordinatorLink, CoordinatorRpc, MaintainOutcome};
use hyperbase_server::{ChainLink, Listener, ListenerConfig, RegionStore, RequestHandler};
use hyperbase_types::{Schema, ServerId};

use crate::error::Result;

/// A running storage daemon for one hosted region: a client-facing
/// [`Listener`] driving a [`RequestHandler`], and a [`CoordinatorLink`]
/// kept warm alongside it. `run_once` advances both by exactly one step,
/// so the caller (a binary's main loop, a test) decides pacing and
/// shutdown.
pub struct Daemon<S, C> {
    listener: Listener,
    handler: RequestHandler<S, C>,
    link: CoordinatorLink,
}

impl<S: RegionStore, C: ChainLink> Daemon<S, C> {
    pub fn bind(config: ListenerConfig, schema: Schema, store: S, chain: C, self_id: ServerId) -> Result<Self> {
        let listener = Listener::bind(config)?;
        let handler = RequestHandler::new(schema, store, chain);
        let link = CoordinatorLink::new(self_id);
        Ok(Self { listener, handler, link })
    }

    #[must_use]
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.listener.connection_count()
    }

    /// Services one round of client I/O against the region store.
    pub fn serve_clients_once(&mut self, now_unix_seconds: u64) -> Result<()> {
        self.listener.run_once(&mut self.handler, now_unix_seconds)?;
        Ok(())
    }

    /// Runs one iteration of the coordinator-link maintenance loop
    /// (§4.4), installing any new configuration the link picked up.
    pub fn maintain_link<F, K, R>(
        &mut self,
        config_follow: &mut F,
        checkpoint_follow: &mut K,
        rpc: &mut R,
    ) -> (Duration, std::result::Result<MaintainOutcome, hyperbase_agent_protocol::LinkError>)
    where
        F: ConfigFollow,
        K: CheckpointFollow,
        R: CoordinatorRpc,
    {
        self.link.maintain(config_follow, checkpoint_follow, rpc)
    }

    #[must_use]
    pub fn region_store(&self) -> &S {
        self.handler.store()
    }

    #[must_use]
    pub fn link(&self) -> &CoordinatorLink {
        &self.link
    }

    /// Runs `serve_clients_once` in a loop until `should_stop` reports
    /// true, checked between ticks -- the shape a binary's own signal
    /// handling would flip to end the process cleanly.
    pub fn run_until(&mut self, now_unix_seconds: impl Fn() -> u64, should_stop: impl Fn() -> bool) -> Result<()> {
        while !should_stop() {
            self.serve_clients_once(now_unix_seconds())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperbase_server::{MemoryRegionStore, SingletonChain};
    use hyperbase_types::{Attribute, DataType};

    fn kv_schema() -> Schema {
        Schema::new(vec![Attribute::new("k", DataType::String), Attribute::new("v", DataType::Int64)], false).unwrap()
    }

    #[test]
    fn bind_starts_with_no_connections() {
        let config = ListenerConfig::new("127.0.0.1:0".parse().unwrap());
        let daemon =
            Daemon::bind(config, kv_schema(), MemoryRegionStore::new(), SingletonChain, ServerId::new(1)).unwrap();
        assert_eq!(daemon.connection_count(), 0);
        assert!(daemon.local_addr().unwrap().port() > 0);
    }
}
