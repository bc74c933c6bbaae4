//! The chain-replication write path boundary.
//!
//! Propagating a write down a region's replica chain and waiting for the
//! tail's acknowledgment is an external collaborator's protocol.
//! `ChainLink` is the seam
//! a real daemon plugs that protocol into; the handler only needs to know
//! whether a write may be applied locally yet, not how the chain agreed on
//! that.

use hyperbase_types::{ServerId, Value, VirtualServerId};

/// Outcome of offering a write to the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// This virtual server is not the chain's point leader/non-tail link
    /// that originates the write; nothing to do here.
    NotOriginator,
    /// The write was forwarded and the tail acknowledged it; safe to apply
    /// and reply to the client.
    Acknowledged,
    /// The chain could not be reached (a downstream link is offline); the
    /// handler surfaces `ResultCode::ServerError`.
    Failed,
}

/// One virtual server's view of its region's replication chain.
pub trait ChainLink {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Forwards `key`/`attrs` (the post-funcall record state) to the next
    /// chain member, or reports this virtual server as the tail (nothing
    /// further to forward). Blocks until the tail has acknowledged, per
    /// the chain-replication protocol this crate only provides a boundary
    /// for.
    fn replicate(
        &mut self,
        key: &Value,
        attrs: &[Value],
    ) -> Result<ChainOutcome, Self::Error>;

    /// True when this virtual server is the tail of its region's chain --
    /// the point a write becomes durable enough to ack the client and the
    /// point search/aggregation reads are served from.
    fn is_tail(&self) -> bool;
}

/// A `ChainLink` that always acts as a singleton chain of one: every write
/// is immediately its own tail. Used by the loopback daemon harness and by
/// `R=1` test spaces where there is nothing to forward to.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingletonChain;

impl ChainLink for SingletonChain {
    type Error = std::convert::Infallible;

    fn replicate(&mut self, _key: &Value, _attrs: &[Value]) -> Result<ChainOutcome, Self::Error> {
        Ok(ChainOutcome::Acknowledged)
    }

    fn is_tail(&self) -> bool {
        true
    }
}

/// Identifies which virtual server, on which physical server, a handler
/// instance is acting as -- the coordinate a `ChainLink` implementation
/// needs to find its neighbors in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPosition {
    pub server: ServerId,
    pub virtual_server: VirtualServerId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_chain_is_always_its_own_tail() {
        let mut chain = SingletonChain;
        assert!(chain.is_tail());
        let outcome = chain.replicate(&Value::Int64(1), &[]).unwrap();
        assert_eq!(outcome, ChainOutcome::Acknowledged);
    }
}
