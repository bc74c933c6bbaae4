//! Outbound notifications a daemon sends back to the coordinator (§4.4).
//!
//! Every call here is idempotent by contract -- the coordinator's handlers
//! for `config_ack`/`config_stable`/`checkpoint_stable`/`transfer_go_live`/
//! `transfer_complete`/`server_suspect` tolerate redelivery -- so the link
//! is free to retransmit indefinitely on failure without tracking whether
//! a given attempt was the first.

use hyperbase_types::{ServerId, TransferId};

/// The coordinator RPCs a daemon issues outside of the `config`/`checkpoint`
/// follows themselves.
pub trait CoordinatorRpc {
    type Error: std::error::Error + Send + Sync + 'static;

    fn config_ack(&mut self, server: ServerId, version: u64) -> Result<(), Self::Error>;
    fn config_stable(&mut self, server: ServerId, version: u64) -> Result<(), Self::Error>;
    fn checkpoint_report_stable(&mut self, server: ServerId, configuration_version: u64) -> Result<(), Self::Error>;
    fn transfer_go_live(&mut self, version: u64, transfer: TransferId) -> Result<(), Self::Error>;
    fn transfer_complete(&mut self, version: u64, transfer: TransferId) -> Result<(), Self::Error>;
    fn report_tcp_disconnect(&mut self, version: u64, peer: ServerId) -> Result<(), Self::Error>;
    /// Re-asserts availability. Issued as a "defended call" (§4.4) when a
    /// freshly-installed configuration still lists this server as
    /// `NOT_AVAILABLE` -- the daemon believes it is up and says so again.
    fn server_online(&mut self, id: ServerId, bind_to: Option<String>) -> Result<(), Self::Error>;
}

/// One queued outbound notification, retried until it is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    ConfigAck { server: ServerId, version: u64 },
    ConfigStable { server: ServerId, version: u64 },
    CheckpointStable { server: ServerId, configuration_version: u64 },
    TransferGoLive { version: u64, transfer: TransferId },
    TransferComplete { version: u64, transfer: TransferId },
    ReportTcpDisconnect { version: u64, peer: ServerId },
    ServerOnline { id: ServerId, bind_to: Option<String> },
}

/// A FIFO of notifications awaiting delivery. §4.4 "the link retransmits
/// indefinitely with exponential backoff until the coordinator confirms
/// receipt" -- `drain` tries every queued notification each call and keeps
/// only the ones that failed, preserving order.
#[derive(Debug, Default)]
pub struct NotifyQueue {
    pending: std::collections::VecDeque<Notification>,
}

impl NotifyQueue {
    #[must_use]
    pub fn new() -> Self {
        Self { pending: std::collections::VecDeque::new() }
    }

    pub fn push(&mut self, notification: Notification) {
        self.pending.push_back(notification);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Attempts to deliver every queued notification via `rpc`, in order.
    /// A notification that fails to send is kept, and delivery stops at
    /// the first failure so ordering between a server's own acks is
    /// preserved; returns whether anything was successfully delivered.
    pub fn drain<R: CoordinatorRpc>(&mut self, rpc: &mut R) -> bool {
        let mut delivered_any = false;
        while let Some(notification) = self.pending.pop_front() {
            let result = match &notification {
                Notification::ConfigAck { server, version } => rpc.config_ack(*server, *version),
                Notification::ConfigStable { server, version } => rpc.config_stable(*server, *version),
                Notification::CheckpointStable { server, configuration_version } => {
                    rpc.checkpoint_report_stable(*server, *configuration_version)
                }
                Notification::TransferGoLive { version, transfer } => rpc.transfer_go_live(*version, *transfer),
                Notification::TransferComplete { version, transfer } => rpc.transfer_complete(*version, *transfer),
                Notification::ReportTcpDisconnect { version, peer } => rpc.report_tcp_disconnect(*version, *peer),
                Notification::ServerOnline { id, bind_to } => rpc.server_online(*id, bind_to.clone()),
            };
            match result {
                Ok(()) => delivered_any = true,
                Err(_) => {
                    self.pending.push_front(notification);
                    break;
                }
            }
        }
        delivered_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FlakyRpc {
        fail_all: bool,
        received: Vec<Notification>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("rpc failed")]
    struct FlakyRpcError;

    impl CoordinatorRpc for FlakyRpc {
        type Error = FlakyRpcError;

        fn config_ack(&mut self, server: ServerId, version: u64) -> Result<(), Self::Error> {
            self.record(Notification::ConfigAck { server, version })
        }
        fn config_stable(&mut self, server: ServerId, version: u64) -> Result<(), Self::Error> {
            self.record(Notification::ConfigStable { server, version })
        }
        fn checkpoint_report_stable(&mut self, server: ServerId, configuration_version: u64) -> Result<(), Self::Error> {
            self.record(Notification::CheckpointStable { server, configuration_version })
        }
        fn transfer_go_live(&mut self, version: u64, transfer: TransferId) -> Result<(), Self::Error> {
            self.record(Notification::TransferGoLive { version, transfer })
        }
        fn transfer_complete(&mut self, version: u64, transfer: TransferId) -> Result<(), Self::Error> {
            self.record(Notification::TransferComplete { version, transfer })
        }
        fn report_tcp_disconnect(&mut self, version: u64, peer: ServerId) -> Result<(), Self::Error> {
            self.record(Notification::ReportTcpDisconnect { version, peer })
        }
        fn server_online(&mut self, id: ServerId, bind_to: Option<String>) -> Result<(), Self::Error> {
            self.record(Notification::ServerOnline { id, bind_to })
        }
    }

    impl FlakyRpc {
        fn record(&mut self, n: Notification) -> Result<(), FlakyRpcError> {
            if self.fail_all {
                return Err(FlakyRpcError);
            }
            self.received.push(n);
            Ok(())
        }
    }

    #[test]
    fn retries_until_delivered() {
        let mut q = NotifyQueue::new();
        q.push(Notification::ConfigAck { server: ServerId::new(1), version: 3 });
        let mut rpc = FlakyRpc { fail_all: true, received: Vec::new() };
        assert!(!q.drain(&mut rpc));
        assert_eq!(q.len(), 1);

        rpc.fail_all = false;
        assert!(q.drain(&mut rpc));
        assert!(q.is_empty());
        assert_eq!(rpc.received.len(), 1);
    }

    #[test]
    fn preserves_order_across_retries() {
        let mut q = NotifyQueue::new();
        q.push(Notification::ConfigAck { server: ServerId::new(1), version: 1 });
        q.push(Notification::ConfigStable { server: ServerId::new(1), version: 1 });
        let mut rpc = FlakyRpc { fail_all: false, received: Vec::new() };
        q.drain(&mut rpc);
        assert_eq!(
            rpc.received,
            vec![
                Notification::ConfigAck { server: ServerId::new(1), version: 1 },
                Notification::ConfigStable { server: ServerId::new(1), version: 1 },
            ]
        );
    }
}
