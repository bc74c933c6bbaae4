//! The per-daemon coordinator link (§4.4): one `CoordinatorLink` per
//! daemon process, owning a cached [`Configuration`], a checkpoint mirror,
//! the outbound notification queue and its backoff.
//!
//! This mirrors the shape of `hyperbase-client`'s `Client`: a synchronous
//! struct whose only suspension point is handed to it by the caller (here,
//! the follows' own `poll`), so the owning daemon decides how the
//! maintain loop is actually scheduled -- on its own thread, in an event
//! loop, wherever.

use std::time::Duration;

use hyperbase_types::{Configuration, ServerId, ServerState};

use crate::backoff::Backoff;
use crate::error::LinkError;
use crate::follow::{CheckpointFollow, CheckpointMirror, ConfigFollow, decode_config_item};
use crate::rpc::{CoordinatorRpc, Notification, NotifyQueue};

/// What one `maintain` iteration asks the owning daemon to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintainOutcome {
    /// A new configuration was installed into the cache; the daemon shell
    /// should install it into its own data plane too (§4.4 "return true
    /// from the maintain step so the owning daemon installs the
    /// configuration").
    InstallConfiguration(Configuration),
    /// The checkpoint mirror advanced; the daemon shell should observe it
    /// (§4.4 "return false to force the main thread to observe").
    CheckpointAdvanced(CheckpointMirror),
    /// Neither follow delivered anything new this iteration.
    Idle,
}

/// The daemon-side coordinator link.
pub struct CoordinatorLink {
    self_id: ServerId,
    configuration: Option<Configuration>,
    checkpoint: CheckpointMirror,
    notifications: NotifyQueue,
    backoff: Backoff,
    config_follow_failed: bool,
    checkpoint_follow_failed: bool,
}

impl CoordinatorLink {
    #[must_use]
    pub fn new(self_id: ServerId) -> Self {
        Self {
            self_id,
            configuration: None,
            checkpoint: CheckpointMirror::default(),
            notifications: NotifyQueue::new(),
            backoff: Backoff::new(),
            config_follow_failed: false,
            checkpoint_follow_failed: false,
        }
    }

    #[must_use]
    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }

    #[must_use]
    pub const fn checkpoint_mirror(&self) -> CheckpointMirror {
        self.checkpoint
    }

    /// Queues an outbound notification for delivery on the next `maintain`
    /// call. Called by the data plane when a local event occurs (a
    /// configuration was installed, transfers converged, storage
    /// acknowledged a checkpoint, a peer connection broke, ...).
    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// One iteration of §4.4's loop: ensure both follows are live, poll
    /// each, act on whatever arrived, and drain the outbound queue. Returns
    /// the delay the caller should sleep before the next iteration
    /// (backoff on failure, zero on success) alongside what happened.
    pub fn maintain<C, K, R>(
        &mut self,
        config_follow: &mut C,
        checkpoint_follow: &mut K,
        rpc: &mut R,
    ) -> (Duration, Result<MaintainOutcome, LinkError>)
    where
        C: ConfigFollow,
        K: CheckpointFollow,
        R: CoordinatorRpc,
    {
        if self.config_follow_failed {
            self.config_follow_failed = config_follow.reissue().is_err();
        }
        if self.checkpoint_follow_failed {
            self.checkpoint_follow_failed = checkpoint_follow.reissue().is_err();
        }

        self.notifications.drain(rpc);

        match config_follow.poll() {
            Err(_) => {
                self.config_follow_failed = true;
                return (self.backoff.fail(), Ok(MaintainOutcome::Idle));
            }
            Ok(Some(bytes)) => {
                let outcome = self.apply_config_bytes(&bytes);
                self.backoff.reset();
                return (Duration::ZERO, outcome);
            }
            Ok(None) => {}
        }

        match checkpoint_follow.poll() {
            Err(_) => {
                self.checkpoint_follow_failed = true;
                (self.backoff.fail(), Ok(MaintainOutcome::Idle))
            }
            Ok(Some(mirror)) => {
                self.checkpoint = mirror;
                self.backoff.reset();
                (Duration::ZERO, Ok(MaintainOutcome::CheckpointAdvanced(mirror)))
            }
            Ok(None) => {
                self.backoff.reset();
                (Duration::ZERO, Ok(MaintainOutcome::Idle))
            }
        }
    }

    fn apply_config_bytes(&mut self, bytes: &[u8]) -> Result<MaintainOutcome, LinkError> {
        let config = decode_config_item(bytes)?;
        let still_not_available =
            config.server(self.self_id).is_some_and(|s| s.state == ServerState::NotAvailable);
        if still_not_available {
            // §4.4 "retransmit a `server_online` defended call and continue" --
            // the daemon believes it is up; the cache is not replaced so a
            // later correct configuration is not shadowed by this stale one.
            // Queued rather than called inline so it rides the same
            // idempotent-retry path as every other outbound notification.
            self.notifications.push(Notification::ServerOnline { id: self.self_id, bind_to: None });
            return Ok(MaintainOutcome::Idle);
        }
        let version = config.version;
        self.configuration = Some(config.clone());
        self.notifications.push(Notification::ConfigAck { server: self.self_id, version });
        Ok(MaintainOutcome::InstallConfiguration(config))
    }
}
