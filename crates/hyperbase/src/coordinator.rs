//! The coordinator host: wraps a [`ReplicatedLog`] around
//! [`hyperbase_kernel::kernel::apply_command`] and exposes the cluster's
//! control-plane surface (§4.1) as typed methods instead of a bare
//! `Command` enum.
//!
//! The struct here owns nothing the kernel itself doesn't already own
//! (the `ReplicatedLog` implementation, supplied by the caller, is the
//! only infrastructure dependency), and every method is a thin `Command`
//! construction plus one `propose` call.

use hyperbase_kernel::command::{NewSpace, SpaceBuildError, SpaceBuilder};
use hyperbase_kernel::kernel::CommandOutcome;
use hyperbase_kernel::runtime::ReplicatedLog;
use hyperbase_kernel::Command;
use hyperbase_types::{IndexId, ServerId, TransferId};

use crate::error::{HyperbaseError, Result};

/// A handle to the coordinator state machine, driven by whatever
/// replicated-log service `L` implements -- the log itself is an external
/// collaborator, out of scope for this crate.
pub struct Coordinator<L> {
    log: L,
}

impl<L: ReplicatedLog> Coordinator<L> {
    #[must_use]
    pub fn new(log: L) -> Self {
        Self { log }
    }

    fn propose(&mut self, cmd: Command) -> Result<CommandOutcome> {
        self.log.propose(cmd).map_err(|e| HyperbaseError::Log(e.to_string()))
    }

    /// Submits an arbitrary command. Named convenience methods below cover
    /// the common cluster-administration paths; this is the escape hatch
    /// for the rest of [`Command`]'s variants (periodic maintenance,
    /// transfer lifecycle, checkpoint bookkeeping, ...).
    pub fn submit(&mut self, cmd: Command) -> Result<CommandOutcome> {
        self.propose(cmd)
    }

    pub fn init_cluster(&mut self, cluster_token: u64) -> Result<CommandOutcome> {
        self.propose(Command::Init { cluster_token })
    }

    pub fn set_read_only(&mut self, enabled: bool) -> Result<CommandOutcome> {
        self.propose(Command::ReadOnly(enabled))
    }

    pub fn register_server(&mut self, id: ServerId, bind_to: impl Into<String>) -> Result<CommandOutcome> {
        self.propose(Command::ServerRegister { id, bind_to: bind_to.into() })
    }

    pub fn server_online(&mut self, id: ServerId, bind_to: Option<String>) -> Result<CommandOutcome> {
        self.propose(Command::ServerOnline { id, bind_to })
    }

    pub fn server_offline(&mut self, id: ServerId) -> Result<CommandOutcome> {
        self.propose(Command::ServerOffline { id })
    }

    pub fn server_shutdown(&mut self, id: ServerId) -> Result<CommandOutcome> {
        self.propose(Command::ServerShutdown { id })
    }

    pub fn server_forget(&mut self, id: ServerId) -> Result<CommandOutcome> {
        self.propose(Command::ServerForget { id })
    }

    pub fn report_disconnect(&mut self, server: ServerId, version: u64) -> Result<CommandOutcome> {
        self.propose(Command::ReportDisconnect { server, version, reason: None })
    }

    /// Builds and submits `SpaceAdd` from a [`SpaceBuilder`].
    pub fn add_space(&mut self, builder: SpaceBuilder) -> std::result::Result<Result<CommandOutcome>, SpaceBuildError> {
        let space: NewSpace = builder.build()?;
        Ok(self.propose(Command::SpaceAdd { space }))
    }

    pub fn remove_space(&mut self, name: impl Into<String>) -> Result<CommandOutcome> {
        self.propose(Command::SpaceRm { name: name.into() })
    }

    pub fn add_index(&mut self, space: impl Into<String>, attr: usize) -> Result<CommandOutcome> {
        self.propose(Command::IndexAdd { space: space.into(), attr })
    }

    pub fn remove_index(&mut self, space: impl Into<String>, index: IndexId) -> Result<CommandOutcome> {
        self.propose(Command::IndexRm { space: space.into(), index })
    }

    pub fn transfer_go_live(&mut self, version: u64, transfer: TransferId) -> Result<CommandOutcome> {
        self.propose(Command::TransferGoLive { version, transfer })
    }

    pub fn transfer_complete(&mut self, version: u64, transfer: TransferId) -> Result<CommandOutcome> {
        self.propose(Command::TransferComplete { version, transfer })
    }

    /// Drives the periodic maintenance pass (placement convergence,
    /// checkpoint windows) -- a daemon-external scheduler is expected to
    /// call this on the interval `hyperbase_config::CoordinatorConfig`
    /// names.
    pub fn tick(&mut self) -> Result<CommandOutcome> {
        self.propose(Command::Periodic)
    }

    pub fn alarm(&mut self) -> Result<CommandOutcome> {
        self.propose(Command::Alarm)
    }

    /// Acknowledges a client's `config` poll (§4.1 `ConfigGet`); the
    /// configuration blob itself is read from `State::to_configuration`
    /// by whatever holds the state directly (the replicated-log host),
    /// not through this facade -- `Coordinator` only ever sees
    /// [`CommandOutcome`], never the state it was computed from.
    pub fn acknowledge_config_poll(&mut self) -> Result<CommandOutcome> {
        self.propose(Command::ConfigGet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperbase_kernel::state::State;
    use hyperbase_types::ResultCode;

    #[derive(Default)]
    struct InlineLog {
        state: State,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("inline log never fails")]
    struct Never;

    impl ReplicatedLog for InlineLog {
        type Error = Never;
        fn propose(&mut self, cmd: Command) -> std::result::Result<CommandOutcome, Self::Error> {
            let (state, outcome) = hyperbase_kernel::kernel::apply_command(std::mem::take(&mut self.state), cmd);
            self.state = state;
            Ok(outcome)
        }
    }

    #[test]
    fn init_then_register_server_succeeds() {
        let mut coordinator = Coordinator::new(InlineLog::default());
        let init = coordinator.init_cluster(7).unwrap();
        assert_eq!(init.code, ResultCode::Success);
        let reg = coordinator.register_server(ServerId::new(1), "127.0.0.1:2000").unwrap();
        assert_eq!(reg.code, ResultCode::Success);
    }

    #[test]
    fn add_space_builds_and_submits() {
        let mut coordinator = Coordinator::new(InlineLog::default());
        coordinator.init_cluster(1).unwrap();
        coordinator.register_server(ServerId::new(1), "a:1").unwrap();
        coordinator.server_online(ServerId::new(1), None).unwrap();
        let builder = SpaceBuilder::new("kv")
            .attribute("k", hyperbase_types::DataType::String)
            .unwrap()
            .attribute("v", hyperbase_types::DataType::String)
            .unwrap();
        let outcome = coordinator.add_space(builder).unwrap().unwrap();
        assert_eq!(outcome.code, ResultCode::Success);
    }
}
