//! The boundary between the pure kernel and everything that isn't.
//!
//! `alarm()`'s period is a command the shell delivers, not a clock the
//! kernel reads -- so the only clock dependency left is "how often does the
//! shell call `alarm`", which lives here, outside the kernel.

use std::time::Duration;

use crate::command::Command;
use crate::kernel::CommandOutcome;

/// Reads wall-clock time for the shell's own scheduling. The kernel itself
/// never calls this -- see [`Command::Alarm`].
pub trait Clock: Send + Sync {
    fn now_unix_seconds(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_seconds(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }
}

/// The replicated-log service the coordinator runs inside. Proposing a
/// command commits it to the log and applies it on every replica in the
/// same order; this crate only models the single call that matters to
/// everything above it. The replication mechanism itself is out of scope
/// -- implementations live in the daemon shell.
pub trait ReplicatedLog {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Commits `cmd` to the log and returns its outcome once applied.
    fn propose(&mut self, cmd: Command) -> Result<CommandOutcome, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_reports_a_plausible_unix_time() {
        let clock = SystemClock;
        // 2020-01-01T00:00:00Z, a loose sanity floor well below "now".
        assert!(clock.now_unix_seconds() > 1_577_836_800);
    }
}
