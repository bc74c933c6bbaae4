//! Client-visible error types (§7).
//!
//! Every pending op carries at most one status; the first non-success
//! terminates it. A [`ClientError`] additionally records where that
//! status was raised via a `#[track_caller]` location, for user-fault
//! diagnostics.

use std::panic::Location;

use hyperbase_types::ResultCode;

/// A terminal status for a pending op, with the call site that raised it.
#[derive(Debug, Clone, Copy)]
pub struct ClientError {
    pub code: ResultCode,
    pub file: &'static str,
    pub line: u32,
}

impl ClientError {
    #[track_caller]
    #[must_use]
    pub fn new(code: ResultCode) -> Self {
        let loc = Location::caller();
        Self { code, file: loc.file(), line: loc.line() }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} at {}:{}", self.code, self.file, self.line)
    }
}

impl std::error::Error for ClientError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("operation timed out")]
    Timeout,
    #[error("transport was interrupted")]
    Interrupted,
    #[error("remote peer disconnected")]
    Disconnected,
    #[error("i/o failure")]
    Io,
}
