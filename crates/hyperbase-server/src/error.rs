//! Daemon shell error types.

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors the daemon shell surfaces. Semantic failures from the coordinator
/// or from an operation's predicate/funcall validation are reported as a
/// [`hyperbase_types::ResultCode`] in the wire reply, not through this type
/// (§7: "inside the daemon link, transport errors are silent and retried;
/// only semantic errors from the coordinator surface"). This enum is for
/// failures the shell itself cannot recover from within one request.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("wire protocol error: {0}")]
    Wire(#[from] hyperbase_wire::WireError),

    #[error("auth wallet token is malformed: {0}")]
    Token(#[from] hyperbase_crypto::wallet::TokenCodecError),

    #[error("storage engine error: {0}")]
    Storage(String),

    #[error("chain replication error: {0}")]
    Replication(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("TLS error: {0}")]
    Tls(String),
}
