//! Facade-level errors: wires together the failure modes of the crates
//! this glue layer composes.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HyperbaseError>;

#[derive(Debug, Error)]
pub enum HyperbaseError {
    #[error("replicated log error: {0}")]
    Log(String),

    #[error("daemon shell error: {0}")]
    Server(#[from] hyperbase_server::ServerError),

    #[error("coordinator link error: {0}")]
    Link(#[from] hyperbase_agent_protocol::LinkError),

    #[error("configuration error: {0}")]
    Config(#[from] hyperbase_config::ConfigError),
}
