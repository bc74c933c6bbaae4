#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("buffer too short: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
    #[error("unknown message type byte {0:#x}")]
    UnknownMessageType(u8),
    #[error("body failed to deserialize: {0}")]
    BodyDecode(#[from] postcard::Error),
    #[error("container byte layout was malformed")]
    MalformedContainer,
}
