//! Errors surfaced by the daemon-side coordinator link.
//!
//! §7 "Inside the daemon link, transport errors are silent and retried;
//! only semantic errors from the coordinator surface." [`LinkError`] is
//! reserved for the latter -- a follow that merely failed to poll this
//! iteration is not an error at this layer, it is a reason to reissue and
//! back off.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// The bytes a `config` follow delivered did not decode as a
    /// [`hyperbase_types::Configuration`]. §4.4 "refuse to apply if
    /// deserialization fails" -- the cached configuration is left as-is.
    #[error("configuration bytes failed to deserialize")]
    Deserialize,
}
