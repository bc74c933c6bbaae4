//! Condition-variable "follow" handles (§4.1, §4.4).
//!
//! A follow models a long-lived subscription on one of the coordinator's
//! broadcast condition variables: the daemon blocks inside the transport's
//! own wait, and `poll` returns whatever the follow has accumulated since
//! the last call (or `None` if nothing new arrived yet). A follow can fail
//! -- the underlying connection to the coordinator dropped -- in which case
//! the link must `reissue` it before it is trusted again.

use hyperbase_types::Configuration;

/// One subscription on a coordinator condition variable.
pub trait Follow {
    type Item;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the latest value delivered since the last call, if any.
    /// Never blocks past whatever budget the implementation's transport
    /// uses internally -- the maintain loop calls this once per iteration.
    fn poll(&mut self) -> Result<Option<Self::Item>, Self::Error>;

    /// Re-establishes the follow after a failed `poll`. Idempotent: safe to
    /// call on an already-live follow.
    fn reissue(&mut self) -> Result<(), Self::Error>;
}

/// A follow on the `config` condition variable, delivering raw
/// configuration-blob bytes (§6) as installed by the coordinator.
pub trait ConfigFollow: Follow<Item = Vec<u8>> {}
impl<T> ConfigFollow for T where T: Follow<Item = Vec<u8>> {}

/// The four checkpoint-side counters the daemon link mirrors locally
/// (§4.4 "four counters mirroring the coordinator's checkpoint values"):
/// the current checkpoint tick, and the highest checkpoint each of
/// `checkp`/`checkps`/`checkpgc` has advanced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckpointMirror {
    pub checkpoint: u64,
    pub checkp: u64,
    pub checkps: u64,
    pub checkpgc: u64,
}

/// A follow on the `checkpoint` condition variable.
pub trait CheckpointFollow: Follow<Item = CheckpointMirror> {}
impl<T> CheckpointFollow for T where T: Follow<Item = CheckpointMirror> {}

/// Decodes a `config` follow's raw bytes into a [`Configuration`]. Kept
/// separate from the trait so callers can unit-test follows without
/// depending on `hyperbase-wire`'s encoding.
pub fn decode_config_item(bytes: &[u8]) -> Result<Configuration, crate::error::LinkError> {
    hyperbase_wire::decode_configuration(bytes).map_err(|_| crate::error::LinkError::Deserialize)
}

/// An in-memory [`Follow`] for tests: values pushed with `push` are handed
/// out one at a time by `poll`; `fail_next` makes the next `poll` error so
/// tests can exercise `reissue`.
#[derive(Debug, Default)]
pub struct LoopbackFollow<T> {
    queue: std::collections::VecDeque<T>,
    fail_next: bool,
    reissued: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("loopback follow was asked to fail")]
pub struct LoopbackFollowError;

impl<T> LoopbackFollow<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { queue: std::collections::VecDeque::new(), fail_next: false, reissued: 0 }
    }

    pub fn push(&mut self, item: T) {
        self.queue.push_back(item);
    }

    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }

    #[must_use]
    pub const fn reissue_count(&self) -> u32 {
        self.reissued
    }
}

impl<T> Follow for LoopbackFollow<T> {
    type Item = T;
    type Error = LoopbackFollowError;

    fn poll(&mut self) -> Result<Option<T>, Self::Error> {
        if self.fail_next {
            self.fail_next = false;
            return Err(LoopbackFollowError);
        }
        Ok(self.queue.pop_front())
    }

    fn reissue(&mut self) -> Result<(), Self::Error> {
        self.reissued += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_pushed_items_in_order() {
        let mut f: LoopbackFollow<u64> = LoopbackFollow::new();
        f.push(1);
        f.push(2);
        assert_eq!(f.poll().unwrap(), Some(1));
        assert_eq!(f.poll().unwrap(), Some(2));
        assert_eq!(f.poll().unwrap(), None);
    }

    #[test]
    fn failed_poll_requires_reissue() {
        let mut f: LoopbackFollow<u64> = LoopbackFollow::new();
        f.fail_next();
        assert!(f.poll().is_err());
        f.reissue().unwrap();
        assert_eq!(f.reissue_count(), 1);
        assert_eq!(f.poll().unwrap(), None);
    }
}
