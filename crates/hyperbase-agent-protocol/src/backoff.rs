//! Exponential backoff for the daemon link's maintain loop (§4.4 "Sleep
//! with exponential backoff on errors (0 -> 100 ms -> 200 ms -> ... -> 20 s,
//! reset on success)").

use std::time::Duration;

const CAP_MS: u64 = 20_000;
const FIRST_STEP_MS: u64 = 100;

/// Tracks the delay to sleep before the next maintain iteration. The first
/// failure after a success sleeps 0; every failure after that doubles,
/// capped at 20s; any success resets to 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Backoff {
    next_ms: u64,
}

impl Backoff {
    #[must_use]
    pub const fn new() -> Self {
        Self { next_ms: 0 }
    }

    /// Call after a failed iteration. Returns the delay to sleep before
    /// retrying, then advances the state for next time.
    pub fn fail(&mut self) -> Duration {
        let delay = Duration::from_millis(self.next_ms);
        self.next_ms = if self.next_ms == 0 { FIRST_STEP_MS } else { (self.next_ms * 2).min(CAP_MS) };
        delay
    }

    /// Call after a successful iteration. Resets the delay to 0.
    pub fn reset(&mut self) {
        self.next_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalates_then_caps_at_twenty_seconds() {
        let mut b = Backoff::new();
        let delays: Vec<u64> = (0..10).map(|_| b.fail().as_millis() as u64).collect();
        assert_eq!(delays, vec![0, 100, 200, 400, 800, 1600, 3200, 6400, 12800, 20_000]);
        assert_eq!(b.fail().as_millis(), 20_000);
    }

    #[test]
    fn success_resets_to_zero() {
        let mut b = Backoff::new();
        b.fail();
        b.fail();
        b.reset();
        assert_eq!(b.fail().as_millis(), 0);
    }

    use proptest::prelude::*;

    proptest! {
        /// Any sequence of failures stays non-decreasing and never exceeds
        /// the 20s cap; a reset anywhere in the sequence always returns the
        /// very next delay to 0.
        #[test]
        fn failures_never_exceed_the_cap_and_reset_always_zeroes(
            fail_count in 0usize..40,
            reset_at in prop::option::of(0usize..40),
        ) {
            let mut b = Backoff::new();
            let mut last = 0u64;
            for i in 0..fail_count {
                if reset_at == Some(i) {
                    b.reset();
                    last = 0;
                }
                let delay = b.fail().as_millis() as u64;
                prop_assert!(delay >= last || last == CAP_MS);
                prop_assert!(delay <= CAP_MS);
                last = delay;
            }
        }
    }
}
