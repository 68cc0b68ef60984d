//! Reconnect backoff.
//!
//! Delays double after every wait, starting from a base. There is no
//! ceiling and no jitter: the attempt bound is what limits total time.
//! With a large `max_retries` the last waits get very long, so callers
//! with tight recovery budgets should keep the bound small or cancel the
//! reconnect.

use std::time::Duration;

/// Doubling delay sequence for one reconnect call.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    next: Duration,
}

impl Backoff {
    pub(crate) const fn new(base: Duration) -> Self {
        Self { next: base }
    }

    /// Returns the current delay and doubles it for next time.
    ///
    /// Saturates at [`Duration::MAX`] instead of overflowing.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = delay.saturating_mul(2);
        delay
    }
}
