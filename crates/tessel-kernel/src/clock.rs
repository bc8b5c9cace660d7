// SPDX-License-Identifier: MIT
//
// Tick deadlines for the run loop.
//
// Deadlines advance by whole intervals from the first one, so the frame
// rate doesn't drift with per-tick jitter. A loop that falls more than one
// interval behind skips the missed ticks instead of bursting to catch up.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    interval: Duration,
    next: Instant,
    ticks: u64,
}

impl Clock {
    /// The first tick is due at `now`.
    #[must_use]
    pub const fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next: now,
            ticks: 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks taken so far.
    #[inline]
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next
    }

    /// How long to wait for the next tick; zero when it's due.
    #[must_use]
    pub fn until_next(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Record a tick taken at `now` and schedule the next one.
    pub fn advance(&mut self, now: Instant) {
        self.ticks += 1;
        self.next += self.interval;
        if self.next <= now {
            self.next = now + self.interval;
        }
    }
}
