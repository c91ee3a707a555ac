//! Fixed-interval reconnection schedule used by the stream worker.

use std::time::{Duration, Instant};

/// Tracks when the next connection attempt is due.
///
/// A fresh schedule is due immediately. Every failure (a refused connect or
/// a dropped connection) pushes the next attempt one interval into the
/// future; there is no growth, jitter, or give-up deadline. A drop found by
/// the idle probe is recorded at the start of the idle wait, so the retry
/// follows the real close by at most one interval.
#[derive(Debug)]
pub struct ReconnectSchedule {
    interval: Duration,
    next_attempt: Option<Instant>,
    failures: u64,
}

impl ReconnectSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_attempt: None,
            failures: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_attempt.is_none_or(|at| now >= at)
    }

    /// Time left until the next attempt; zero when already due.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_attempt
            .map_or(Duration::ZERO, |at| at.saturating_duration_since(now))
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.failures = self.failures.saturating_add(1);
        self.next_attempt = Some(now + self.interval);
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.next_attempt = None;
    }

    /// Failures since the last successful connection.
    pub fn consecutive_failures(&self) -> u64 {
        self.failures
    }
}
