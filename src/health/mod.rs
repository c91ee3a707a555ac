//! Periodic health reporting.
//!
//! [`HealthReporter::spawn`] starts a thread that emits one health record
//! per period. Deadlines are computed from the start instant (`start +
//! n * period`), so a slow sample delays one firing without shifting the
//! ones after it. Dropping or stopping the reporter joins the thread.

mod sample;

use std::{
    io,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::warn;
use parking_lot::Mutex;

use crate::{emitter::LogEmitter, event::LogEvent};

pub use sample::{
    MetricsSampler, ProcessSampler, hostname, mark_process_start, parse_proc_status,
    resolve_hostname, runtime_version, uptime_seconds,
};

/// Default gap between health records.
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(2);

/// Cancellation handle for the health thread.
pub struct HealthReporter {
    stop_tx: Mutex<Option<Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    period: Duration,
}

impl HealthReporter {
    /// Start emitting health records through `emitter` every `period`.
    ///
    /// The first record is emitted one period after the call. A zero
    /// `period` is rejected.
    pub fn spawn<S>(
        emitter: LogEmitter,
        period: Duration,
        sampler: S,
        environment: impl Into<String>,
    ) -> io::Result<Self>
    where
        S: MetricsSampler,
    {
        if period.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "health period must be greater than zero",
            ));
        }
        let environment = environment.into();
        let (stop_tx, stop_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("relaylog-health".into())
            .spawn(move || run(emitter, period, sampler, environment, stop_rx))?;
        Ok(Self {
            stop_tx: Mutex::new(Some(stop_tx)),
            handle: Mutex::new(Some(handle)),
            period,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stop the timer and wait for the thread. No record is emitted after
    /// this returns. Idempotent.
    pub fn stop(&self) {
        if let Some(tx) = self.stop_tx.lock().take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            warn!("HealthReporter: worker thread panicked");
        }
    }
}

impl Drop for HealthReporter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for HealthReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthReporter")
            .field("period", &self.period)
            .finish()
    }
}

fn run<S: MetricsSampler>(
    emitter: LogEmitter,
    period: Duration,
    mut sampler: S,
    environment: String,
    stop_rx: Receiver<()>,
) {
    let start = Instant::now();
    let mut tick: u32 = 1;
    loop {
        let deadline = start + period.saturating_mul(tick);
        match stop_rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
        emitter.log(LogEvent::health(&sampler.sample(&environment)));
        tick = next_tick(start, period, tick, Instant::now());
    }
}

/// Index of the next deadline still in the future, skipping any that were
/// missed while sampling.
fn next_tick(start: Instant, period: Duration, tick: u32, now: Instant) -> u32 {
    let mut next = tick.saturating_add(1);
    while next < u32::MAX && start + period.saturating_mul(next) <= now {
        next += 1;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_tick_advances_by_one_when_on_time() {
        let start = Instant::now();
        let period = Duration::from_millis(100);
        let now = start + Duration::from_millis(150);
        assert_eq!(next_tick(start, period, 1, now), 2);
    }

    #[test]
    fn next_tick_skips_missed_deadlines() {
        let start = Instant::now();
        let period = Duration::from_millis(100);
        let now = start + Duration::from_millis(450);
        assert_eq!(next_tick(start, period, 1, now), 5);
    }

    #[test]
    fn zero_period_is_rejected() {
        let err = HealthReporter::spawn(
            LogEmitter::new("svc"),
            Duration::ZERO,
            ProcessSampler::new(),
            "test",
        )
        .expect_err("zero period must fail");
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
