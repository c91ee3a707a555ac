//! Console sink.
//!
//! [`ConsoleSink`] writes one formatted line per record to a stream (stdout
//! unless told otherwise) from a background thread. Records travel over a
//! bounded channel so the caller never waits on terminal I/O; when the
//! channel is full the configured [`OverflowPolicy`] decides how long to
//! wait before dropping.

use std::{
    any::Any,
    io::{self, Write},
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError, bounded};
use log::warn;
use parking_lot::Mutex;

use crate::{
    formatter::SharedFormatter,
    log_record::LogRecord,
    rate_limited_warner::{DEFAULT_WARN_INTERVAL, RateLimitedWarner},
    sink::{LogSink, SinkError},
};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// What `handle` does when the channel is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop the record immediately.
    #[default]
    Drop,
    /// Wait up to the given duration for room, then drop.
    Timeout(Duration),
}

#[derive(Clone, Debug)]
pub struct ConsoleSinkConfig {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
    pub flush_timeout: Duration,
    pub warn_interval: Duration,
}

impl Default for ConsoleSinkConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHANNEL_CAPACITY,
            overflow: OverflowPolicy::default(),
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

impl ConsoleSinkConfig {
    /// Set the channel capacity; zero is raised to one.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn with_warn_interval(mut self, interval: Duration) -> Self {
        self.warn_interval = interval;
        self
    }
}

enum ConsoleCommand {
    Record(LogRecord),
    Flush(Sender<()>),
}

/// Sink writing one line per record to an `io::Write` stream.
///
/// The writer and formatter are moved into the worker thread, so producers
/// never lock the stream.
pub struct ConsoleSink {
    tx: Mutex<Option<Sender<ConsoleCommand>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    done_rx: Receiver<()>,
    config: ConsoleSinkConfig,
    warner: RateLimitedWarner,
}

impl ConsoleSink {
    /// Write JSON lines to `stdout`.
    pub fn stdout() -> Self {
        Self::new(io::stdout(), SharedFormatter::default())
    }

    /// Write JSON lines to `stderr`.
    pub fn stderr() -> Self {
        Self::new(io::stderr(), SharedFormatter::default())
    }

    pub fn new<W>(writer: W, formatter: SharedFormatter) -> Self
    where
        W: Write + Send + 'static,
    {
        Self::with_config(writer, formatter, ConsoleSinkConfig::default())
    }

    pub fn with_config<W>(writer: W, formatter: SharedFormatter, config: ConsoleSinkConfig) -> Self
    where
        W: Write + Send + 'static,
    {
        let (tx, rx) = bounded(config.capacity.max(1));
        let (done_tx, done_rx) = bounded(1);
        let handle = thread::spawn(move || {
            run_worker(writer, formatter, rx);
            let _ = done_tx.send(());
        });
        let warner = RateLimitedWarner::new(config.warn_interval);
        Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
            done_rx,
            config,
            warner,
        }
    }

    /// Number of records dropped because the channel was full or closed.
    pub fn dropped_count(&self) -> u64 {
        self.warner.total_dropped()
    }

    fn sender(&self) -> Option<Sender<ConsoleCommand>> {
        self.tx.lock().as_ref().cloned()
    }

    fn note_drop(&self, reason: &str) {
        self.warner.record_drop();
        self.warner.warn_if_due(|count| {
            warn!("ConsoleSink {reason}; dropped {count} records");
        });
    }

    /// Stop accepting records, drain the queue, and join the worker.
    pub fn close(&self) {
        // Dropping the only sender ends the worker's receive loop.
        self.tx.lock().take();
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if self
            .done_rx
            .recv_timeout(self.config.flush_timeout)
            .is_err()
        {
            warn!("ConsoleSink: worker thread did not shut down in time");
            return;
        }
        if handle.join().is_err() {
            warn!("ConsoleSink: worker thread panicked");
        }
        self.warner.flush(|count| {
            warn!("ConsoleSink dropped {count} records before shutdown");
        });
    }
}

fn run_worker<W: Write>(mut writer: W, formatter: SharedFormatter, rx: Receiver<ConsoleCommand>) {
    for command in rx {
        match command {
            ConsoleCommand::Record(record) => {
                let line = formatter.format_or_fallback(&record);
                if writeln!(writer, "{line}")
                    .and_then(|()| writer.flush())
                    .is_err()
                {
                    warn!("ConsoleSink write error");
                }
            }
            ConsoleCommand::Flush(ack) => {
                let _ = writer.flush();
                let _ = ack.send(());
            }
        }
    }
}

impl LogSink for ConsoleSink {
    fn handle(&self, record: LogRecord) -> Result<(), SinkError> {
        let Some(tx) = self.sender() else {
            self.note_drop("is closed");
            return Err(SinkError::Closed);
        };
        let command = ConsoleCommand::Record(record);
        let result = match self.config.overflow {
            OverflowPolicy::Drop => tx.try_send(command).map_err(|err| match err {
                TrySendError::Full(_) => SinkError::QueueFull,
                TrySendError::Disconnected(_) => SinkError::Closed,
            }),
            OverflowPolicy::Timeout(timeout) => {
                tx.send_timeout(command, timeout).map_err(|err| match err {
                    SendTimeoutError::Timeout(_) => SinkError::Timeout,
                    SendTimeoutError::Disconnected(_) => SinkError::Closed,
                })
            }
        };
        if let Err(err) = result {
            self.note_drop(&err.to_string());
        }
        result
    }

    fn flush(&self) -> bool {
        let Some(tx) = self.sender() else {
            return false;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx
            .send_timeout(ConsoleCommand::Flush(ack_tx), self.config.flush_timeout)
            .is_err()
        {
            return false;
        }
        ack_rx.recv_timeout(self.config.flush_timeout).is_ok()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for ConsoleSink {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("config", &self.config)
            .finish()
    }
}
