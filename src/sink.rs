use std::any::Any;

use thiserror::Error;

use crate::log_record::LogRecord;

/// Why a sink refused a record. The emitter discards these; they exist so
/// sinks can be exercised directly in tests.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("sink queue is full")]
    QueueFull,
    #[error("sink is closed")]
    Closed,
    #[error("timed out waiting for sink queue")]
    Timeout,
}

/// Trait implemented by every log destination.
///
/// `LogSink` is `Send + Sync` so one sink can be shared by every clone of an
/// emitter. Implementations hand the record to their own worker and return
/// without waiting on I/O.
pub trait LogSink: Send + Sync {
    /// Dispatch a record for output.
    fn handle(&self, record: LogRecord) -> Result<(), SinkError>;

    /// Wait (bounded) for queued records to be written. Returns `false` when
    /// the sink could not confirm the flush.
    fn flush(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any;
}
