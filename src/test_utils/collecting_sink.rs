//! A sink that accumulates records in memory for test assertions.

use std::{any::Any, sync::Arc};

use parking_lot::Mutex;

use crate::{
    log_record::LogRecord,
    sink::{LogSink, SinkError},
};

/// Sink that stores every record it receives for later inspection.
#[derive(Clone, Default)]
pub struct CollectingSink {
    records: Arc<Mutex<Vec<LogRecord>>>,
    closed: bool,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every record with [`SinkError::Closed`].
    pub fn closed() -> Self {
        Self {
            closed: true,
            ..Self::default()
        }
    }

    /// Snapshot of all records received so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for CollectingSink {
    fn handle(&self, record: LogRecord) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        self.records.lock().push(record);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
