//! The log emitter.
//!
//! [`LogEmitter`] is the single entry point call sites use. It stamps each
//! event with the service name and the current time, then hands the same
//! record to every registered sink in registration order. Emission is
//! fire-and-forget: sink errors are swallowed here and reported by the sinks
//! themselves through their rate-limited warnings.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};

use parking_lot::RwLock;

use crate::{
    event::{Fields, LogEvent, LogType},
    level::Level,
    log_record::LogRecord,
    sink::LogSink,
};

struct Inner {
    service: Arc<str>,
    sinks: RwLock<Vec<Arc<dyn LogSink>>>,
    min_level: AtomicU8,
}

/// Cheaply cloneable handle shared by the HTTP layer and the health
/// reporter. Clones share sinks and level.
#[derive(Clone)]
pub struct LogEmitter {
    inner: Arc<Inner>,
}

impl LogEmitter {
    /// Emitter for `service` with no sinks and a minimum level of `info`.
    pub fn new(service: impl Into<Arc<str>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                service: service.into(),
                sinks: RwLock::new(Vec::new()),
                min_level: AtomicU8::new(u8::from(Level::Info)),
            }),
        }
    }

    pub fn service(&self) -> &str {
        &self.inner.service
    }

    /// Register a sink. Records reach sinks in the order they were added.
    pub fn add_sink(&self, sink: Arc<dyn LogSink>) {
        self.inner.sinks.write().push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.inner.sinks.read().len()
    }

    pub fn level(&self) -> Level {
        Level::try_from(self.inner.min_level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Change the minimum level for every clone of this emitter.
    pub fn set_level(&self, level: Level) {
        self.inner
            .min_level
            .store(u8::from(level), Ordering::Relaxed);
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.level()
    }

    /// Build and dispatch a record. Returns `false` when `level` is below
    /// the minimum and nothing was dispatched.
    pub fn emit(
        &self,
        level: Level,
        log_type: LogType,
        message: impl Into<String>,
        fields: Fields,
    ) -> bool {
        let mut event = LogEvent::new(level, log_type, message);
        event.fields = fields;
        self.log(event)
    }

    /// Dispatch a prepared event.
    pub fn log(&self, event: LogEvent) -> bool {
        if !self.is_enabled(event.level) {
            return false;
        }
        let record = LogRecord::stamp(Arc::clone(&self.inner.service), event);
        self.dispatch(record);
        true
    }

    fn dispatch(&self, record: LogRecord) {
        let sinks = self.inner.sinks.read();
        let Some((last, rest)) = sinks.split_last() else {
            return;
        };
        for sink in rest {
            let _ = sink.handle(record.clone());
        }
        let _ = last.handle(record);
    }

    /// Flush every sink; `true` only if all of them confirmed.
    pub fn flush(&self) -> bool {
        self.inner
            .sinks
            .read()
            .iter()
            .fold(true, |ok, sink| sink.flush() && ok)
    }
}

impl fmt::Debug for LogEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogEmitter")
            .field("service", &self.service())
            .field("level", &self.level())
            .field("sinks", &self.sink_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{event::fields, test_utils::CollectingSink};
    use rstest::{fixture, rstest};
    use serde_json::json;
    use static_assertions::assert_impl_all;

    #[fixture]
    fn collected() -> (LogEmitter, Arc<CollectingSink>) {
        let emitter = LogEmitter::new("express-app");
        let sink = Arc::new(CollectingSink::default());
        emitter.add_sink(sink.clone());
        (emitter, sink)
    }

    #[test]
    fn emitter_is_send_sync() {
        assert_impl_all!(LogEmitter: Send, Sync, Clone);
    }

    #[rstest]
    fn stamps_service_and_fields(collected: (LogEmitter, Arc<CollectingSink>)) {
        let (emitter, sink) = collected;
        let mut extra = Fields::new();
        extra.insert(fields::ROUTE.into(), json!("/"));
        assert!(emitter.emit(Level::Info, LogType::Route, "Home page accessed", extra));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.service(), "express-app");
        assert_eq!(record.level(), Level::Info);
        assert_eq!(record.log_type(), LogType::Route);
        assert_eq!(record.fields()[fields::ROUTE], "/");
    }

    #[rstest]
    #[case(Level::Trace, false)]
    #[case(Level::Debug, false)]
    #[case(Level::Info, true)]
    #[case(Level::Error, true)]
    fn filters_below_default_level(
        collected: (LogEmitter, Arc<CollectingSink>),
        #[case] level: Level,
        #[case] delivered: bool,
    ) {
        let (emitter, sink) = collected;
        assert_eq!(emitter.emit(level, LogType::System, "msg", Fields::new()), delivered);
        assert_eq!(sink.records().len(), usize::from(delivered));
    }

    #[rstest]
    fn set_level_applies_to_clones(collected: (LogEmitter, Arc<CollectingSink>)) {
        let (emitter, sink) = collected;
        let clone = emitter.clone();
        emitter.set_level(Level::Error);
        assert!(!clone.log(LogEvent::new(Level::Warn, LogType::System, "quiet")));
        assert!(clone.log(LogEvent::new(Level::Error, LogType::System, "loud")));
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn every_sink_receives_the_same_record() {
        let emitter = LogEmitter::new("svc");
        let first = Arc::new(CollectingSink::default());
        let second = Arc::new(CollectingSink::default());
        emitter.add_sink(first.clone());
        emitter.add_sink(second.clone());

        emitter.log(LogEvent::new(Level::Warn, LogType::System, "fan-out"));
        assert_eq!(first.records(), second.records());
        assert_eq!(first.records().len(), 1);
    }

    #[test]
    fn failing_sink_does_not_stop_later_sinks() {
        let emitter = LogEmitter::new("svc");
        let closed = Arc::new(CollectingSink::closed());
        let open = Arc::new(CollectingSink::default());
        emitter.add_sink(closed);
        emitter.add_sink(open.clone());

        assert!(emitter.log(LogEvent::new(Level::Info, LogType::System, "still here")));
        assert_eq!(open.records().len(), 1);
    }

    #[test]
    fn emitting_without_sinks_is_a_no_op() {
        let emitter = LogEmitter::new("svc");
        assert!(emitter.log(LogEvent::new(Level::Info, LogType::System, "void")));
        assert!(emitter.flush());
    }
}
