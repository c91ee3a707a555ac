//! Structured JSON logging for a small HTTP service.
//!
//! A [`LogEmitter`] stamps [`LogEvent`]s with the service name and time and
//! fans them out to sinks: a [`ConsoleSink`] writing one JSON line per record
//! and a [`StreamSink`] forwarding the same lines to a TCP collector that may
//! come and go. A [`HealthReporter`] adds periodic process health records.
//! With the `server` feature, [`http`] provides the request layer that
//! produces request, route, and error records.

pub mod builders;
pub mod config;
pub mod console_sink;
pub mod emitter;
pub mod event;
pub mod formatter;
pub mod health;
pub mod level;
pub mod log_record;
pub mod rate_limited_warner;
pub mod sink;
pub mod stream_sink;

#[cfg(feature = "server")]
pub mod http;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use builders::{ConsoleSinkBuilder, SinkBuildError, SinkBuilderTrait, StreamSinkBuilder};
pub use config::{AppConfig, CollectorConfig, ConfigError};
pub use console_sink::{ConsoleSink, ConsoleSinkConfig, OverflowPolicy};
pub use emitter::LogEmitter;
pub use event::{Fields, HealthSnapshot, LogEvent, LogType, MemoryUsage, RequestMeta, fields};
pub use formatter::{FormatError, JsonFormatter, RecordFormatter, SharedFormatter};
pub use health::{HealthReporter, MetricsSampler, ProcessSampler};
pub use level::{Level, ParseLevelError};
pub use log_record::LogRecord;
pub use sink::{LogSink, SinkError};
pub use stream_sink::{
    ConnectionEvent, ConnectionState, StreamSink, StreamSinkConfig, TcpTransport,
};
