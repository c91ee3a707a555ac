//! Formatting and fan-out cost per record.

use std::{any::Any, hint::black_box, sync::Arc};

use criterion::{Criterion, criterion_group, criterion_main};
use relaylog::{
    JsonFormatter, LogEmitter, LogEvent, LogRecord, LogSink, RecordFormatter, RequestMeta,
    SinkError,
};

/// Sink that discards every record.
struct NullSink;

impl LogSink for NullSink {
    fn handle(&self, record: LogRecord) -> Result<(), SinkError> {
        black_box(record);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn meta() -> RequestMeta {
    RequestMeta::new("GET", "/api/users?page=2")
        .with_ip("127.0.0.1")
        .with_user_agent("criterion")
}

fn bench_format(c: &mut Criterion) {
    let record = LogRecord::stamp(Arc::from("express-app"), LogEvent::request(&meta()));
    c.bench_function("json_format_request", |b| {
        b.iter(|| JsonFormatter.format(black_box(&record)))
    });
}

fn bench_emit(c: &mut Criterion) {
    let emitter = LogEmitter::new("express-app");
    emitter.add_sink(Arc::new(NullSink));
    emitter.add_sink(Arc::new(NullSink));
    let meta = meta();
    c.bench_function("emit_to_two_sinks", |b| {
        b.iter(|| emitter.log(LogEvent::api(&meta, "/api/users", "fetch_users", "Fetching users list")))
    });
}

criterion_group!(benches, bench_format, bench_emit);
criterion_main!(benches);
