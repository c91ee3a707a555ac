//! Fixtures providing `(SharedBuf, ConsoleSink)` pairs and emitters wired to
//! in-memory sinks, so tests never touch stdout.

#![allow(dead_code)]

use std::{
    net::{SocketAddr, TcpListener},
    sync::Arc,
    time::Duration,
};

use relaylog::{
    ConsoleSink, ConsoleSinkConfig, LogEmitter, OverflowPolicy, SharedFormatter,
    test_utils::CollectingSink,
};
use rstest::fixture;

use super::shared_buffer::SharedBuf;

/// A console sink writing into a fresh in-memory buffer.
#[fixture]
pub fn console_pair() -> (SharedBuf, ConsoleSink) {
    let buffer = SharedBuf::default();
    let sink = ConsoleSink::new(buffer.clone(), SharedFormatter::default());
    (buffer, sink)
}

/// A console sink with a single-slot channel that waits briefly before
/// dropping, for overflow tests.
#[fixture]
pub fn tiny_console_pair(
    #[default(Duration::from_secs(5))] warn_interval: Duration,
) -> (SharedBuf, ConsoleSink) {
    let buffer = SharedBuf::default();
    let config = ConsoleSinkConfig::default()
        .with_capacity(1)
        .with_overflow(OverflowPolicy::Timeout(Duration::from_millis(50)))
        .with_warn_interval(warn_interval);
    let sink = ConsoleSink::with_config(buffer.clone(), SharedFormatter::default(), config);
    (buffer, sink)
}

/// An emitter for `express-app` feeding one collecting sink.
#[fixture]
pub fn collecting_emitter() -> (LogEmitter, Arc<CollectingSink>) {
    let emitter = LogEmitter::new("express-app");
    let sink = Arc::new(CollectingSink::new());
    emitter.add_sink(sink.clone());
    (emitter, sink)
}

/// A loopback listener standing in for the log collector.
#[fixture]
pub fn collector() -> TcpListener {
    TcpListener::bind(("127.0.0.1", 0)).expect("bind collector listener")
}

pub fn local_addr(listener: &TcpListener) -> SocketAddr {
    listener.local_addr().expect("listener has address")
}
