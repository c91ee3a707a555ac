//! Configuration consumed by [`StreamSink`](super::StreamSink).
//!
//! `StreamSinkBuilder` validates these values before handing them to the
//! sink; constructing a config by hand skips that validation.

use std::time::Duration;

use crate::{formatter::SharedFormatter, rate_limited_warner::DEFAULT_WARN_INTERVAL};

use super::transport::TcpTransport;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5000;
/// Fixed delay between reconnection attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(1000);
/// Maximum number of frames held while disconnected.
pub const DEFAULT_BUFFER_LENGTH: usize = 10_000;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
/// Largest encoded frame (in bytes, newline included) the sink will send.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1 << 20; // 1 MiB
/// How long `flush` and `close` wait for the worker.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct StreamSinkConfig {
    pub transport: TcpTransport,
    pub reconnect_interval: Duration,
    pub buffer_length: usize,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub flush_timeout: Duration,
    pub max_frame_size: usize,
    pub warn_interval: Duration,
    pub formatter: SharedFormatter,
}

impl Default for StreamSinkConfig {
    fn default() -> Self {
        Self {
            transport: TcpTransport::new(DEFAULT_HOST, DEFAULT_PORT),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            buffer_length: DEFAULT_BUFFER_LENGTH,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            warn_interval: DEFAULT_WARN_INTERVAL,
            formatter: SharedFormatter::default(),
        }
    }
}

impl StreamSinkConfig {
    pub fn with_transport(mut self, transport: TcpTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    pub fn with_buffer_length(mut self, length: usize) -> Self {
        self.buffer_length = length;
        self
    }
}
