//! Resilient TCP stream sink.
//!
//! [`StreamSink`] serialises each [`LogRecord`](crate::log_record::LogRecord)
//! into a newline-terminated JSON frame and forwards it to a remote collector.
//! While the collector is unreachable, frames wait in a bounded buffer that
//! evicts the oldest frame on overflow. A single worker thread owns the TCP
//! connection, reconnects on a fixed interval, and drains the buffer in
//! order once connected. Observers can follow connection changes through
//! [`StreamSink::subscribe`].

mod buffer;
mod config;
mod reconnect;
mod serialise;
mod sink;
mod state;
mod transport;
mod worker;


pub use buffer::PendingBuffer;
pub use config::{
    DEFAULT_BUFFER_LENGTH, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_MAX_FRAME_SIZE,
    DEFAULT_PORT, DEFAULT_RECONNECT_INTERVAL, DEFAULT_WRITE_TIMEOUT, StreamSinkConfig,
};
pub use reconnect::ReconnectSchedule;
pub use sink::StreamSink;
pub use state::{ConnectionEvent, ConnectionState};
pub use transport::TcpTransport;
