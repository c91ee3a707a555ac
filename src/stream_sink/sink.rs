//! Public sink type exported by the crate.

use std::{any::Any, fmt, io, sync::Arc, thread::JoinHandle, time::Duration};

use crossbeam_channel::{Receiver, Sender, bounded};
use log::warn;
use parking_lot::Mutex;

use crate::{
    formatter::SharedFormatter,
    log_record::LogRecord,
    sink::{LogSink, SinkError},
};

use super::{
    config::StreamSinkConfig,
    serialise::encode_frame,
    state::{ConnectionEvent, ConnectionState},
    transport::TcpTransport,
    worker::{Shared, SinkCommand, spawn_worker},
};

/// Sink forwarding newline-delimited JSON records to a TCP collector.
///
/// `handle` never blocks on the network: the record is encoded on the
/// caller's thread and appended to the pending buffer. The connection is
/// established in the background as soon as the sink is created, so a
/// collector that is down at startup only delays delivery.
pub struct StreamSink {
    shared: Arc<Shared>,
    tx: Mutex<Option<Sender<SinkCommand>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    formatter: SharedFormatter,
    transport: TcpTransport,
    max_frame_size: usize,
    flush_timeout: Duration,
}

impl StreamSink {
    /// Sink for `host:port` with every other setting at its default.
    pub fn new(host: impl Into<String>, port: u16) -> io::Result<Self> {
        Self::with_config(StreamSinkConfig::default().with_transport(TcpTransport::new(host, port)))
    }

    /// Spawn the worker described by `config`. Fails only if the worker
    /// thread cannot be started.
    pub fn with_config(config: StreamSinkConfig) -> io::Result<Self> {
        let shared = Arc::new(Shared::new(&config));
        let (tx, handle) = spawn_worker(&config, Arc::clone(&shared))?;
        Ok(Self {
            shared,
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
            formatter: config.formatter,
            transport: config.transport,
            max_frame_size: config.max_frame_size,
            flush_timeout: config.flush_timeout,
        })
    }

    /// Receive connection events from now on.
    ///
    /// Events are delivered without blocking the sink; a subscriber that
    /// stops reading misses events once its queue is full.
    pub fn subscribe(&self) -> Receiver<ConnectionEvent> {
        self.shared.observers.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.load()
    }

    pub fn transport(&self) -> &TcpTransport {
        &self.transport
    }

    /// Frames waiting for delivery.
    pub fn buffered_len(&self) -> usize {
        self.shared.buffer.lock().len()
    }

    /// Records lost to buffer eviction, oversize frames, or use after close.
    pub fn dropped_count(&self) -> u64 {
        self.shared.warner.total_dropped()
    }

    fn sender(&self) -> Option<Sender<SinkCommand>> {
        self.tx.lock().as_ref().cloned()
    }

    fn note_drop(&self, reason: &str) {
        self.shared.warner.record_drop();
        self.shared.warner.warn_if_due(|count| {
            warn!("StreamSink {reason}; dropped {count} records");
        });
    }

    /// Deliver what can be delivered, stop the worker, and join it.
    ///
    /// Frames still buffered because the collector is unreachable are
    /// discarded. Further records are rejected with [`SinkError::Closed`].
    pub fn close(&self) {
        let Some(tx) = self.tx.lock().take() else {
            return;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx
            .send_timeout(SinkCommand::Shutdown(ack_tx), self.flush_timeout)
            .is_ok()
            && ack_rx.recv_timeout(self.flush_timeout).is_err()
        {
            warn!("StreamSink: worker did not acknowledge shutdown in time");
        }
        drop(tx);
        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            warn!("StreamSink: worker thread panicked");
        }
        self.shared.observers.clear();
        self.shared.warner.flush(|count| {
            warn!("StreamSink dropped {count} records before shutdown");
        });
    }
}

impl LogSink for StreamSink {
    fn handle(&self, record: LogRecord) -> Result<(), SinkError> {
        let Some(tx) = self.sender() else {
            self.note_drop("is closed");
            return Err(SinkError::Closed);
        };
        let frame = match encode_frame(&self.formatter, &record, self.max_frame_size) {
            Ok(frame) => frame,
            Err(err) => {
                self.note_drop(&err.to_string());
                return Ok(());
            }
        };
        let evicted = self.shared.buffer.lock().push(frame);
        if evicted.is_some() {
            self.shared.note_evictions(1);
        }
        // Frames pushed while disconnected are drained by the worker right
        // after it connects, so only a connected worker needs waking.
        if self.shared.state.load() == ConnectionState::Connected {
            let _ = tx.try_send(SinkCommand::Wake);
        }
        Ok(())
    }

    fn flush(&self) -> bool {
        let Some(tx) = self.sender() else {
            return false;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx
            .send_timeout(SinkCommand::Flush(ack_tx), self.flush_timeout)
            .is_err()
        {
            return false;
        }
        ack_rx.recv_timeout(self.flush_timeout).unwrap_or(false)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for StreamSink {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for StreamSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSink")
            .field("transport", &self.transport)
            .field("state", &self.state())
            .field("buffered", &self.buffered_len())
            .finish()
    }
}
