//! Worker thread driving the collector connection.
//!
//! The worker is the only owner of the TCP stream. Producers append frames
//! to the shared [`PendingBuffer`] and nudge the worker over a command
//! channel; the worker drains the buffer in order whenever it is connected.

use std::{
    collections::VecDeque,
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, warn};
use parking_lot::Mutex;

use crate::rate_limited_warner::RateLimitedWarner;

use super::{
    buffer::PendingBuffer,
    config::StreamSinkConfig,
    reconnect::ReconnectSchedule,
    state::{ConnectionEvent, ConnectionState, Observers, StateCell},
    transport::{self, Connection, TcpTransport},
};

const COMMAND_CAPACITY: usize = 64;

/// Commands processed by the worker thread.
#[derive(Debug)]
pub(super) enum SinkCommand {
    /// New frames are waiting in the buffer.
    Wake,
    /// Drain the buffer, then report whether it is empty.
    Flush(Sender<bool>),
    /// Drain what can be drained and exit.
    Shutdown(Sender<()>),
}

/// State shared by the sink handle and the worker.
pub(super) struct Shared {
    pub(super) buffer: Mutex<PendingBuffer>,
    pub(super) state: StateCell,
    pub(super) observers: Observers,
    pub(super) warner: RateLimitedWarner,
}

impl Shared {
    pub(super) fn new(config: &StreamSinkConfig) -> Self {
        Self {
            buffer: Mutex::new(PendingBuffer::new(config.buffer_length)),
            state: StateCell::new(),
            observers: Observers::default(),
            warner: RateLimitedWarner::new(config.warn_interval),
        }
    }

    pub(super) fn note_evictions(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.warner.record_drops(count);
        self.warner.warn_if_due(|total| {
            warn!("StreamSink buffer full; dropped {total} oldest records");
        });
    }

    fn set_state(&self, state: ConnectionState, event: ConnectionEvent) {
        self.state.store(state);
        self.observers.notify(&event);
    }
}

pub(super) fn spawn_worker(
    config: &StreamSinkConfig,
    shared: Arc<Shared>,
) -> io::Result<(Sender<SinkCommand>, JoinHandle<()>)> {
    let (tx, rx) = bounded(COMMAND_CAPACITY);
    let worker = Worker {
        transport: config.transport.clone(),
        connect_timeout: config.connect_timeout,
        write_timeout: config.write_timeout,
        schedule: ReconnectSchedule::new(config.reconnect_interval),
        connection: None,
        shared,
    };
    let handle = thread::Builder::new()
        .name("relaylog-stream".into())
        .spawn(move || worker.run(rx))?;
    Ok((tx, handle))
}

struct Worker {
    transport: TcpTransport,
    connect_timeout: Duration,
    write_timeout: Duration,
    schedule: ReconnectSchedule,
    connection: Option<Connection>,
    shared: Arc<Shared>,
}

impl Worker {
    fn run(mut self, rx: Receiver<SinkCommand>) {
        self.reconnect_if_due(Instant::now());
        loop {
            let waited_from = Instant::now();
            let wait = self.next_wakeup(waited_from);
            match rx.recv_timeout(wait) {
                Ok(SinkCommand::Wake) => {
                    self.drain();
                }
                Ok(SinkCommand::Flush(ack)) => {
                    let drained = self.drain();
                    let _ = ack.send(drained);
                }
                Ok(SinkCommand::Shutdown(ack)) => {
                    self.drain();
                    self.shutdown();
                    let _ = ack.send(());
                    return;
                }
                Err(RecvTimeoutError::Timeout) => self.probe(waited_from),
                Err(RecvTimeoutError::Disconnected) => {
                    self.drain();
                    self.shutdown();
                    return;
                }
            }
            self.reconnect_if_due(Instant::now());
        }
    }

    /// How long to wait for a command before the next timed action.
    fn next_wakeup(&self, now: Instant) -> Duration {
        if self.connection.is_some() {
            self.schedule.interval()
        } else {
            self.schedule.time_until_due(now)
        }
    }

    fn reconnect_if_due(&mut self, now: Instant) {
        if self.connection.is_none() && self.schedule.is_due(now) {
            self.connect();
        }
    }

    fn connect(&mut self) {
        self.shared
            .set_state(ConnectionState::Connecting, ConnectionEvent::Connecting);
        match transport::connect(&self.transport, self.connect_timeout, self.write_timeout) {
            Ok(connection) => {
                let peer = connection.peer();
                debug!("StreamSink connected to {peer}");
                self.connection = Some(connection);
                self.schedule.record_success();
                self.shared
                    .set_state(ConnectionState::Connected, ConnectionEvent::Connected { peer });
                self.drain();
            }
            Err(err) => {
                self.schedule.record_failure(Instant::now());
                debug!(
                    "StreamSink failed to connect to {} (attempt {}): {err}",
                    self.transport,
                    self.schedule.consecutive_failures()
                );
                self.shared.set_state(
                    ConnectionState::Disconnected,
                    ConnectionEvent::Error {
                        message: err.to_string(),
                    },
                );
            }
        }
    }

    /// Write every buffered frame, oldest first. Returns `true` when the
    /// buffer was left empty.
    fn drain(&mut self) -> bool {
        loop {
            let Some(connection) = self.connection.as_mut() else {
                return self.shared.buffer.lock().is_empty();
            };
            let mut batch = self.shared.buffer.lock().take_all();
            if batch.is_empty() {
                return true;
            }
            if let Err(err) = write_batch(connection, &mut batch) {
                let evicted = self.shared.buffer.lock().restore_front(batch);
                self.shared.note_evictions(evicted);
                self.disconnect(Some(err), Instant::now());
                return false;
            }
        }
    }

    /// Detect a collector that closed the connection while we were idle.
    ///
    /// The close may have happened any time since `idle_since`, so the
    /// retry interval is counted from there.
    fn probe(&mut self, idle_since: Instant) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        if let Some(err) = connection.peer_closed() {
            let error = (err.kind() != io::ErrorKind::UnexpectedEof).then_some(err);
            self.disconnect(error, idle_since);
        }
    }

    fn disconnect(&mut self, error: Option<io::Error>, failed_at: Instant) {
        self.connection = None;
        self.schedule.record_failure(failed_at);
        if let Some(err) = error {
            debug!("StreamSink lost connection to {}: {err}", self.transport);
            self.shared.observers.notify(&ConnectionEvent::Error {
                message: err.to_string(),
            });
        }
        self.shared
            .set_state(ConnectionState::Disconnected, ConnectionEvent::Disconnected);
    }

    fn shutdown(&mut self) {
        if self.connection.take().is_some() {
            self.shared
                .set_state(ConnectionState::Disconnected, ConnectionEvent::Disconnected);
        } else {
            self.shared.state.store(ConnectionState::Disconnected);
        }
        let remaining = self.shared.buffer.lock().len();
        if remaining > 0 {
            warn!("StreamSink closed with {remaining} undelivered records");
        }
    }
}

/// Write frames from the front of `batch`, removing each once it is sent.
/// On error the unsent frames (including the failed one) stay in `batch`.
fn write_batch(connection: &mut Connection, batch: &mut VecDeque<Vec<u8>>) -> io::Result<()> {
    while let Some(frame) = batch.front() {
        connection.write_frame(frame)?;
        batch.pop_front();
    }
    Ok(())
}
