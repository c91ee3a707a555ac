//! Connection state and observer notifications.

use std::{
    fmt,
    net::SocketAddr,
    sync::atomic::{AtomicU8, Ordering},
};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;

/// Events queued per observer before further events are discarded.
const OBSERVER_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        })
    }
}

/// Notification delivered to observers of a [`StreamSink`](super::StreamSink).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connecting,
    Connected { peer: SocketAddr },
    /// A connect or write failed. The sink keeps retrying.
    Error { message: String },
    Disconnected,
}

/// State shared between the sink handle and its worker.
pub(super) struct StateCell(AtomicU8);

impl StateCell {
    pub(super) fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Disconnected as u8))
    }

    pub(super) fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub(super) fn store(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

/// Fan-out of connection events to subscribed channels.
///
/// Delivery never blocks the worker: a full observer misses the event and a
/// disconnected observer is pruned.
#[derive(Default)]
pub(super) struct Observers {
    senders: Mutex<Vec<Sender<ConnectionEvent>>>,
}

impl Observers {
    pub(super) fn subscribe(&self) -> Receiver<ConnectionEvent> {
        let (tx, rx) = bounded(OBSERVER_CAPACITY);
        self.senders.lock().push(tx);
        rx
    }

    pub(super) fn notify(&self, event: &ConnectionEvent) {
        self.senders
            .lock()
            .retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
    }

    /// Drop every sender so observers see the end of the stream.
    pub(super) fn clear(&self) {
        self.senders.lock().clear();
    }
}
