//! Shared buffer utilities for sink tests.
//!
//! Provides a thread-safe `Write` target so a console sink's output can be
//! inspected after its worker thread has written it.

use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};

/// Thread-safe wrapper around a byte buffer used as a sink writer.
///
/// The inner buffer is kept private so tests can't bypass the `Write`
/// implementation or mutate the buffer without locking.
#[derive(Clone, Default)]
pub struct SharedBuf {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    /// Snapshot of the buffer contents decoded as UTF-8.
    pub fn contents(&self) -> String {
        let bytes = self.buffer.lock().expect("SharedBuf mutex poisoned").clone();
        String::from_utf8(bytes).expect("buffer contains invalid UTF-8")
    }

    /// Non-empty lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .expect("SharedBuf mutex poisoned")
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
