//! TCP transport primitives for the stream sink.

use std::{
    fmt,
    io::{self, Write},
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

/// Collector address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpTransport {
    /// Hostname or IP address to connect to.
    pub host: String,
    pub port: u16,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn socket_addrs(&self) -> io::Result<Vec<SocketAddr>> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map(|iter| iter.collect())
    }
}

impl fmt::Display for TcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An established connection to the collector.
pub(super) struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    pub(super) fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub(super) fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream.write_all(frame)?;
        self.stream.flush()
    }

    /// Check, without blocking, whether the peer has closed the connection.
    ///
    /// The collector never sends data, so a readable socket that yields zero
    /// bytes means end-of-stream. Unexpected inbound bytes are left unread.
    pub(super) fn peer_closed(&mut self) -> Option<io::Error> {
        if let Err(err) = self.stream.set_nonblocking(true) {
            return Some(err);
        }
        let mut probe = [0u8; 1];
        let outcome = match self.stream.peek(&mut probe) {
            Ok(0) => Some(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by peer",
            )),
            Ok(_) => None,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => None,
            Err(err) => Some(err),
        };
        if let Err(err) = self.stream.set_nonblocking(false) {
            return Some(err);
        }
        outcome
    }
}

/// Connect to the first reachable address `transport` resolves to.
pub(super) fn connect(
    transport: &TcpTransport,
    connect_timeout: Duration,
    write_timeout: Duration,
) -> io::Result<Connection> {
    let mut last_err = None;
    for addr in transport.socket_addrs()? {
        match TcpStream::connect_timeout(&addr, connect_timeout) {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                stream.set_write_timeout(Some(write_timeout))?;
                return Ok(Connection { stream, peer: addr });
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{transport} did not resolve to any address"),
        )
    }))
}
