//! Transport
//!
//! Thin send/receive abstraction over a TCP stream or a connected UDP socket.

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, UdpSocket};
use std::time::Duration;

use crate::config::{Config, TransportKind};
use crate::error::Result;

#[derive(Debug)]
enum Socket {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

/// Socket to the reader
#[derive(Debug)]
pub struct Transport {
    socket: Socket,

    /// Reader endpoint
    peer: SocketAddr,
}

impl Transport {
    /// Open a socket to the reader named in `config`
    pub fn open(config: &Config) -> Result<Self> {
        let peer = config.resolve_reader_addr()?;

        let socket = match config.transport {
            TransportKind::Tcp => {
                let timeout = Duration::from_millis(config.connect_timeout_ms.max(1));
                let stream = TcpStream::connect_timeout(&peer, timeout)?;

                // Disable Nagle's algorithm, commands are tiny
                stream.set_nodelay(true)?;

                // A reader that stops draining its socket must not wedge the sender
                stream.set_write_timeout(Some(Duration::from_millis(config.ack_timeout_ms.max(1))))?;
                Socket::Tcp(stream)
            }
            TransportKind::Udp => {
                let socket = UdpSocket::bind(config.resolve_udp_bind_addr()?)?;
                socket.connect(peer)?;
                Socket::Udp(socket)
            }
        };

        tracing::debug!("Opened {:?} transport to {}", config.transport, peer);

        Ok(Self { socket, peer })
    }

    /// Clone the handle so one thread can receive while another sends
    pub fn try_clone(&self) -> Result<Self> {
        let socket = match &self.socket {
            Socket::Tcp(stream) => Socket::Tcp(stream.try_clone()?),
            Socket::Udp(socket) => Socket::Udp(socket.try_clone()?),
        };
        Ok(Self {
            socket,
            peer: self.peer,
        })
    }

    /// Send all of `bytes`
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        match &self.socket {
            Socket::Tcp(stream) => {
                let mut writer: &TcpStream = stream;
                writer.write_all(bytes)?;
                writer.flush()?;
            }
            Socket::Udp(socket) => {
                let sent = socket.send(bytes)?;
                if sent != bytes.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("datagram truncated: sent {} of {} bytes", sent, bytes.len()),
                    )
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Receive one chunk
    ///
    /// `Ok(0)` on a stream means the reader closed the connection. Datagrams
    /// from anyone but the reader are skipped.
    pub fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        match &self.socket {
            Socket::Tcp(stream) => {
                let mut reader: &TcpStream = stream;
                io::Read::read(&mut reader, buf)
            }
            Socket::Udp(socket) => loop {
                let (n, from) = socket.recv_from(buf)?;
                if from.ip() != self.peer.ip() {
                    tracing::trace!("Ignoring datagram from unexpected sender {}", from);
                    continue;
                }
                return Ok(n);
            },
        }
    }

    /// Bound how long `recv` blocks
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.socket {
            Socket::Tcp(stream) => stream.set_read_timeout(timeout)?,
            Socket::Udp(socket) => socket.set_read_timeout(timeout)?,
        }
        Ok(())
    }

    /// Shut the stream down so a blocked `recv` returns (no-op for UDP)
    pub fn shutdown(&self) {
        if let Socket::Tcp(stream) = &self.socket {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                if e.kind() != io::ErrorKind::NotConnected {
                    tracing::debug!("Shutdown of {} failed: {}", self.peer, e);
                }
            }
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self.socket {
            Socket::Tcp(_) => TransportKind::Tcp,
            Socket::Udp(_) => TransportKind::Udp,
        }
    }

    /// Reader endpoint
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
