//! Connection Handler
//!
//! Owns the socket to the reader and the background thread that receives
//! from it.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::RwLock;

use crate::config::{Config, TransportKind};
use crate::error::{ReaderError, Result};
use crate::pending::PendingResponses;
use crate::protocol::{FrameKind, Reassembler, ResponseFrame, TagRecord};
use super::transport::Transport;

/// Callback invoked for each decoded tag event
///
/// Runs on the receive thread, inline with frame dispatch: it must not
/// block, or responses queue up behind it.
pub type TagHandler = Arc<dyn Fn(TagRecord) + Send + Sync>;

/// Routes complete frames to their consumers
#[derive(Clone)]
pub struct Dispatcher {
    pending: Arc<PendingResponses>,
    reader_on: Arc<AtomicBool>,
    tag_handler: Arc<RwLock<Option<TagHandler>>>,
}

impl Dispatcher {
    pub fn new(
        pending: Arc<PendingResponses>,
        reader_on: Arc<AtomicBool>,
        tag_handler: Arc<RwLock<Option<TagHandler>>>,
    ) -> Self {
        Self {
            pending,
            reader_on,
            tag_handler,
        }
    }

    /// Classify a frame and hand it on
    ///
    /// Tag events go to the handler immediately, responses are queued for
    /// correlation, anything else is dropped.
    pub fn dispatch(&self, frame: ResponseFrame) {
        match frame.classify() {
            FrameKind::TagEvent => {
                // Tags only flow while the reader runs
                self.reader_on.store(true, Ordering::Relaxed);

                match TagRecord::decode(&frame) {
                    Ok(record) => {
                        let handler = self.tag_handler.read().clone();
                        match handler {
                            Some(handler) => handler(record),
                            None => tracing::trace!("No tag handler, dropping tag {}", record.tag_number()),
                        }
                    }
                    Err(e) => tracing::warn!("Dropping malformed tag event: {}", e),
                }
            }
            FrameKind::Response => {
                tracing::debug!("Queued response frame: {:?}", frame.lines());
                self.pending.push(frame);
            }
            FrameKind::Garbage => {
                tracing::debug!("Discarding unclassifiable fragment: {:?}", frame.lines());
            }
        }
    }
}

/// A live connection to the reader
pub struct Connection {
    /// Send half
    transport: Transport,

    /// Set by `close`; the receive loop exits when it sees it
    disconnecting: Arc<AtomicBool>,

    /// Cleared when the receive loop exits for any reason
    alive: Arc<AtomicBool>,

    receiver: Option<JoinHandle<()>>,
}

impl Connection {
    /// Open the socket and start the receive thread
    pub fn open(config: &Config, dispatcher: Dispatcher) -> Result<Self> {
        let transport = Transport::open(config)?;

        let receive_half = transport.try_clone()?;
        receive_half.set_read_timeout(Some(Duration::from_millis(config.poll_interval_ms)))?;

        let disconnecting = Arc::new(AtomicBool::new(false));
        let alive = Arc::new(AtomicBool::new(true));
        let buffer_size = config.recv_buffer_size;

        let receiver = {
            let disconnecting = Arc::clone(&disconnecting);
            let alive = Arc::clone(&alive);
            thread::Builder::new()
                .name("rfrain-recv".to_string())
                .spawn(move || {
                    receive_loop(&receive_half, buffer_size, &dispatcher, &disconnecting);
                    alive.store(false, Ordering::Release);
                })?
        };

        Ok(Self {
            transport,
            disconnecting,
            alive,
            receiver: Some(receiver),
        })
    }

    /// Send raw bytes to the reader
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        if !self.is_alive() {
            return Err(ReaderError::NotConnected);
        }
        self.transport.send(bytes)
    }

    /// Whether the receive loop is still running
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire) && !self.disconnecting.load(Ordering::Acquire)
    }

    /// Silence the receive path, close the socket and wait for the thread
    pub fn close(mut self) {
        self.disconnecting.store(true, Ordering::Release);
        self.transport.shutdown();

        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                tracing::warn!("Receive thread panicked");
            }
        }
        tracing::debug!("Connection to {} closed", self.transport.peer_addr());
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // The receive thread holds its own socket clone; make sure it exits
        self.disconnecting.store(true, Ordering::Release);
        if self.receiver.is_some() {
            self.transport.shutdown();
        }
    }
}

/// Read chunks until disconnect or transport failure
fn receive_loop(
    transport: &Transport,
    buffer_size: usize,
    dispatcher: &Dispatcher,
    disconnecting: &AtomicBool,
) {
    let peer = transport.peer_addr();
    let mut reassembler = Reassembler::new();
    let mut buf = vec![0u8; buffer_size];

    tracing::debug!("Receive loop started for {}", peer);

    loop {
        if disconnecting.load(Ordering::Acquire) {
            break;
        }

        let read = transport.recv(&mut buf);
        if disconnecting.load(Ordering::Acquire) {
            break;
        }

        match read {
            Ok(0) if transport.kind() == TransportKind::Tcp => {
                tracing::info!("Reader {} closed the connection", peer);
                break;
            }
            Ok(0) => continue,
            Ok(n) => {
                tracing::trace!("Received {} bytes from {}: {:?}", n, peer, String::from_utf8_lossy(&buf[..n]));
                for frame in reassembler.feed(&buf[..n]) {
                    dispatcher.dispatch(frame);
                }
            }
            Err(ref e) if is_poll_timeout(e) => continue,
            Err(ref e)
                if transport.kind() == TransportKind::Udp
                    && e.kind() == io::ErrorKind::ConnectionRefused =>
            {
                // ICMP port unreachable from an earlier datagram
                tracing::debug!("Reader {} refused a datagram", peer);
                continue;
            }
            Err(e) => {
                tracing::warn!("Receive from {} failed: {}", peer, e);
                break;
            }
        }
    }

    tracing::debug!("Receive loop for {} exited", peer);
}

fn is_poll_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        // Windows reports TimedOut where Unix reports WouldBlock
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
