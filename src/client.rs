//! Client Module
//!
//! The request executor and the typed reader API built on it.
//!
//! ## Exchange Model
//! - One request in flight at a time (`exchange_lock`); the protocol has no
//!   request identifier, so correlation relies on it
//! - Each attempt: mute tags, send, wait for a matching frame, unmute
//! - A frame carrying the reader's error marker ends the call at once;
//!   silence is retried up to `max_attempts` sends
//!
//! ```text
//! caller thread                         rfrain-recv thread
//! ─────────────                         ──────────────────
//! execute(req)
//!   ├─ validate / precondition
//!   ├─ mute on ──────────► reader
//!   ├─ send command ─────► reader ────► Reassembler ─► Dispatcher
//!   ├─ take_match ◄──────────────── PendingResponses ◄──┘   │
//!   └─ mute off ─────────► reader          TagHandler ◄─────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, TrySendError};
use parking_lot::{Mutex, RwLock};

use crate::config::{Config, TransportKind};
use crate::error::{ReaderError, Result};
use crate::network::{Connection, Dispatcher, TagHandler};
use crate::pending::PendingResponses;
use crate::protocol::{
    match_frame, parse_power, Mode, ReadMode, ReaderStatus, Request, RequestKind, TagMode,
    TagRecord, Target, LINE_TERMINATOR,
};

/// Client for one reader appliance
///
/// All methods take `&self`; the client can be shared between threads, but
/// exchanges are serialized.
pub struct ReaderClient {
    config: Config,

    /// Response frames not yet matched (filled by the receive thread)
    pending: Arc<PendingResponses>,

    /// Last known started/stopped state of the reader
    reader_on: Arc<AtomicBool>,

    /// Single tag event subscriber
    tag_handler: Arc<RwLock<Option<TagHandler>>>,

    connection: Mutex<Option<Connection>>,

    /// Serializes exchanges (single request in flight)
    exchange_lock: Mutex<()>,
}

impl ReaderClient {
    /// Create a client; nothing is opened until `connect`
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            pending: Arc::new(PendingResponses::new()),
            reader_on: Arc::new(AtomicBool::new(false)),
            tag_handler: Arc::new(RwLock::new(None)),
            connection: Mutex::new(None),
            exchange_lock: Mutex::new(()),
        })
    }

    // =========================================================================
    // Connection Lifecycle
    // =========================================================================

    /// Open the transport and perform the handshake
    ///
    /// Waits for the version acknowledgement, then reads the reader status so
    /// the reader-on flag is seeded before any other command. Returns the
    /// reported version. On failure the transport is torn down again.
    pub fn connect(&self) -> Result<String> {
        if self.connection.lock().is_some() {
            tracing::debug!("Reconnecting, closing the previous connection first");
            self.disconnect();
        }

        self.pending.clear();
        self.reader_on.store(false, Ordering::Relaxed);

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.pending),
            Arc::clone(&self.reader_on),
            Arc::clone(&self.tag_handler),
        );
        let connection = Connection::open(&self.config, dispatcher)?;

        if self.config.transport == TransportKind::Udp {
            // The reader learns its peer from inbound traffic
            connection.send(LINE_TERMINATOR.as_bytes())?;
        }
        *self.connection.lock() = Some(connection);

        match self.handshake() {
            Ok(version) => {
                tracing::info!(
                    "Connected to reader {} over {:?}, version {:?}, reader {}",
                    self.config.reader_addr,
                    self.config.transport,
                    version,
                    if self.is_reader_on() { "on" } else { "stopped" }
                );
                Ok(version)
            }
            Err(e) => {
                tracing::warn!("Handshake with {} failed: {}", self.config.reader_addr, e);
                self.disconnect();
                Err(e)
            }
        }
    }

    fn handshake(&self) -> Result<String> {
        let version = self.execute(&Request::Connect)?;
        self.get_status()?;
        Ok(version)
    }

    /// Stop the receive path and close the transport
    ///
    /// An exchange in progress on another thread fails on its next send.
    pub fn disconnect(&self) {
        let connection = self.connection.lock().take();
        if let Some(connection) = connection {
            connection.close();
            tracing::info!("Disconnected from reader {}", self.config.reader_addr);
        }
        self.pending.clear();
    }

    /// Whether a connection is open and its receive thread running
    pub fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .as_ref()
            .map(Connection::is_alive)
            .unwrap_or(false)
    }

    // =========================================================================
    // Request Executor
    // =========================================================================

    /// Run one request to completion and return the matched payload
    ///
    /// Setters return [`SUCCESS`](crate::protocol::SUCCESS); everything else
    /// returns the value of the primary response line. Blocks for at most
    /// `ack_timeout × max_attempts`.
    pub fn execute(&self, request: &Request) -> Result<String> {
        let kind = request.kind();

        request.validate()?;
        if kind.is_setter() && self.is_reader_on() {
            return Err(ReaderError::ReaderRunning { kind });
        }

        let _exchange = self.exchange_lock.lock();
        let value = self.run_exchange(request)?;

        match kind {
            RequestKind::Start => self.reader_on.store(true, Ordering::Relaxed),
            RequestKind::Stop => self.reader_on.store(false, Ordering::Relaxed),
            RequestKind::GetStatus => self.reader_on.store(value == "on", Ordering::Relaxed),
            _ => {}
        }
        Ok(value)
    }

    /// Attempts share one deadline of `ack_timeout × max_attempts`; mute
    /// toggles and waits are all cut short by it.
    fn run_exchange(&self, request: &Request) -> Result<String> {
        let kind = request.kind();
        let command = request.command_line();
        let gated = self.config.mute_gating && kind.is_mute_gated();
        let attempts = self.config.max_attempts;
        let deadline = Instant::now() + self.ack_timeout() * attempts;
        let mut made = 0;

        for attempt in 1..=attempts {
            if attempt > 1 && Instant::now() >= deadline {
                tracing::debug!("{} out of time after {} attempt(s)", kind, made);
                break;
            }
            made = attempt;

            if gated {
                self.toggle_mute(true, deadline)?;
            }

            let outcome = self.attempt(kind, command.as_deref(), attempt, deadline);

            if gated {
                if let Err(e) = self.toggle_mute(false, deadline) {
                    tracing::warn!("Unmute after {} failed: {}", kind, e);
                }
            }

            match outcome? {
                Some(value) => {
                    tracing::debug!("{} matched on attempt {}: {:?}", kind, attempt, value);
                    return Ok(value);
                }
                None if attempt < attempts => {
                    tracing::warn!("No acknowledgement for {} (attempt {}/{}), retrying", kind, attempt, attempts);
                }
                None => {}
            }
        }

        Err(ReaderError::NoAck { kind, attempts: made })
    }

    /// One send and its wait window
    fn attempt(
        &self,
        kind: RequestKind,
        command: Option<&str>,
        attempt: u32,
        deadline: Instant,
    ) -> Result<Option<String>> {
        match command {
            Some(line) => {
                tracing::debug!("Sending {} (attempt {}): {:?}", kind, attempt, line.trim_end());
                self.send(line.as_bytes())?;
            }
            None => self.ensure_connected()?,
        }
        self.await_match(kind, self.window(deadline))
    }

    /// Send a mute toggle and wait for its acknowledgement
    ///
    /// A missing acknowledgement is logged, not raised: the command proceeds
    /// with tags possibly still flowing. The toggle is always sent, even
    /// when the exchange deadline has already passed.
    fn toggle_mute(&self, on: bool, deadline: Instant) -> Result<()> {
        let request = Request::SetMute(on);
        if let Some(line) = request.command_line() {
            self.send(line.as_bytes())?;
        }

        if self.await_match(RequestKind::SetMute, self.window(deadline))?.is_none() {
            tracing::warn!("Mute {} was not acknowledged", if on { "on" } else { "off" });
        }
        Ok(())
    }

    /// Scan the pending frames until one matches `kind` or `until` passes
    fn await_match(&self, kind: RequestKind, until: Instant) -> Result<Option<String>> {
        loop {
            // Read before scanning so an arrival during the scan is not missed
            let seen = self.pending.sequence();

            if let Some(value) = self.pending.take_match(|frame| match_frame(kind, frame))? {
                return Ok(Some(value));
            }
            if Instant::now() >= until {
                return Ok(None);
            }
            self.pending.wait_for_arrival(seen, until);
        }
    }

    /// End of one wait window, capped by the exchange deadline
    fn window(&self, deadline: Instant) -> Instant {
        (Instant::now() + self.ack_timeout()).min(deadline)
    }

    fn send(&self, bytes: &[u8]) -> Result<()> {
        match self.connection.lock().as_ref() {
            Some(connection) => connection.send(bytes),
            None => Err(ReaderError::NotConnected),
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ReaderError::NotConnected)
        }
    }

    fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.config.ack_timeout_ms)
    }

    // =========================================================================
    // Reader Control
    // =========================================================================

    /// Start streaming tag events
    pub fn start_reader(&self) -> Result<()> {
        self.execute(&Request::Start).map(|_| ())
    }

    /// Stop streaming tag events
    pub fn stop_reader(&self) -> Result<()> {
        self.execute(&Request::Stop).map(|_| ())
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Reader id (`B###EB######`)
    pub fn get_id(&self) -> Result<String> {
        self.execute(&Request::GetId)
    }

    /// Reader name and group name
    pub fn get_identity(&self) -> Result<(String, String)> {
        let value = self.execute(&Request::GetIdentity)?;
        let mut names = value.split_whitespace();
        match (names.next(), names.next()) {
            (Some(reader), Some(group)) => Ok((reader.to_string(), group.to_string())),
            _ => Err(unexpected(RequestKind::GetIdentity, &value)),
        }
    }

    pub fn get_mode(&self) -> Result<Mode> {
        let value = self.execute(&Request::GetMode)?;
        Mode::from_token(&value).ok_or_else(|| unexpected(RequestKind::GetMode, &value))
    }

    pub fn get_region(&self) -> Result<String> {
        self.execute(&Request::GetRegion)
    }

    /// Transmit power in dBm
    pub fn get_power(&self) -> Result<u8> {
        let value = self.execute(&Request::GetPower)?;
        parse_power(&value).ok_or_else(|| unexpected(RequestKind::GetPower, &value))
    }

    /// Names of the four antenna ports, port 1 first
    pub fn get_subzones(&self) -> Result<Vec<String>> {
        let value = self.execute(&Request::GetSubzones)?;
        Ok(value.split_whitespace().map(str::to_string).collect())
    }

    /// Monitor (tag miss) time in seconds
    pub fn get_monitor(&self) -> Result<u16> {
        let value = self.execute(&Request::GetMonitor)?;
        value
            .parse()
            .map_err(|_| unexpected(RequestKind::GetMonitor, &value))
    }

    pub fn get_target(&self) -> Result<Target> {
        let value = self.execute(&Request::GetTarget)?;
        Target::from_token(&value).ok_or_else(|| unexpected(RequestKind::GetTarget, &value))
    }

    pub fn get_read_mode(&self) -> Result<ReadMode> {
        let value = self.execute(&Request::GetReadMode)?;
        ReadMode::from_token(&value).ok_or_else(|| unexpected(RequestKind::GetReadMode, &value))
    }

    pub fn get_tag_mode(&self) -> Result<TagMode> {
        let value = self.execute(&Request::GetTagMode)?;
        TagMode::from_token(&value).ok_or_else(|| unexpected(RequestKind::GetTagMode, &value))
    }

    /// Started/stopped state; also refreshes the reader-on flag
    pub fn get_status(&self) -> Result<ReaderStatus> {
        let value = self.execute(&Request::GetStatus)?;
        ReaderStatus::from_token(&value).ok_or_else(|| unexpected(RequestKind::GetStatus, &value))
    }

    /// Whether tag events are muted
    pub fn get_mute(&self) -> Result<bool> {
        let value = self.execute(&Request::GetMute)?;
        Ok(value == "com mute on")
    }

    // =========================================================================
    // Setters (reader must be stopped, except for mute)
    // =========================================================================

    pub fn set_identity(&self, reader: &str, group: &str) -> Result<()> {
        self.execute(&Request::SetIdentity {
            reader: reader.to_string(),
            group: group.to_string(),
        })
        .map(|_| ())
    }

    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        self.execute(&Request::SetMode(mode)).map(|_| ())
    }

    /// Transmit power in dBm, 10..=30
    pub fn set_power(&self, level: u8) -> Result<()> {
        self.execute(&Request::SetPower(level)).map(|_| ())
    }

    /// Rename antenna port `port` (1..=4); names are at most 8 characters
    pub fn set_subzone(&self, port: u8, name: &str) -> Result<()> {
        self.execute(&Request::SetSubzone {
            port,
            name: name.to_string(),
        })
        .map(|_| ())
    }

    /// Monitor time in seconds, 1..=3000
    pub fn set_monitor(&self, seconds: u16) -> Result<()> {
        self.execute(&Request::SetMonitor(seconds)).map(|_| ())
    }

    pub fn set_target(&self, target: Target) -> Result<()> {
        self.execute(&Request::SetTarget(target)).map(|_| ())
    }

    pub fn set_read_mode(&self, mode: ReadMode) -> Result<()> {
        self.execute(&Request::SetReadMode(mode)).map(|_| ())
    }

    pub fn set_tag_mode(&self, mode: TagMode) -> Result<()> {
        self.execute(&Request::SetTagMode(mode)).map(|_| ())
    }

    pub fn set_mute(&self, muted: bool) -> Result<()> {
        self.execute(&Request::SetMute(muted)).map(|_| ())
    }

    // =========================================================================
    // Tag Events
    // =========================================================================

    /// Register the tag event subscriber, replacing any previous one
    ///
    /// The handler runs on the receive thread and must not block.
    pub fn set_tag_handler<F>(&self, handler: F)
    where
        F: Fn(TagRecord) + Send + Sync + 'static,
    {
        *self.tag_handler.write() = Some(Arc::new(handler));
    }

    pub fn clear_tag_handler(&self) {
        *self.tag_handler.write() = None;
    }

    /// Deliver tag events through a bounded channel instead of a callback
    ///
    /// Replaces the current handler. Events arriving while the channel is
    /// full are dropped.
    pub fn tag_channel(&self, capacity: usize) -> channel::Receiver<TagRecord> {
        let (sender, receiver) = channel::bounded(capacity);

        self.set_tag_handler(move |record: TagRecord| match sender.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                tracing::warn!("Tag channel full, dropping tag {}", record.tag_number());
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::trace!("Tag channel receiver gone");
            }
        });
        receiver
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Last known started/stopped state (best effort)
    pub fn is_reader_on(&self) -> bool {
        self.reader_on.load(Ordering::Relaxed)
    }

    /// Number of response frames waiting unmatched
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for ReaderClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// A matched value the typed API could not convert
fn unexpected(kind: RequestKind, value: &str) -> ReaderError {
    ReaderError::Protocol {
        kind,
        detail: format!("unexpected value {:?}", value),
    }
}
