//! Mock Reader
//!
//! A scriptable stand-in for the reader appliance, speaking the same wire
//! format over TCP or UDP. Used by the test suites and the `rfrain-mock`
//! binary.
//!
//! ## Behaviour
//! - Sends the version acknowledgement as soon as a client connects (TCP) or
//!   sends its first datagram (UDP)
//! - Answers every `com reader` command with the reader's frame shapes
//! - Emits tag events on a timer while started and unmuted
//! - Subcommands can be silenced or answered with `reader ERROR` for tests

use std::collections::HashSet;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::TransportKind;
use crate::error::Result;
use crate::protocol::{Mode, ReadMode, TagMode, Target, COMMAND_PREFIX, LINE_TERMINATOR};

/// How often the mock's threads re-check the stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Version reported in the connection acknowledgement
pub const MOCK_VERSION: &str = "reader version";

/// Reader id reported by `com reader id`
pub const MOCK_READER_ID: &str = "B123EB456789";

/// Emulated reader settings and bookkeeping
#[derive(Debug, Clone)]
pub struct MockState {
    pub reader_name: String,
    pub group_name: String,
    pub mode: Mode,
    pub region: String,
    pub power: u8,
    pub subzones: [String; 4],
    pub monitor: u16,
    pub target: Target,
    pub read_mode: ReadMode,
    pub tag_mode: TagMode,

    /// Streaming tag events
    pub running: bool,
    pub muted: bool,

    /// Subcommands that get no answer at all
    pub silenced: HashSet<String>,

    /// Subcommands answered with a `reader ERROR` frame
    pub failing: HashSet<String>,

    /// Every command received, without the `com reader` prefix
    pub received: Vec<String>,

    /// Tag events sent so far
    pub tags_sent: u32,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            reader_name: "readerName".to_string(),
            group_name: "groupName".to_string(),
            mode: Mode::ServerModeEnhanced,
            region: "North America".to_string(),
            power: 26,
            subzones: [
                "Zone1".to_string(),
                "empty".to_string(),
                "empty".to_string(),
                "empty".to_string(),
            ],
            monitor: 10,
            target: Target::A,
            read_mode: ReadMode::S1,
            tag_mode: TagMode::EmbeddedAll,
            running: false,
            muted: false,
            silenced: HashSet::new(),
            failing: HashSet::new(),
            received: Vec::new(),
            tags_sent: 0,
        }
    }
}

/// Where replies go
#[derive(Debug)]
enum Sink {
    Tcp(TcpStream),
    Udp { socket: UdpSocket, client: SocketAddr },
}

impl Sink {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            Sink::Tcp(stream) => {
                stream.write_all(bytes)?;
                stream.flush()
            }
            Sink::Udp { socket, client } => socket.send_to(bytes, *client).map(|_| ()),
        }
    }
}

struct Shared {
    state: Mutex<MockState>,

    /// Current client; the lock also keeps frames from interleaving
    sink: Mutex<Option<Sink>>,
    client_ready: Condvar,

    stop: AtomicBool,
}

impl Shared {
    fn send(&self, bytes: &[u8]) -> Result<()> {
        let mut sink = self.sink.lock();
        match sink.as_mut() {
            Some(sink) => Ok(sink.send(bytes)?),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "no client connected").into()),
        }
    }

    fn attach(&self, sink: Sink) {
        let mut slot = self.sink.lock();
        *slot = Some(sink);
        if let Some(sink) = slot.as_mut() {
            let ack = format!(
                "ack nummessages=1{t}ack version={}{t}",
                MOCK_VERSION,
                t = LINE_TERMINATOR
            );
            if let Err(e) = sink.send(ack.as_bytes()) {
                tracing::warn!("Mock failed to send version ack: {}", e);
            }
        }
        self.client_ready.notify_all();
    }

    /// Split buffered input into lines and answer each command
    fn handle_input(&self, pending: &mut String, chunk: &[u8]) {
        pending.push_str(&String::from_utf8_lossy(chunk));
        while let Some(end) = pending.find('\n') {
            let line: String = pending.drain(..=end).collect();
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(reply) = self.handle_command(line) {
                if let Err(e) = self.send(reply.as_bytes()) {
                    tracing::warn!("Mock failed to reply to {:?}: {}", line, e);
                }
            }
        }
    }

    fn handle_command(&self, line: &str) -> Option<String> {
        let command = match line.strip_prefix(COMMAND_PREFIX) {
            Some(rest) => rest.trim(),
            None => {
                tracing::debug!("Mock ignoring non-command line {:?}", line);
                return None;
            }
        };

        let mut state = self.state.lock();
        state.received.push(command.to_string());

        let key = command_key(command);
        if state.silenced.contains(&key) {
            tracing::debug!("Mock staying silent for {:?}", command);
            return None;
        }
        if state.failing.contains(&key) {
            return Some(single(&format!("reader ERROR: {}", command)));
        }

        let tokens: Vec<&str> = command.split_whitespace().collect();
        let is_setter = tokens.first() == Some(&"set") && tokens.get(1) != Some(&"mute");
        if is_setter && state.running {
            return Some(single("reader ERROR: reader must be stopped"));
        }

        let reply = match tokens.as_slice() {
            ["id"] => single(MOCK_READER_ID),
            ["identity"] => single(&format!("{} {}", state.reader_name, state.group_name)),
            ["mode"] => single(state.mode.as_token()),
            ["region"] => single(&state.region),
            ["power"] => single(&format!("{} dBm", state.power)),
            ["subzones"] => single(&state.subzones.join(" ")),
            ["monitor"] => single(&state.monitor.to_string()),
            ["target"] => single(state.target.as_token()),
            ["readmode"] => single(state.read_mode.as_token()),
            ["tagmode"] => single(state.tag_mode.as_token()),
            ["status"] => single(if state.running { "on" } else { "stop" }),
            ["mute"] => single(if state.muted { "com mute on" } else { "com mute off" }),
            ["start"] => {
                let message = if state.running {
                    "WARNING: Reader is already started"
                } else {
                    "RFRain API - Reader started successfully"
                };
                state.running = true;
                double("on", message)
            }
            ["stop"] => {
                let message = if state.running {
                    "RFRain API - The command completed successfully"
                } else {
                    "Warning: Reader is already stopped"
                };
                state.running = false;
                double("stop", message)
            }
            ["set", "mute", setting] => {
                state.muted = *setting == "on";
                single("com set mute OK")
            }
            ["set", "identity", reader, group] => {
                state.reader_name = reader.to_string();
                state.group_name = group.to_string();
                double("success", "Set Identity Message")
            }
            ["set", "mode", mode] => match Mode::from_token(mode) {
                Some(mode) => {
                    state.mode = mode;
                    double("success", "RFRain API - Request Succeeded")
                }
                None => double("failure", "unknown mode"),
            },
            ["set", "power", level] => match level.parse() {
                Ok(level) => {
                    state.power = level;
                    double("success", "additional power status info")
                }
                Err(_) => double("failure", "bad power level"),
            },
            ["set", "subzone", port, name] => match port.parse::<usize>() {
                Ok(port @ 1..=4) => {
                    state.subzones[port - 1] = name.to_string();
                    double("success", "additional subzone status info")
                }
                _ => double("failure", "bad port"),
            },
            ["set", "monitor", seconds] => match seconds.parse() {
                Ok(seconds) => {
                    state.monitor = seconds;
                    double("success", "additional monitor status info")
                }
                Err(_) => double("failure", "bad monitor time"),
            },
            ["set", "target", target] => match Target::from_token(target) {
                Some(target) => {
                    state.target = target;
                    double("success", "RFRain API - Request Succeeded")
                }
                None => double("failure", "unknown target"),
            },
            ["set", "readmode", mode] => match ReadMode::from_token(mode) {
                Some(mode) => {
                    state.read_mode = mode;
                    double("success", "additional readmode status info")
                }
                None => double("failure", "unknown read mode"),
            },
            ["set", "tagmode", mode] => match TagMode::from_token(mode) {
                Some(mode) => {
                    state.tag_mode = mode;
                    double("success", "additional tagmode status info")
                }
                None => double("failure", "unknown tag mode"),
            },
            _ => single(&format!("reader ERROR: unknown command {}", command)),
        };
        Some(reply)
    }

    fn tag_event(&self) -> String {
        let mut state = self.state.lock();
        state.tags_sent += 1;

        let t = LINE_TERMINATOR;
        let mut frame = format!(
            "ack nummessages={}{t}ack taginfo={} {} subz E200000012345142365 24 PRES {} -40 2021-01-01T00:00:00Z {}{t}ack tid=thisisTID{t}",
            state.tag_mode.event_messages(),
            state.group_name,
            state.reader_name,
            state.subzones[0],
            state.tags_sent,
            t = t
        );
        if matches!(state.tag_mode, TagMode::EmbeddedEpcTid | TagMode::EmbeddedAll) {
            frame.push_str(&format!("ack epc=thisisEPC{}", t));
        }
        if state.tag_mode == TagMode::EmbeddedAll {
            frame.push_str(&format!("ack user=thisisUSERDATA{}", t));
        }
        frame
    }
}

/// Handle to a running mock reader
pub struct MockReader {
    kind: TransportKind,
    local_addr: SocketAddr,
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
}

impl MockReader {
    /// Start a mock reader on `addr` without a tag timer
    pub fn start(kind: TransportKind, addr: &str) -> Result<Self> {
        Self::start_with(kind, addr, None)
    }

    /// Start a mock reader that emits a tag event every `tag_interval` while running
    pub fn start_with(kind: TransportKind, addr: &str, tag_interval: Option<Duration>) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(MockState::default()),
            sink: Mutex::new(None),
            client_ready: Condvar::new(),
            stop: AtomicBool::new(false),
        });

        let mut threads = Vec::new();
        let local_addr = match kind {
            TransportKind::Tcp => {
                let listener = TcpListener::bind(addr)?;
                listener.set_nonblocking(true)?;
                let local_addr = listener.local_addr()?;
                let shared = Arc::clone(&shared);
                threads.push(spawn("rfrain-mock-accept", move || accept_loop(listener, shared))?);
                local_addr
            }
            TransportKind::Udp => {
                let socket = UdpSocket::bind(addr)?;
                socket.set_read_timeout(Some(POLL_INTERVAL))?;
                let local_addr = socket.local_addr()?;
                let shared = Arc::clone(&shared);
                threads.push(spawn("rfrain-mock-udp", move || datagram_loop(socket, shared))?);
                local_addr
            }
        };

        if let Some(interval) = tag_interval {
            let shared = Arc::clone(&shared);
            threads.push(spawn("rfrain-mock-tags", move || tag_loop(interval, shared))?);
        }

        tracing::info!("Mock reader listening on {:?} {}", kind, local_addr);

        Ok(Self {
            kind,
            local_addr,
            shared,
            threads,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Copy of the emulated state
    pub fn state(&self) -> MockState {
        self.shared.state.lock().clone()
    }

    /// Modify the emulated state
    pub fn update<F: FnOnce(&mut MockState)>(&self, f: F) {
        f(&mut self.shared.state.lock());
    }

    /// Never answer `subcommand` (e.g. `"mode"` or `"set power"`)
    pub fn silence(&self, subcommand: &str) {
        self.update(|state| {
            state.silenced.insert(subcommand.to_string());
        });
    }

    /// Answer `subcommand` with a `reader ERROR` frame
    pub fn fail(&self, subcommand: &str) {
        self.update(|state| {
            state.failing.insert(subcommand.to_string());
        });
    }

    /// Commands received so far, without the `com reader` prefix
    pub fn commands(&self) -> Vec<String> {
        self.shared.state.lock().received.clone()
    }

    /// How many received commands have key `subcommand`
    pub fn count(&self, subcommand: &str) -> usize {
        self.shared
            .state
            .lock()
            .received
            .iter()
            .filter(|command| command_key(command) == subcommand)
            .count()
    }

    /// Block until a client has attached
    pub fn wait_for_client(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut sink = self.shared.sink.lock();
        while sink.is_none() {
            if self.shared.client_ready.wait_until(&mut sink, deadline).timed_out() {
                return sink.is_some();
            }
        }
        true
    }

    /// Send raw bytes to the client
    pub fn inject(&self, bytes: &[u8]) -> Result<()> {
        self.shared.send(bytes)
    }

    /// Send one tag event now, whatever the running state
    pub fn send_tag_event(&self) -> Result<()> {
        let frame = self.shared.tag_event();
        self.shared.send(frame.as_bytes())
    }

    /// Stop all threads and drop the client
    pub fn shutdown(mut self) {
        self.stop_threads();
    }

    fn stop_threads(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        if let Some(Sink::Tcp(stream)) = self.shared.sink.lock().take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

impl Drop for MockReader {
    fn drop(&mut self) {
        self.stop_threads();
    }
}

/// Key used for silencing: first word, or `set <what>`
fn command_key(command: &str) -> String {
    let mut tokens = command.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some("set"), Some(what)) => format!("set {}", what),
        (Some(first), _) => first.to_string(),
        (None, _) => String::new(),
    }
}

fn single(response: &str) -> String {
    format!(
        "ack nummessages=1{t}ack response={}{t}",
        response,
        t = LINE_TERMINATOR
    )
}

fn double(response: &str, message: &str) -> String {
    format!(
        "ack nummessages=2{t}ack response={}{t}ack message={}{t}",
        response,
        message,
        t = LINE_TERMINATOR
    )
}

fn spawn<F>(name: &str, f: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    Ok(thread::Builder::new().name(name.to_string()).spawn(f)?)
}

fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    let mut clients = Vec::new();

    while !shared.stop.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => {
                tracing::info!("Mock accepted client {}", peer);
                let setup = stream
                    .set_nonblocking(false)
                    .and_then(|_| stream.set_read_timeout(Some(POLL_INTERVAL)))
                    .and_then(|_| stream.try_clone());
                let write_half = match setup {
                    Ok(clone) => clone,
                    Err(e) => {
                        tracing::warn!("Mock failed to set up client {}: {}", peer, e);
                        continue;
                    }
                };
                shared.attach(Sink::Tcp(write_half));

                let client_shared = Arc::clone(&shared);
                match spawn("rfrain-mock-client", move || client_loop(stream, client_shared)) {
                    Ok(handle) => clients.push(handle),
                    Err(e) => tracing::warn!("Mock failed to spawn client thread: {}", e),
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                tracing::warn!("Mock accept failed: {}", e);
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    for handle in clients {
        let _ = handle.join();
    }
}

fn client_loop(mut stream: TcpStream, shared: Arc<Shared>) {
    let mut pending = String::new();
    let mut buf = [0u8; 1024];

    while !shared.stop.load(Ordering::Acquire) {
        match stream.read(&mut buf) {
            Ok(0) => {
                tracing::debug!("Mock client disconnected");
                break;
            }
            Ok(n) => shared.handle_input(&mut pending, &buf[..n]),
            Err(ref e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(e) => {
                tracing::debug!("Mock client read failed: {}", e);
                break;
            }
        }
    }
}

fn datagram_loop(socket: UdpSocket, shared: Arc<Shared>) {
    let mut client: Option<SocketAddr> = None;
    let mut pending = String::new();
    let mut buf = [0u8; 1024];

    while !shared.stop.load(Ordering::Acquire) {
        match socket.recv_from(&mut buf) {
            Ok((n, from)) => {
                if client != Some(from) {
                    match socket.try_clone() {
                        Ok(reply_socket) => {
                            tracing::info!("Mock registered datagram client {}", from);
                            client = Some(from);
                            pending.clear();
                            shared.attach(Sink::Udp {
                                socket: reply_socket,
                                client: from,
                            });
                        }
                        Err(e) => {
                            tracing::warn!("Mock failed to clone socket: {}", e);
                            continue;
                        }
                    }
                }
                shared.handle_input(&mut pending, &buf[..n]);
            }
            Err(ref e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(e) => tracing::debug!("Mock datagram receive failed: {}", e),
        }
    }
}

fn tag_loop(interval: Duration, shared: Arc<Shared>) {
    let mut next = Instant::now() + interval;

    while !shared.stop.load(Ordering::Acquire) {
        thread::sleep(POLL_INTERVAL.min(interval));
        if Instant::now() < next {
            continue;
        }
        next = Instant::now() + interval;

        let streaming = {
            let state = shared.state.lock();
            state.running && !state.muted
        };
        if !streaming {
            continue;
        }

        let frame = shared.tag_event();
        if let Err(e) = shared.send(frame.as_bytes()) {
            tracing::debug!("Mock tag event not sent: {}", e);
        }
    }
}
