//! Configuration for the reader client
//!
//! Centralized configuration with the protocol's default timings.

use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::{ReaderError, Result};

/// Socket flavour used to talk to the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Connection-oriented byte stream
    Tcp,

    /// Connectionless datagrams
    Udp,
}

/// Main configuration for a reader client
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Endpoint Configuration
    // -------------------------------------------------------------------------
    /// Reader address (host:port)
    pub reader_addr: String,

    /// TCP or UDP
    pub transport: TransportKind,

    /// Local bind address for UDP. `None` binds `0.0.0.0:<reader port>`.
    pub udp_bind_addr: Option<String>,

    /// TCP connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Exchange Configuration
    // -------------------------------------------------------------------------
    /// How long one attempt waits for a matching acknowledgement (milliseconds)
    pub ack_timeout_ms: u64,

    /// Total number of sends before giving up on a request
    pub max_attempts: u32,

    /// Mute tag events around each command exchange
    pub mute_gating: bool,

    // -------------------------------------------------------------------------
    // Receive Path Configuration
    // -------------------------------------------------------------------------
    /// Bytes requested per socket read
    pub recv_buffer_size: usize,

    /// Socket read timeout used to re-check the disconnecting flag (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reader_addr: "127.0.0.1:11111".to_string(),
            transport: TransportKind::Tcp,
            udp_bind_addr: None,
            connect_timeout_ms: 5000,
            ack_timeout_ms: 5000,
            max_attempts: 3,
            mute_gating: true,
            recv_buffer_size: 1024,
            poll_interval_ms: 250,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the values that would make the client misbehave
    pub fn validate(&self) -> Result<()> {
        if self.ack_timeout_ms == 0 {
            return Err(ReaderError::Config("ack_timeout_ms must be non-zero".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(ReaderError::Config("max_attempts must be non-zero".to_string()));
        }
        if self.recv_buffer_size == 0 {
            return Err(ReaderError::Config("recv_buffer_size must be non-zero".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ReaderError::Config("poll_interval_ms must be non-zero".to_string()));
        }
        self.resolve_reader_addr()?;
        Ok(())
    }

    /// Resolve `reader_addr` to its first socket address
    pub fn resolve_reader_addr(&self) -> Result<SocketAddr> {
        self.reader_addr
            .to_socket_addrs()
            .map_err(|e| ReaderError::Config(format!("bad reader address {}: {}", self.reader_addr, e)))?
            .next()
            .ok_or_else(|| ReaderError::Config(format!("reader address {} did not resolve", self.reader_addr)))
    }

    /// Local address the UDP socket binds to
    pub fn resolve_udp_bind_addr(&self) -> Result<SocketAddr> {
        match &self.udp_bind_addr {
            Some(addr) => addr
                .parse()
                .map_err(|e| ReaderError::Config(format!("bad UDP bind address {}: {}", addr, e))),
            None => {
                let reader = self.resolve_reader_addr()?;
                Ok(SocketAddr::from(([0, 0, 0, 0], reader.port())))
            }
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the reader address (host:port)
    pub fn reader_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.reader_addr = addr.into();
        self
    }

    /// Set the transport kind
    pub fn transport(mut self, kind: TransportKind) -> Self {
        self.config.transport = kind;
        self
    }

    /// Set the local UDP bind address
    pub fn udp_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.udp_bind_addr = Some(addr.into());
        self
    }

    /// Set the TCP connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the per-attempt acknowledgement timeout (in milliseconds)
    pub fn ack_timeout_ms(mut self, ms: u64) -> Self {
        self.config.ack_timeout_ms = ms;
        self
    }

    /// Set the number of send attempts per request
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Enable or disable mute gating
    pub fn mute_gating(mut self, enabled: bool) -> Self {
        self.config.mute_gating = enabled;
        self
    }

    /// Set the per-read buffer size (in bytes)
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = size;
        self
    }

    /// Set the receive loop poll interval (in milliseconds)
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
