//! # RFRain Realtime
//!
//! A client for the ACK-based realtime protocol of RFRain RFID readers with:
//! - Reassembly of `ack nummessages=N` frames from a TCP or UDP byte stream
//! - Shape-based correlation of responses to the single request in flight
//! - Retry with timeout, mute gating and local argument validation
//! - Tag event decoding delivered to a callback or a bounded channel
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ReaderClient                           │
//! │          (typed getters/setters, request executor)           │
//! └──────────┬─────────────────────────────────▲────────────────┘
//!            │ send                            │ take_match
//!            ▼                                 │
//!   ┌─────────────────┐               ┌────────┴────────┐
//!   │    Transport    │               │PendingResponses │
//!   │   (TCP / UDP)   │               │ (Mutex+Condvar) │
//!   └────────┬────────┘               └────────▲────────┘
//!            │ recv (rfrain-recv thread)        │ Response
//!            ▼                                  │
//!   ┌─────────────────┐               ┌────────┴────────┐
//!   │   Reassembler   │──── frames ──►│   Dispatcher    │
//!   │ (line countdown)│               │   (classify)    │
//!   └─────────────────┘               └────────┬────────┘
//!                                              │ TagEvent
//!                                              ▼
//!                                     ┌─────────────────┐
//!                                     │   TagHandler    │
//!                                     └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use rfrain_realtime::{Config, ReaderClient};
//!
//! let config = Config::builder().reader_addr("192.168.1.50:11111").build();
//! let client = ReaderClient::new(config)?;
//! client.connect()?;
//!
//! let tags = client.tag_channel(256);
//! client.start_reader()?;
//! for tag in tags.iter().take(10) {
//!     println!("{}", tag);
//! }
//! client.stop_reader()?;
//! # Ok::<(), rfrain_realtime::ReaderError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod pending;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ReaderError, Result};
pub use config::{Config, ConfigBuilder, TransportKind};
pub use client::ReaderClient;
pub use protocol::{Mode, ReadMode, ReaderStatus, Request, RequestKind, TagMode, TagRecord, Target};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
