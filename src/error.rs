//! Error types for the realtime reader client
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::protocol::RequestKind;

/// Result type alias using ReaderError
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Unified error type for reader client operations
#[derive(Debug, Error)]
pub enum ReaderError {
    // -------------------------------------------------------------------------
    // Local Errors (raised before anything is sent)
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    Validation(String),

    #[error("Cannot fulfill {kind}: the reader must be stopped first")]
    ReaderRunning { kind: RequestKind },

    // -------------------------------------------------------------------------
    // Exchange Errors
    // -------------------------------------------------------------------------
    #[error("Reader sent an error acknowledgement for {kind}: {detail}")]
    Protocol { kind: RequestKind, detail: String },

    #[error("No acknowledgement received for {kind} after {attempts} attempts")]
    NoAck { kind: RequestKind, attempts: u32 },

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not connected to a reader")]
    NotConnected,

    // -------------------------------------------------------------------------
    // Tag Decoding Errors
    // -------------------------------------------------------------------------
    #[error("Malformed tag event: {0}")]
    Decode(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReaderError {
    /// The request kind this error is about, if any
    pub fn kind(&self) -> Option<RequestKind> {
        match self {
            ReaderError::ReaderRunning { kind }
            | ReaderError::Protocol { kind, .. }
            | ReaderError::NoAck { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether this is a socket-level failure
    pub fn is_transport(&self) -> bool {
        matches!(self, ReaderError::Io(_) | ReaderError::NotConnected)
    }
}
