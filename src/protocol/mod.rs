//! Protocol Module
//!
//! Defines the line-oriented ACK protocol spoken by the reader.
//!
//! ## Wire Format (ASCII, CRLF terminated lines)
//!
//! ### Command
//! ```text
//! com reader <subcommand> [args...]\r\n
//! ```
//!
//! ### Response Frame
//! ```text
//! ack nummessages=<N>\r\n
//! ack response=<primary>\r\n        line 1
//! ack message=<status text>\r\n     line 2 (start/stop/set only)
//! ```
//!
//! ### Tag Event Frame
//! ```text
//! ack nummessages=<N>\r\n
//! ack taginfo=<group> <reader> <mode> <tagnum> <size> <detectstat> <subzone> <rssi> <utc> <count>\r\n
//! ack tid=...\r\n                   N >= 2
//! ack epc=...\r\n                   N >= 3
//! ack user=...\r\n                  N == 4
//! ```
//!
//! There is no length prefix and no request identifier. Frames are found by
//! counting ack lines ([`Reassembler`]) and matched to requests by shape
//! ([`match_frame`]).

mod correlate;
mod frame;
mod reassembler;
mod request;
mod settings;
mod tag;

pub use correlate::{match_frame, parse_power, SUCCESS};
pub use frame::{AckLine, FrameKind, ResponseFrame};
pub use reassembler::Reassembler;
pub use request::{
    Request, RequestKind, MAX_POWER_DBM, MAX_SUBZONE_NAME_LEN, MIN_POWER_DBM, MONITOR_RANGE,
    SUBZONE_PORTS,
};
pub use settings::{Mode, ReadMode, ReaderStatus, TagMode, Target, REGIONS};
pub use tag::TagRecord;

/// Line terminator used in both directions
pub const LINE_TERMINATOR: &str = "\r\n";

/// Prefix of every command
pub const COMMAND_PREFIX: &str = "com reader";

/// Prefix of every line sent by the reader
pub const ACK_PREFIX: &str = "ack ";

/// Key of a frame header
pub const NUMMESSAGES_KEY: &str = "nummessages=";

/// Full frame header marker
pub const NUMMESSAGES_MARKER: &str = "ack nummessages=";

/// Key of the primary line of a tag event
pub const TAGINFO_KEY: &str = "taginfo=";

/// Reader-side failure marker in a primary line
pub const ERROR_MARKER: &str = "reader ERROR";
