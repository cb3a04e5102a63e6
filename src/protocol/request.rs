//! Request definitions
//!
//! Represents commands sent to the reader and the kind used to correlate
//! their acknowledgements.

use std::fmt;

use crate::error::{ReaderError, Result};
use super::settings::{Mode, ReadMode, TagMode, Target};

/// Lowest accepted transmit power (dBm)
pub const MIN_POWER_DBM: u8 = 10;

/// Highest accepted transmit power (dBm)
pub const MAX_POWER_DBM: u8 = 30;

/// Number of antenna ports (subzones)
pub const SUBZONE_PORTS: u8 = 4;

/// Longest accepted subzone name
pub const MAX_SUBZONE_NAME_LEN: usize = 8;

/// Accepted monitor (tag miss) time range
pub const MONITOR_RANGE: std::ops::RangeInclusive<u16> = 1..=3000;

/// Request kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Connect,
    Start,
    Stop,

    // Getters
    GetId,
    GetIdentity,
    GetMode,
    GetRegion,
    GetPower,
    GetSubzones,
    GetMonitor,
    GetTarget,
    GetReadMode,
    GetTagMode,
    GetStatus,
    GetMute,

    // Setters
    SetIdentity,
    SetMode,
    SetPower,
    SetSubzone,
    SetMonitor,
    SetTarget,
    SetReadMode,
    SetTagMode,
    SetMute,
}

impl RequestKind {
    /// Every kind, in declaration order
    pub const ALL: [RequestKind; 24] = [
        RequestKind::Connect,
        RequestKind::Start,
        RequestKind::Stop,
        RequestKind::GetId,
        RequestKind::GetIdentity,
        RequestKind::GetMode,
        RequestKind::GetRegion,
        RequestKind::GetPower,
        RequestKind::GetSubzones,
        RequestKind::GetMonitor,
        RequestKind::GetTarget,
        RequestKind::GetReadMode,
        RequestKind::GetTagMode,
        RequestKind::GetStatus,
        RequestKind::GetMute,
        RequestKind::SetIdentity,
        RequestKind::SetMode,
        RequestKind::SetPower,
        RequestKind::SetSubzone,
        RequestKind::SetMonitor,
        RequestKind::SetTarget,
        RequestKind::SetReadMode,
        RequestKind::SetTagMode,
        RequestKind::SetMute,
    ];

    /// Name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            RequestKind::Connect => "connect",
            RequestKind::Start => "start",
            RequestKind::Stop => "stop",
            RequestKind::GetId => "get-id",
            RequestKind::GetIdentity => "get-identity",
            RequestKind::GetMode => "get-mode",
            RequestKind::GetRegion => "get-region",
            RequestKind::GetPower => "get-power",
            RequestKind::GetSubzones => "get-subzones",
            RequestKind::GetMonitor => "get-monitor",
            RequestKind::GetTarget => "get-target",
            RequestKind::GetReadMode => "get-readmode",
            RequestKind::GetTagMode => "get-tagmode",
            RequestKind::GetStatus => "get-status",
            RequestKind::GetMute => "get-mute",
            RequestKind::SetIdentity => "set-identity",
            RequestKind::SetMode => "set-mode",
            RequestKind::SetPower => "set-power",
            RequestKind::SetSubzone => "set-subzone",
            RequestKind::SetMonitor => "set-monitor",
            RequestKind::SetTarget => "set-target",
            RequestKind::SetReadMode => "set-readmode",
            RequestKind::SetTagMode => "set-tagmode",
            RequestKind::SetMute => "set-mute",
        }
    }

    /// Number of ack lines the reader sends after `nummessages`
    ///
    /// Start, stop and configuration setters answer with a response line
    /// plus a human-readable message line.
    pub fn expected_messages(&self) -> usize {
        match self {
            RequestKind::Start | RequestKind::Stop => 2,
            RequestKind::SetMute => 1,
            kind if kind.is_setter() => 2,
            _ => 1,
        }
    }

    /// Configuration setters, which require a stopped reader
    pub fn is_setter(&self) -> bool {
        matches!(
            self,
            RequestKind::SetIdentity
                | RequestKind::SetMode
                | RequestKind::SetPower
                | RequestKind::SetSubzone
                | RequestKind::SetMonitor
                | RequestKind::SetTarget
                | RequestKind::SetReadMode
                | RequestKind::SetTagMode
        )
    }

    /// Whether the exchange is wrapped in mute on / mute off
    pub fn is_mute_gated(&self) -> bool {
        !matches!(
            self,
            RequestKind::Connect | RequestKind::GetMute | RequestKind::SetMute
        )
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A request with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Wait for the version acknowledgement sent on connection (nothing is sent)
    Connect,

    /// Start streaming tag events
    Start,

    /// Stop streaming tag events
    Stop,

    GetId,
    GetIdentity,
    GetMode,
    GetRegion,
    GetPower,
    GetSubzones,
    GetMonitor,
    GetTarget,
    GetReadMode,
    GetTagMode,
    GetStatus,
    GetMute,

    /// Set reader and group name
    SetIdentity { reader: String, group: String },

    SetMode(Mode),

    /// Transmit power in dBm
    SetPower(u8),

    /// Rename antenna port `port` (1-based)
    SetSubzone { port: u8, name: String },

    /// Seconds before an unseen tag is reported missing
    SetMonitor(u16),

    SetTarget(Target),
    SetReadMode(ReadMode),
    SetTagMode(TagMode),

    /// Mute (true) or unmute (false) tag events
    SetMute(bool),
}

impl Request {
    /// Get the request kind
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Connect => RequestKind::Connect,
            Request::Start => RequestKind::Start,
            Request::Stop => RequestKind::Stop,
            Request::GetId => RequestKind::GetId,
            Request::GetIdentity => RequestKind::GetIdentity,
            Request::GetMode => RequestKind::GetMode,
            Request::GetRegion => RequestKind::GetRegion,
            Request::GetPower => RequestKind::GetPower,
            Request::GetSubzones => RequestKind::GetSubzones,
            Request::GetMonitor => RequestKind::GetMonitor,
            Request::GetTarget => RequestKind::GetTarget,
            Request::GetReadMode => RequestKind::GetReadMode,
            Request::GetTagMode => RequestKind::GetTagMode,
            Request::GetStatus => RequestKind::GetStatus,
            Request::GetMute => RequestKind::GetMute,
            Request::SetIdentity { .. } => RequestKind::SetIdentity,
            Request::SetMode(_) => RequestKind::SetMode,
            Request::SetPower(_) => RequestKind::SetPower,
            Request::SetSubzone { .. } => RequestKind::SetSubzone,
            Request::SetMonitor(_) => RequestKind::SetMonitor,
            Request::SetTarget(_) => RequestKind::SetTarget,
            Request::SetReadMode(_) => RequestKind::SetReadMode,
            Request::SetTagMode(_) => RequestKind::SetTagMode,
            Request::SetMute(_) => RequestKind::SetMute,
        }
    }

    /// Check arguments before anything goes on the wire
    pub fn validate(&self) -> Result<()> {
        match self {
            Request::SetPower(level) => {
                if !(MIN_POWER_DBM..=MAX_POWER_DBM).contains(level) {
                    return Err(ReaderError::Validation(format!(
                        "power level {} dBm outside {}..={}",
                        level, MIN_POWER_DBM, MAX_POWER_DBM
                    )));
                }
            }
            Request::SetSubzone { port, name } => {
                if !(1..=SUBZONE_PORTS).contains(port) {
                    return Err(ReaderError::Validation(format!(
                        "subzone port {} outside 1..={}",
                        port, SUBZONE_PORTS
                    )));
                }
                if name.len() > MAX_SUBZONE_NAME_LEN {
                    return Err(ReaderError::Validation(format!(
                        "subzone name {:?} longer than {} characters",
                        name, MAX_SUBZONE_NAME_LEN
                    )));
                }
                check_token("subzone name", name)?;
            }
            Request::SetMonitor(seconds) => {
                if !MONITOR_RANGE.contains(seconds) {
                    return Err(ReaderError::Validation(format!(
                        "monitor time {} outside {}..={}",
                        seconds,
                        MONITOR_RANGE.start(),
                        MONITOR_RANGE.end()
                    )));
                }
            }
            Request::SetIdentity { reader, group } => {
                check_token("reader name", reader)?;
                check_token("group name", group)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Build the command line, CRLF terminated
    ///
    /// Returns `None` for [`Request::Connect`], whose acknowledgement arrives
    /// unprompted once the socket is open.
    pub fn command_line(&self) -> Option<String> {
        let body = match self {
            Request::Connect => return None,
            Request::Start => "start".to_string(),
            Request::Stop => "stop".to_string(),
            Request::GetId => "id".to_string(),
            Request::GetIdentity => "identity".to_string(),
            Request::GetMode => "mode".to_string(),
            Request::GetRegion => "region".to_string(),
            Request::GetPower => "power".to_string(),
            Request::GetSubzones => "subzones".to_string(),
            Request::GetMonitor => "monitor".to_string(),
            Request::GetTarget => "target".to_string(),
            Request::GetReadMode => "readmode".to_string(),
            Request::GetTagMode => "tagmode".to_string(),
            Request::GetStatus => "status".to_string(),
            Request::GetMute => "mute".to_string(),
            Request::SetIdentity { reader, group } => format!("set identity {} {}", reader, group),
            Request::SetMode(mode) => format!("set mode {}", mode.as_token()),
            Request::SetPower(level) => format!("set power {}", level),
            Request::SetSubzone { port, name } => format!("set subzone {} {}", port, name),
            Request::SetMonitor(seconds) => format!("set monitor {}", seconds),
            Request::SetTarget(target) => format!("set target {}", target.as_token()),
            Request::SetReadMode(mode) => format!("set readmode {}", mode.as_token()),
            Request::SetTagMode(mode) => format!("set tagmode {}", mode.as_token()),
            Request::SetMute(true) => "set mute on".to_string(),
            Request::SetMute(false) => "set mute off".to_string(),
        };
        Some(format!("{} {}{}", super::COMMAND_PREFIX, body, super::LINE_TERMINATOR))
    }
}

/// Arguments are space separated on the wire, so each must be one token
fn check_token(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ReaderError::Validation(format!("{} must not be empty", what)));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ReaderError::Validation(format!(
            "{} {:?} must be a single token",
            what, value
        )));
    }
    Ok(())
}
