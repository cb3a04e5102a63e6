//! Reader settings
//!
//! Enumerations reported and accepted by the reader, each backed by a static
//! table of wire tokens.

use std::fmt;
use std::str::FromStr;

use crate::error::ReaderError;

/// Regions a reader reports from `com reader region`
pub const REGIONS: &[&str] = &[
    "North America",
    "South America",
    "Asia",
    "Africa",
    "Europe",
    "Australia",
];

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $token:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Wire token to value table
            pub const TABLE: &'static [(&'static str, $name)] = &[
                $(($token, $name::$variant)),+
            ];

            /// Token sent and received on the wire
            pub fn as_token(&self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }

            /// Look up a wire token (exact match)
            pub fn from_token(token: &str) -> Option<Self> {
                Self::TABLE
                    .iter()
                    .find(|(t, _)| *t == token)
                    .map(|(_, value)| *value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_token())
            }
        }

        impl FromStr for $name {
            type Err = ReaderError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_token(s.trim()).ok_or_else(|| {
                    ReaderError::Validation(format!("unknown {}: {}", $label, s))
                })
            }
        }
    };
}

wire_enum! {
    /// Reader operating mode
    Mode, "mode" {
        Discover => "Discover",
        AutoCheckIn => "AutoCheckIn",
        ServerMode => "ServerMode",
        ServerModeEnhanced => "ServerModeEnhanced",
        WriteMode => "WriteMode",
    }
}

wire_enum! {
    /// Gen2 inventory target setting
    Target, "target" {
        A => "Target-A",
        B => "Target-B",
        AB => "Target-AB",
        BA => "Target-BA",
    }
}

wire_enum! {
    /// Gen2 session used for reads
    ReadMode, "read mode" {
        S0 => "S0",
        S1 => "S1",
        S2 => "S2",
        S3 => "S3",
    }
}

wire_enum! {
    /// Which memory banks are embedded in each tag event
    TagMode, "tag mode" {
        /// TID only (2 ack lines per event)
        EmbeddedTid => "EMBEDDED_TID_MEM",
        /// EPC and TID (3 ack lines per event)
        EmbeddedEpcTid => "EMBEDDED_EPC_TID_MEM",
        /// TID, EPC and user memory (4 ack lines per event)
        EmbeddedAll => "EMBEDDED_ALL",
    }
}

impl TagMode {
    /// Number of ack lines following the header in a tag event
    pub fn event_messages(&self) -> usize {
        match self {
            TagMode::EmbeddedTid => 2,
            TagMode::EmbeddedEpcTid => 3,
            TagMode::EmbeddedAll => 4,
        }
    }
}

/// Whether the reader is streaming tag events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderStatus {
    On,
    Stopped,
}

impl ReaderStatus {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "on" => Some(ReaderStatus::On),
            "stop" => Some(ReaderStatus::Stopped),
            _ => None,
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, ReaderStatus::On)
    }
}

impl fmt::Display for ReaderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderStatus::On => f.write_str("on"),
            ReaderStatus::Stopped => f.write_str("stop"),
        }
    }
}
