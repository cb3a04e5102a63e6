//! Response correlation
//!
//! The protocol has no request identifier, so a buffered frame is matched to
//! the awaiting request purely by shape: the announced message count, then
//! the content of the primary line (enumeration membership, numeric range,
//! fixed suffix or token count).

use crate::error::{ReaderError, Result};
use super::frame::{AckLine, ResponseFrame};
use super::request::{RequestKind, MONITOR_RANGE};
use super::settings::{Mode, ReadMode, ReaderStatus, TagMode, Target, REGIONS};
use super::ERROR_MARKER;

/// Value returned by setters that were acknowledged successfully
pub const SUCCESS: &str = "success";

/// Check whether `frame` answers a request of `kind`
///
/// Returns the decoded payload on a match and `None` when the frame belongs
/// to some other exchange. A frame carrying the reader's error marker, or a
/// setter acknowledgement reporting failure, is an error for `kind`.
pub fn match_frame(kind: RequestKind, frame: &ResponseFrame) -> Result<Option<String>> {
    let declared = match frame.declared_count() {
        Some(count) => count,
        None => return Ok(None),
    };

    if let Some(text) = frame.primary_text() {
        if text.contains(ERROR_MARKER) {
            return Err(ReaderError::Protocol {
                kind,
                detail: text.trim().to_string(),
            });
        }
    }

    if declared != kind.expected_messages() {
        return Ok(None);
    }

    let primary = match frame.primary() {
        Some(line) => line,
        None => return Ok(None),
    };

    let value = primary.value;

    let matched = match kind {
        // The only exchange whose answer is not a `response` line
        RequestKind::Connect => primary.key == "version",
        _ if primary.key != "response" => false,
        RequestKind::GetId => is_reader_id(value),
        RequestKind::GetIdentity => token_count(value) == 2,
        RequestKind::GetMode => Mode::from_token(value).is_some(),
        RequestKind::GetRegion => REGIONS.iter().any(|region| value.starts_with(region)),
        RequestKind::GetPower => parse_power(value).is_some(),
        RequestKind::GetSubzones => token_count(value) == 4,
        RequestKind::GetMonitor => value
            .parse::<u16>()
            .map(|seconds| MONITOR_RANGE.contains(&seconds))
            .unwrap_or(false),
        RequestKind::GetTarget => Target::from_token(value).is_some(),
        RequestKind::GetReadMode => ReadMode::from_token(value).is_some(),
        RequestKind::GetTagMode => TagMode::from_token(value).is_some(),
        RequestKind::GetStatus => ReaderStatus::from_token(value).is_some(),
        RequestKind::GetMute => value == "com mute on" || value == "com mute off",
        RequestKind::Start => {
            value == "on" && message_mentions(frame.secondary(), &["started"])
        }
        RequestKind::Stop => {
            value == "stop"
                && message_mentions(frame.secondary(), &["stopped", "completed successfully"])
        }
        RequestKind::SetMute => {
            if !value.starts_with("com set mute ") {
                return Ok(None);
            }
            // A truncated "com set mute O" is still accepted
            if value.contains("com set mute O") {
                return Ok(Some(SUCCESS.to_string()));
            }
            return Err(ReaderError::Protocol {
                kind,
                detail: format!("mute not confirmed: {}", value),
            });
        }
        RequestKind::SetIdentity
        | RequestKind::SetMode
        | RequestKind::SetPower
        | RequestKind::SetSubzone
        | RequestKind::SetMonitor
        | RequestKind::SetTarget
        | RequestKind::SetReadMode
        | RequestKind::SetTagMode => {
            if !is_message(frame.secondary()) {
                return Ok(None);
            }
            if value.starts_with(SUCCESS) {
                return Ok(Some(SUCCESS.to_string()));
            }
            return Err(ReaderError::Protocol {
                kind,
                detail: format!("set was unsuccessful: {}", value),
            });
        }
    };

    Ok(matched.then(|| value.to_string()))
}

/// Parse a `<n> dBm` power response
pub fn parse_power(value: &str) -> Option<u8> {
    value.strip_suffix("dBm")?.trim().parse().ok()
}

/// Reader ids look like `B###EB######`
fn is_reader_id(value: &str) -> bool {
    value.len() >= 12 && value.starts_with('B') && value.get(4..6) == Some("EB")
}

fn token_count(value: &str) -> usize {
    value.split_whitespace().count()
}

fn is_message(line: Option<AckLine<'_>>) -> bool {
    matches!(line, Some(line) if line.key == "message")
}

fn message_mentions(line: Option<AckLine<'_>>, phrases: &[&str]) -> bool {
    match line {
        Some(line) if line.key == "message" => {
            let text = line.value.to_ascii_lowercase();
            phrases.iter().any(|phrase| text.contains(phrase))
        }
        _ => false,
    }
}
