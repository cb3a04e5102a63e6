//! Frame definitions
//!
//! A frame is the group of ack lines announced by one `ack nummessages=N`
//! header. Frames are either solicited responses or unsolicited tag events.

use super::{NUMMESSAGES_KEY, TAGINFO_KEY};

/// One `ack <key>=<value>` line, borrowed from its frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckLine<'a> {
    /// Text before the first `=`
    pub key: &'a str,

    /// Text after the first `=`
    pub value: &'a str,
}

impl<'a> AckLine<'a> {
    /// Parse an ack line
    ///
    /// Whitespace around the key and value is ignored, so both
    /// `ack message=text` and `ack message = text` parse.
    pub fn parse(line: &'a str) -> Option<Self> {
        let rest = line.trim().strip_prefix("ack")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let (key, value) = rest.split_once('=')?;
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return None;
        }
        Some(Self {
            key,
            value: value.trim(),
        })
    }
}

/// Disposition of a complete frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Unsolicited tag detection
    TagEvent,

    /// Acknowledgement to some request
    Response,

    /// Neither; dropped
    Garbage,
}

/// A complete group of ack lines
///
/// Line 0 is the `nummessages` header; outcomes are positional after it
/// (line 1 is the primary response, line 2 a secondary message).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseFrame {
    lines: Vec<String>,
}

impl ResponseFrame {
    /// Create a frame from its lines
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Parse a frame from CRLF separated text (test and tooling helper)
    pub fn from_text(text: &str) -> Self {
        Self::new(
            text.split(super::LINE_TERMINATOR)
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// All lines, header first
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines after the header
    pub fn ack_count(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }

    /// Count announced by the header line
    pub fn declared_count(&self) -> Option<usize> {
        let header = self.lines.first()?;
        let start = header.find(NUMMESSAGES_KEY)? + NUMMESSAGES_KEY.len();
        parse_leading_digits(&header[start..])
    }

    /// Parsed line at `index`
    pub fn ack(&self, index: usize) -> Option<AckLine<'_>> {
        self.lines.get(index).and_then(|line| AckLine::parse(line))
    }

    /// The primary response line (line 1)
    pub fn primary(&self) -> Option<AckLine<'_>> {
        self.ack(1)
    }

    /// Raw text of the primary line
    pub fn primary_text(&self) -> Option<&str> {
        self.lines.get(1).map(String::as_str)
    }

    /// The secondary message line (line 2)
    pub fn secondary(&self) -> Option<AckLine<'_>> {
        self.ack(2)
    }

    /// Whether any line contains `marker`
    pub fn contains(&self, marker: &str) -> bool {
        self.lines.iter().any(|line| line.contains(marker))
    }

    /// Decide what this frame is
    pub fn classify(&self) -> FrameKind {
        if self.contains(TAGINFO_KEY) {
            FrameKind::TagEvent
        } else if self.contains(NUMMESSAGES_KEY) {
            FrameKind::Response
        } else {
            FrameKind::Garbage
        }
    }
}

/// Parse the digits at the start of `text`, ignoring leading whitespace
pub(crate) fn parse_leading_digits(text: &str) -> Option<usize> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text[..end].parse().ok()
}
