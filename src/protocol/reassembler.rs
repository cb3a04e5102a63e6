//! Frame reassembly
//!
//! Turns raw inbound chunks into complete frames. The protocol carries no
//! length prefix: a frame is a `ack nummessages=N` header followed by N ack
//! lines, and frames may be coalesced into one read or split across many.
//!
//! ## State
//! ```text
//!   empty ──nummessages──► counting(N) ──ack──► counting(N-1) ... ──► 0: dispatch ──► empty
//!                               │
//!                               └──nummessages──► dispatch current, counting(M)
//! ```
//!
//! Bytes are held until a CRLF arrives so a read that ends inside a line,
//! even inside a marker, never gets interpreted early. Lines then follow
//! four rules:
//! 1. `nummessages` with nothing buffered starts a frame.
//! 2. `nummessages` while buffering dispatches the buffered frame first.
//!    Text before the marker belongs to the old frame. A count without
//!    digits defaults to 1.
//! 3. An ack line counts down. Text before its marker is the tail of the
//!    previous ack.
//! 4. Anything else continues the previous line verbatim.

use bytes::{Buf, BytesMut};

use super::frame::{parse_leading_digits, ResponseFrame};
use super::{ACK_PREFIX, NUMMESSAGES_MARKER};

/// Initial capacity of the partial-line buffer
const INITIAL_CAPACITY: usize = 4 * 1024;

/// Per-connection reassembly state
#[derive(Debug)]
pub struct Reassembler {
    /// Bytes after the last CRLF
    partial: BytesMut,

    /// Lines of the frame being built
    lines: Vec<String>,

    /// Ack lines still expected, `None` before a header is seen
    remaining: Option<usize>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self {
            partial: BytesMut::with_capacity(INITIAL_CAPACITY),
            lines: Vec::new(),
            remaining: None,
        }
    }

    /// Feed one chunk, returning every frame it completes (in arrival order)
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ResponseFrame> {
        self.partial.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(end) = find_crlf(&self.partial) {
            let line = String::from_utf8_lossy(&self.partial[..end]).into_owned();
            self.partial.advance(end + 2);
            self.push_line(&line, &mut frames);
        }
        frames
    }

    /// Whether nothing is buffered
    pub fn is_idle(&self) -> bool {
        self.lines.is_empty() && self.partial.is_empty()
    }

    /// Ack lines still expected by the frame under construction
    pub fn remaining(&self) -> Option<usize> {
        self.remaining
    }

    /// Lines buffered for the frame under construction
    pub fn buffered_lines(&self) -> usize {
        self.lines.len()
    }

    /// Bytes held while waiting for a line terminator
    pub fn partial_len(&self) -> usize {
        self.partial.len()
    }

    /// Drop all state
    pub fn reset(&mut self) {
        self.partial.clear();
        self.lines.clear();
        self.remaining = None;
    }

    fn push_line(&mut self, line: &str, frames: &mut Vec<ResponseFrame>) {
        if line.trim().is_empty() {
            return;
        }

        if let Some(at) = line.find(NUMMESSAGES_MARKER) {
            let leftover = &line[..at];
            if !leftover.trim().is_empty() {
                match find_ack_marker(leftover) {
                    Some(_) => self.lines.push(leftover.to_string()),
                    None => self.append_to_last(leftover),
                }
            }
            if !self.lines.is_empty() {
                tracing::trace!(
                    "New frame header while buffering {} lines, dispatching early",
                    self.lines.len()
                );
                self.flush(frames);
            }

            let header = &line[at..];
            let count = parse_leading_digits(&header[NUMMESSAGES_MARKER.len()..]).unwrap_or(1);
            self.lines.push(header.to_string());
            self.remaining = Some(count);
            if count == 0 {
                self.flush(frames);
            }
        } else if let Some(at) = find_ack_marker(line) {
            if at > 0 {
                self.append_to_last(&line[..at]);
            }
            self.lines.push(line[at..].to_string());

            if let Some(remaining) = self.remaining.as_mut() {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    self.flush(frames);
                }
            }
        } else {
            self.append_to_last(line);
        }
    }

    fn append_to_last(&mut self, text: &str) {
        match self.lines.last_mut() {
            Some(last) => last.push_str(text),
            None => self.lines.push(text.to_string()),
        }
    }

    fn flush(&mut self, frames: &mut Vec<ResponseFrame>) {
        self.remaining = None;
        if !self.lines.is_empty() {
            frames.push(ResponseFrame::new(std::mem::take(&mut self.lines)));
        }
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

fn find_crlf(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).position(|pair| pair == b"\r\n")
}

/// Position of the first `ack <key>=` marker in `line`
///
/// The key must be a single word of letters, digits or underscores, so
/// words that merely end in "ack" inside a value are not mistaken for a
/// new line.
pub(crate) fn find_ack_marker(line: &str) -> Option<usize> {
    line.match_indices(ACK_PREFIX).map(|(at, _)| at).find(|&at| {
        let rest = &line[at + ACK_PREFIX.len()..];
        match rest.find('=') {
            Some(eq) => {
                let key = rest[..eq].trim_end();
                !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        }
    })
}
