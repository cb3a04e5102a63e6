//! Reassembler Tests
//!
//! Tests for turning raw chunks into complete frames.

use rfrain_realtime::protocol::{FrameKind, Reassembler, ResponseFrame};

const POWER: &str = "ack nummessages=1\r\nack response=26 dBm\r\n";
const START: &str =
    "ack nummessages=2\r\nack response=on\r\nack message=RFRain API - Reader started successfully\r\n";
const TAG: &str = "ack nummessages=2\r\nack taginfo=g1 r1 PRES E2000 24 PRES Zone1 -40 2021-01-01T00:00:00Z 3\r\nack tid=ABC\r\n";

fn feed_all(reassembler: &mut Reassembler, chunks: &[&[u8]]) -> Vec<ResponseFrame> {
    chunks
        .iter()
        .flat_map(|chunk| reassembler.feed(chunk))
        .collect()
}

// =============================================================================
// Basic Framing Tests
// =============================================================================

#[test]
fn test_single_frame_single_chunk() {
    let mut reassembler = Reassembler::new();
    let frames = reassembler.feed(POWER.as_bytes());

    assert_eq!(frames.len(), 1);
    assert_eq!(
        frames[0].lines(),
        &["ack nummessages=1".to_string(), "ack response=26 dBm".to_string()]
    );
    assert!(reassembler.is_idle());
    assert_eq!(reassembler.remaining(), None);
}

#[test]
fn test_two_message_frame() {
    let mut reassembler = Reassembler::new();
    let frames = reassembler.feed(START.as_bytes());

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].declared_count(), Some(2));
    assert_eq!(frames[0].ack_count(), 2);
    assert_eq!(frames[0].secondary().unwrap().key, "message");
}

#[test]
fn test_countdown_consumes_exactly_declared_lines() {
    let mut reassembler = Reassembler::new();
    let text = format!("{}{}", START, POWER);
    let frames = reassembler.feed(text.as_bytes());

    assert_eq!(frames.len(), 2);
    for frame in &frames {
        assert_eq!(Some(frame.ack_count()), frame.declared_count());
    }
}

#[test]
fn test_frame_waits_for_countdown() {
    let mut reassembler = Reassembler::new();

    let frames = reassembler.feed(b"ack nummessages=2\r\nack response=on\r\n");
    assert!(frames.is_empty());
    assert_eq!(reassembler.remaining(), Some(1));
    assert_eq!(reassembler.buffered_lines(), 2);

    let frames = reassembler.feed(b"ack message=Reader started successfully\r\n");
    assert_eq!(frames.len(), 1);
    assert!(reassembler.is_idle());
}

// =============================================================================
// Coalescing and Splitting Tests
// =============================================================================

#[test]
fn test_coalesced_frames_in_one_chunk() {
    let mut reassembler = Reassembler::new();
    let text = format!("{}{}{}", POWER, TAG, START);
    let frames = reassembler.feed(text.as_bytes());

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].classify(), FrameKind::Response);
    assert_eq!(frames[1].classify(), FrameKind::TagEvent);
    assert_eq!(frames[2].classify(), FrameKind::Response);
}

#[test]
fn test_split_at_every_offset_matches_single_chunk() {
    let text = format!("{}{}", POWER, START);
    let bytes = text.as_bytes();

    let expected = Reassembler::new().feed(bytes);
    assert_eq!(expected.len(), 2);

    for split in 1..bytes.len() {
        let mut reassembler = Reassembler::new();
        let frames = feed_all(&mut reassembler, &[&bytes[..split], &bytes[split..]]);
        assert_eq!(frames, expected, "split at byte {}", split);
        assert!(reassembler.is_idle(), "split at byte {}", split);
    }
}

#[test]
fn test_byte_at_a_time() {
    let text = format!("{}{}{}", TAG, POWER, START);
    let expected = Reassembler::new().feed(text.as_bytes());

    let mut reassembler = Reassembler::new();
    let chunks: Vec<&[u8]> = text.as_bytes().chunks(1).collect();
    let frames = feed_all(&mut reassembler, &chunks);

    assert_eq!(frames, expected);
}

#[test]
fn test_partial_line_is_held() {
    let mut reassembler = Reassembler::new();

    let frames = reassembler.feed(b"ack nummessages=1\r\nack resp");
    assert!(frames.is_empty());
    assert_eq!(reassembler.partial_len(), "ack resp".len());

    let frames = reassembler.feed(b"onse=stop\r\n");
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].primary().unwrap().value, "stop");
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_new_header_flushes_short_frame() {
    let mut reassembler = Reassembler::new();

    // Declares 2 but only one line arrives before the next frame
    let text = format!("ack nummessages=2\r\nack response=on\r\n{}", POWER);
    let frames = reassembler.feed(text.as_bytes());

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].lines().len(), 2);
    assert_eq!(frames[0].primary().unwrap().value, "on");
    assert_eq!(frames[1].primary().unwrap().value, "26 dBm");
    assert!(reassembler.is_idle());

    // State is clean for whatever follows
    let frames = reassembler.feed(START.as_bytes());
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].ack_count(), 2);
}

#[test]
fn test_header_after_short_frame_is_its_own_frame() {
    let mut reassembler = Reassembler::new();
    let text = format!("ack nummessages=3\r\nack response=on\r\n{}", POWER);
    let frames = reassembler.feed(text.as_bytes());

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].primary().unwrap().value, "26 dBm");
}

#[test]
fn test_unterminated_line_recovered_at_next_header() {
    let mut reassembler = Reassembler::new();

    // The reader forgot the CRLF after the primary line
    let text = format!("ack nummessages=1\r\nack response=stop{}", POWER);
    let frames = reassembler.feed(text.as_bytes());

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].lines(), &["ack nummessages=1".to_string(), "ack response=stop".to_string()]);
    assert_eq!(frames[1].primary().unwrap().value, "26 dBm");
}

#[test]
fn test_header_without_digits_defaults_to_one() {
    let mut reassembler = Reassembler::new();
    let frames = reassembler.feed(b"ack nummessages=\r\nack response=stop\r\n");

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].ack_count(), 1);
}

#[test]
fn test_zero_count_dispatches_header_alone() {
    let mut reassembler = Reassembler::new();
    let frames = reassembler.feed(b"ack nummessages=0\r\n");

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].ack_count(), 0);
    assert!(reassembler.is_idle());
}

#[test]
fn test_leading_text_joins_previous_ack() {
    let mut reassembler = Reassembler::new();

    // A terminator landed inside the primary value
    let frames = reassembler.feed(b"ack nummessages=2\r\nack response=o\r\nn ack message=done\r\n");

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].ack_count(), 2);
    assert_eq!(frames[0].primary().unwrap().value, "on");
    assert_eq!(frames[0].secondary().unwrap().value, "done");
}

#[test]
fn test_continuation_line_appended() {
    let mut reassembler = Reassembler::new();
    let frames = reassembler.feed(b"ack nummessages=2\r\nack response=on\r\nwrapped text\r\nack message=done\r\n");

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].primary().unwrap().value, "onwrapped text");
    assert_eq!(frames[0].secondary().unwrap().value, "done");
}

#[test]
fn test_words_ending_in_ack_are_not_markers() {
    let mut reassembler = Reassembler::new();
    let frames = reassembler.feed(
        b"ack nummessages=2\r\nack response=see \r\nfeedback ack = none\r\nack message=x\r\n",
    );

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].ack_count(), 2);
    assert_eq!(frames[0].primary().unwrap().value, "see feedback ack = none");
}

#[test]
fn test_blank_lines_ignored() {
    let mut reassembler = Reassembler::new();
    let frames = reassembler.feed(b"\r\n\r\nack nummessages=1\r\n\r\nack response=stop\r\n\r\n");

    assert_eq!(frames.len(), 1);
    assert!(reassembler.is_idle());
}

#[test]
fn test_orphan_lines_ride_with_next_header() {
    let mut reassembler = Reassembler::new();

    // No header seen yet: lines are buffered, then dispatched before the header
    let mut frames = reassembler.feed(b"ack response=stray\r\n");
    assert!(frames.is_empty());

    frames.extend(reassembler.feed(POWER.as_bytes()));
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].classify(), FrameKind::Garbage);
    assert_eq!(frames[1].classify(), FrameKind::Response);
}

#[test]
fn test_reset_drops_state() {
    let mut reassembler = Reassembler::new();
    reassembler.feed(b"ack nummessages=2\r\nack response=on\r\nack mess");
    assert!(!reassembler.is_idle());

    reassembler.reset();
    assert!(reassembler.is_idle());
    assert_eq!(reassembler.remaining(), None);

    let frames = reassembler.feed(POWER.as_bytes());
    assert_eq!(frames.len(), 1);
}
