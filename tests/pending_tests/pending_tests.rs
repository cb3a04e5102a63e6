//! Pending Response Tests
//!
//! Tests for the shared queue between the receive thread and the executor.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rfrain_realtime::pending::PendingResponses;
use rfrain_realtime::protocol::{match_frame, RequestKind, ResponseFrame};
use rfrain_realtime::ReaderError;

fn single(value: &str) -> ResponseFrame {
    ResponseFrame::from_text(&format!("ack nummessages=1\r\nack response={}\r\n", value))
}

// =============================================================================
// Queue Tests
// =============================================================================

#[test]
fn test_take_match_removes_only_matching_frame() {
    let pending = PendingResponses::new();
    pending.push(single("stop"));
    pending.push(single("26 dBm"));
    pending.push(single("10"));

    let power = pending
        .take_match(|frame| match_frame(RequestKind::GetPower, frame))
        .unwrap();
    assert_eq!(power, Some("26 dBm".to_string()));

    // Non-matching frames stay, in order
    assert_eq!(pending.len(), 2);
    let status = pending
        .take_match(|frame| match_frame(RequestKind::GetStatus, frame))
        .unwrap();
    assert_eq!(status.as_deref(), Some("stop"));
    let monitor = pending
        .take_match(|frame| match_frame(RequestKind::GetMonitor, frame))
        .unwrap();
    assert_eq!(monitor.as_deref(), Some("10"));
}

#[test]
fn test_take_match_oldest_first() {
    let pending = PendingResponses::new();
    pending.push(single("on"));
    pending.push(single("stop"));

    let first = pending
        .take_match(|frame| match_frame(RequestKind::GetStatus, frame))
        .unwrap();
    let second = pending
        .take_match(|frame| match_frame(RequestKind::GetStatus, frame))
        .unwrap();

    assert_eq!(first.as_deref(), Some("on"));
    assert_eq!(second.as_deref(), Some("stop"));
    assert!(pending.is_empty());
}

#[test]
fn test_no_match_leaves_queue_untouched() {
    let pending = PendingResponses::new();
    pending.push(single("stop"));

    let result = pending
        .take_match(|frame| match_frame(RequestKind::GetPower, frame))
        .unwrap();
    assert_eq!(result, None);
    assert_eq!(pending.len(), 1);
}

#[test]
fn test_error_frame_is_consumed() {
    let pending = PendingResponses::new();
    pending.push(single("reader ERROR"));
    pending.push(single("26 dBm"));

    let err = pending
        .take_match(|frame| match_frame(RequestKind::SetMonitor, frame))
        .unwrap_err();
    assert!(matches!(err, ReaderError::Protocol { .. }));
    assert_eq!(pending.len(), 1);
}

#[test]
fn test_clear() {
    let pending = PendingResponses::new();
    pending.push(single("stop"));
    pending.push(single("on"));

    pending.clear();
    assert!(pending.is_empty());
}

// =============================================================================
// Waiting Tests
// =============================================================================

#[test]
fn test_sequence_advances_on_push() {
    let pending = PendingResponses::new();
    let before = pending.sequence();

    pending.push(single("stop"));
    assert_eq!(pending.sequence(), before + 1);

    // Taking does not move the sequence
    pending.take_match(|frame| match_frame(RequestKind::GetStatus, frame)).unwrap();
    assert_eq!(pending.sequence(), before + 1);
}

#[test]
fn test_wait_returns_immediately_if_already_arrived() {
    let pending = PendingResponses::new();
    let seen = pending.sequence();
    pending.push(single("stop"));

    let start = Instant::now();
    assert!(pending.wait_for_arrival(seen, Instant::now() + Duration::from_secs(5)));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_wait_times_out() {
    let pending = PendingResponses::new();
    let seen = pending.sequence();

    let start = Instant::now();
    assert!(!pending.wait_for_arrival(seen, Instant::now() + Duration::from_millis(50)));
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[test]
fn test_wait_wakes_on_push_from_other_thread() {
    let pending = Arc::new(PendingResponses::new());
    let seen = pending.sequence();

    let producer = {
        let pending = Arc::clone(&pending);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            pending.push(single("26 dBm"));
        })
    };

    let start = Instant::now();
    assert!(pending.wait_for_arrival(seen, Instant::now() + Duration::from_secs(5)));
    assert!(start.elapsed() < Duration::from_secs(4));
    producer.join().unwrap();

    let power = pending
        .take_match(|frame| match_frame(RequestKind::GetPower, frame))
        .unwrap();
    assert_eq!(power.as_deref(), Some("26 dBm"));
}

#[test]
fn test_concurrent_producers() {
    let pending = Arc::new(PendingResponses::new());
    let mut handles = vec![];

    for i in 0..4 {
        let pending = Arc::clone(&pending);
        handles.push(thread::spawn(move || {
            for j in 0..25 {
                pending.push(single(&format!("{}", i * 100 + j + 1)));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(pending.len(), 100);
    assert_eq!(pending.sequence(), 100);
}
