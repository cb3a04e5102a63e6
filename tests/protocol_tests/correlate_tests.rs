//! Correlation Tests
//!
//! Tests for matching response frames to request kinds by shape.

use rfrain_realtime::protocol::{match_frame, parse_power, RequestKind, ResponseFrame, SUCCESS};
use rfrain_realtime::ReaderError;

fn single(value: &str) -> ResponseFrame {
    ResponseFrame::from_text(&format!("ack nummessages=1\r\nack response={}\r\n", value))
}

fn double(value: &str, message: &str) -> ResponseFrame {
    ResponseFrame::from_text(&format!(
        "ack nummessages=2\r\nack response={}\r\nack message={}\r\n",
        value, message
    ))
}

fn matched(kind: RequestKind, frame: &ResponseFrame) -> Option<String> {
    match_frame(kind, frame).unwrap()
}

// =============================================================================
// Getter Tests
// =============================================================================

#[test]
fn test_connect_matches_version() {
    let frame = ResponseFrame::from_text("ack nummessages=1\r\nack version=r1\r\n");
    assert_eq!(matched(RequestKind::Connect, &frame), Some("r1".to_string()));
    assert_eq!(matched(RequestKind::GetStatus, &frame), None);
}

#[test]
fn test_key_decides_connect_versus_getter() {
    // "on" would satisfy the status shape but arrives under the wrong key
    let frame = ResponseFrame::from_text("ack nummessages=1\r\nack version=on\r\n");
    assert_eq!(matched(RequestKind::GetStatus, &frame), None);
    assert_eq!(matched(RequestKind::SetMute, &frame), None);

    assert_eq!(matched(RequestKind::Connect, &single("r1")), None);
}

#[test]
fn test_get_power() {
    let frame = single("26 dBm");
    assert_eq!(matched(RequestKind::GetPower, &frame), Some("26 dBm".to_string()));
    assert_eq!(matched(RequestKind::GetMonitor, &frame), None);
    assert_eq!(parse_power("26 dBm"), Some(26));
    assert_eq!(parse_power("26dBm"), Some(26));
    assert_eq!(parse_power("26"), None);
}

#[test]
fn test_get_id_pattern() {
    assert!(matched(RequestKind::GetId, &single("B123EB456789")).is_some());
    assert!(matched(RequestKind::GetId, &single("B123XX456789")).is_none());
    assert!(matched(RequestKind::GetId, &single("B123EB")).is_none());
}

#[test]
fn test_get_identity_needs_two_tokens() {
    assert!(matched(RequestKind::GetIdentity, &single("readerName groupName")).is_some());
    assert!(matched(RequestKind::GetIdentity, &single("readerName")).is_none());
    assert!(matched(RequestKind::GetIdentity, &single("Zone1 empty empty empty")).is_none());
}

#[test]
fn test_get_subzones_needs_four_tokens() {
    assert!(matched(RequestKind::GetSubzones, &single("Zone1 empty empty empty")).is_some());
    assert!(matched(RequestKind::GetSubzones, &single("Zone1 empty")).is_none());
}

#[test]
fn test_get_mode_exact_tokens() {
    assert_eq!(
        matched(RequestKind::GetMode, &single("ServerModeEnhanced")),
        Some("ServerModeEnhanced".to_string())
    );
    assert!(matched(RequestKind::GetMode, &single("ServerMode")).is_some());
    assert!(matched(RequestKind::GetMode, &single("Server")).is_none());
    assert!(matched(RequestKind::GetMode, &single("S1")).is_none());
}

#[test]
fn test_get_region_prefix() {
    assert!(matched(RequestKind::GetRegion, &single("North America")).is_some());
    assert!(matched(RequestKind::GetRegion, &single("Europe (ETSI)")).is_some());
    assert!(matched(RequestKind::GetRegion, &single("Antarctica")).is_none());
}

#[test]
fn test_get_monitor_range() {
    assert!(matched(RequestKind::GetMonitor, &single("10")).is_some());
    assert!(matched(RequestKind::GetMonitor, &single("3000")).is_some());
    assert!(matched(RequestKind::GetMonitor, &single("0")).is_none());
    assert!(matched(RequestKind::GetMonitor, &single("3001")).is_none());
    assert!(matched(RequestKind::GetMonitor, &single("ten")).is_none());
}

#[test]
fn test_enumeration_getters() {
    assert!(matched(RequestKind::GetTarget, &single("Target-AB")).is_some());
    assert!(matched(RequestKind::GetTarget, &single("Target_AB")).is_none());
    assert!(matched(RequestKind::GetReadMode, &single("S3")).is_some());
    assert!(matched(RequestKind::GetReadMode, &single("S4")).is_none());
    assert!(matched(RequestKind::GetTagMode, &single("EMBEDDED_TID_MEM")).is_some());
    assert!(matched(RequestKind::GetTagMode, &single("EMBEDDED")).is_none());
}

#[test]
fn test_get_status_and_mute() {
    assert_eq!(matched(RequestKind::GetStatus, &single("stop")), Some("stop".to_string()));
    assert_eq!(matched(RequestKind::GetStatus, &single("on")), Some("on".to_string()));
    assert!(matched(RequestKind::GetStatus, &single("off")).is_none());

    assert!(matched(RequestKind::GetMute, &single("com mute on")).is_some());
    assert!(matched(RequestKind::GetMute, &single("com mute off")).is_some());
    assert!(matched(RequestKind::GetMute, &single("com set mute OK")).is_none());
}

// =============================================================================
// Count Tests
// =============================================================================

#[test]
fn test_count_must_match_kind() {
    // A 2-message frame never answers a getter, even with a valid value
    let frame = double("26 dBm", "extra");
    assert_eq!(matched(RequestKind::GetPower, &frame), None);

    // A 1-message frame never answers start
    assert_eq!(matched(RequestKind::Start, &single("on")), None);
}

#[test]
fn test_frame_without_header_never_matches() {
    let frame = ResponseFrame::from_text("ack response=26 dBm\r\n");
    for kind in RequestKind::ALL {
        assert_eq!(matched(kind, &frame), None, "{}", kind);
    }
}

// =============================================================================
// Start / Stop / Mute Tests
// =============================================================================

#[test]
fn test_start_and_stop_messages() {
    let started = double("on", "RFRain API - Reader started successfully");
    let already = double("on", "WARNING: Reader is already started");
    let stopped = double("stop", "RFRain API - The command completed successfully");
    let already_stopped = double("stop", "Warning: Reader is already stopped");

    assert!(matched(RequestKind::Start, &started).is_some());
    assert!(matched(RequestKind::Start, &already).is_some());
    assert!(matched(RequestKind::Stop, &stopped).is_some());
    assert!(matched(RequestKind::Stop, &already_stopped).is_some());

    assert!(matched(RequestKind::Start, &stopped).is_none());
    assert!(matched(RequestKind::Stop, &started).is_none());
}

#[test]
fn test_message_spacing_tolerated() {
    let frame = ResponseFrame::from_text(
        "ack nummessages=2\r\nack response=on\r\nack message = Reader started successfully\r\n",
    );
    assert!(matched(RequestKind::Start, &frame).is_some());
}

#[test]
fn test_set_mute_ack() {
    assert_eq!(
        matched(RequestKind::SetMute, &single("com set mute OK")),
        Some(SUCCESS.to_string())
    );
    // Truncated acknowledgement still counts
    assert!(matched(RequestKind::SetMute, &single("com set mute O")).is_some());
    assert!(matched(RequestKind::SetMute, &single("26 dBm")).is_none());

    let err = match_frame(RequestKind::SetMute, &single("com set mute FAILED")).unwrap_err();
    assert!(matches!(err, ReaderError::Protocol { kind: RequestKind::SetMute, .. }));
}

// =============================================================================
// Setter Tests
// =============================================================================

#[test]
fn test_setter_success() {
    let frame = double("success", "additional power status info");
    for kind in RequestKind::ALL.iter().copied().filter(RequestKind::is_setter) {
        assert_eq!(matched(kind, &frame), Some(SUCCESS.to_string()), "{}", kind);
    }
}

#[test]
fn test_setter_failure_is_protocol_error() {
    let frame = double("failure", "bad value");
    let err = match_frame(RequestKind::SetPower, &frame).unwrap_err();

    match err {
        ReaderError::Protocol { kind, detail } => {
            assert_eq!(kind, RequestKind::SetPower);
            assert!(detail.contains("failure"));
        }
        other => panic!("Expected protocol error, got {:?}", other),
    }
}

#[test]
fn test_setter_needs_message_line() {
    let frame = ResponseFrame::from_text(
        "ack nummessages=2\r\nack response=success\r\nack note=x\r\n",
    );
    assert_eq!(matched(RequestKind::SetMode, &frame), None);
}

// =============================================================================
// Error Marker Tests
// =============================================================================

#[test]
fn test_error_marker_fails_any_kind() {
    let frame = single("reader ERROR: invalid command");

    for kind in RequestKind::ALL {
        let err = match_frame(kind, &frame).unwrap_err();
        assert_eq!(err.kind(), Some(kind));
        assert!(err.to_string().contains(kind.name()));
    }
}

#[test]
fn test_error_marker_ignores_declared_count() {
    // SetMonitor expects 2 messages; the error frame carries 1
    let err = match_frame(RequestKind::SetMonitor, &single("reader ERROR")).unwrap_err();
    assert!(matches!(err, ReaderError::Protocol { kind: RequestKind::SetMonitor, .. }));
}
