//! Request Tests
//!
//! Tests for command encoding, validation and the settings tables.

use rfrain_realtime::protocol::{
    Mode, ReadMode, ReaderStatus, Request, RequestKind, TagMode, Target, MAX_POWER_DBM,
    MIN_POWER_DBM,
};
use rfrain_realtime::ReaderError;

// =============================================================================
// Command Line Tests
// =============================================================================

#[test]
fn test_command_lines() {
    let cases = vec![
        (Request::Start, "com reader start\r\n"),
        (Request::Stop, "com reader stop\r\n"),
        (Request::GetPower, "com reader power\r\n"),
        (Request::GetReadMode, "com reader readmode\r\n"),
        (Request::GetMute, "com reader mute\r\n"),
        (Request::SetPower(28), "com reader set power 28\r\n"),
        (Request::SetMode(Mode::AutoCheckIn), "com reader set mode AutoCheckIn\r\n"),
        (Request::SetTarget(Target::BA), "com reader set target Target-BA\r\n"),
        (Request::SetTagMode(TagMode::EmbeddedEpcTid), "com reader set tagmode EMBEDDED_EPC_TID_MEM\r\n"),
        (
            Request::SetSubzone { port: 2, name: "Dock".to_string() },
            "com reader set subzone 2 Dock\r\n",
        ),
        (
            Request::SetIdentity { reader: "r1".to_string(), group: "g1".to_string() },
            "com reader set identity r1 g1\r\n",
        ),
        (Request::SetMute(true), "com reader set mute on\r\n"),
        (Request::SetMute(false), "com reader set mute off\r\n"),
    ];

    for (request, expected) in cases {
        assert_eq!(request.command_line().as_deref(), Some(expected), "{:?}", request);
    }
}

#[test]
fn test_connect_sends_nothing() {
    assert_eq!(Request::Connect.command_line(), None);
    assert_eq!(Request::Connect.kind(), RequestKind::Connect);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_power_range() {
    assert!(Request::SetPower(MIN_POWER_DBM).validate().is_ok());
    assert!(Request::SetPower(MAX_POWER_DBM).validate().is_ok());

    for level in [0, 9, 31, 100] {
        let err = Request::SetPower(level).validate().unwrap_err();
        assert!(matches!(err, ReaderError::Validation(_)), "level {}", level);
    }
}

#[test]
fn test_subzone_port_and_name() {
    let subzone = |port: u8, name: &str| Request::SetSubzone { port, name: name.to_string() };

    assert!(subzone(1, "Zone1").validate().is_ok());
    assert!(subzone(4, "12345678").validate().is_ok());

    assert!(subzone(0, "Zone1").validate().is_err());
    assert!(subzone(5, "Zone1").validate().is_err());
    assert!(subzone(1, "123456789").validate().is_err());
    assert!(subzone(1, "").validate().is_err());
    assert!(subzone(1, "two word").validate().is_err());
}

#[test]
fn test_monitor_range() {
    assert!(Request::SetMonitor(1).validate().is_ok());
    assert!(Request::SetMonitor(3000).validate().is_ok());
    assert!(Request::SetMonitor(0).validate().is_err());
    assert!(Request::SetMonitor(3001).validate().is_err());
}

#[test]
fn test_identity_tokens() {
    let identity = |reader: &str, group: &str| Request::SetIdentity {
        reader: reader.to_string(),
        group: group.to_string(),
    };

    assert!(identity("dock", "north").validate().is_ok());
    assert!(identity("", "north").validate().is_err());
    assert!(identity("dock door", "north").validate().is_err());
    assert!(identity("dock", "north\r\n").validate().is_err());
}

#[test]
fn test_getters_always_valid() {
    assert!(Request::GetMode.validate().is_ok());
    assert!(Request::Start.validate().is_ok());
}

// =============================================================================
// Kind Tests
// =============================================================================

#[test]
fn test_expected_messages() {
    assert_eq!(RequestKind::Start.expected_messages(), 2);
    assert_eq!(RequestKind::Stop.expected_messages(), 2);
    assert_eq!(RequestKind::SetPower.expected_messages(), 2);
    assert_eq!(RequestKind::SetMute.expected_messages(), 1);
    assert_eq!(RequestKind::GetPower.expected_messages(), 1);
    assert_eq!(RequestKind::Connect.expected_messages(), 1);
}

#[test]
fn test_setters_and_gating() {
    let setters: Vec<_> = RequestKind::ALL.iter().filter(|kind| kind.is_setter()).collect();
    assert_eq!(setters.len(), 8);
    assert!(!RequestKind::SetMute.is_setter());

    assert!(RequestKind::GetPower.is_mute_gated());
    assert!(RequestKind::Start.is_mute_gated());
    assert!(!RequestKind::SetMute.is_mute_gated());
    assert!(!RequestKind::GetMute.is_mute_gated());
    assert!(!RequestKind::Connect.is_mute_gated());
}

#[test]
fn test_kind_names() {
    assert_eq!(RequestKind::GetMode.to_string(), "get-mode");
    assert_eq!(RequestKind::SetReadMode.name(), "set-readmode");
    assert_eq!(Request::SetMonitor(10).kind(), RequestKind::SetMonitor);
}

// =============================================================================
// Settings Table Tests
// =============================================================================

#[test]
fn test_tokens_round_trip_through_tables() {
    for (token, mode) in Mode::TABLE {
        assert_eq!(Mode::from_token(token), Some(*mode));
        assert_eq!(mode.as_token(), *token);
    }
    for (token, target) in Target::TABLE {
        assert_eq!(target.to_string(), *token);
    }
}

#[test]
fn test_from_str() {
    assert_eq!("Target-A".parse::<Target>().unwrap(), Target::A);
    assert_eq!("S2".parse::<ReadMode>().unwrap(), ReadMode::S2);
    assert!(matches!("Target_A".parse::<Target>(), Err(ReaderError::Validation(_))));
    assert!("servermode".parse::<Mode>().is_err());
}

#[test]
fn test_tag_mode_event_messages() {
    assert_eq!(TagMode::EmbeddedTid.event_messages(), 2);
    assert_eq!(TagMode::EmbeddedEpcTid.event_messages(), 3);
    assert_eq!(TagMode::EmbeddedAll.event_messages(), 4);
}

#[test]
fn test_reader_status() {
    assert_eq!(ReaderStatus::from_token("on"), Some(ReaderStatus::On));
    assert_eq!(ReaderStatus::from_token("stop"), Some(ReaderStatus::Stopped));
    assert_eq!(ReaderStatus::from_token("off"), None);
    assert!(ReaderStatus::On.is_on());
    assert_eq!(ReaderStatus::Stopped.to_string(), "stop");
}
