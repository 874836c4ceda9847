//! Validates collector messages against the frozen JSON schema.

use gallery_guard_core::{BlockDetails, BlockReason, LogEntry, LogKind};
use gallery_guard_fingerprint::{
    EnvironmentSignals, Lookup, OriginDetails, RollingHash, VisitorProfile, compute_fingerprint,
};
use gallery_guard_report::LogMessage;
use jsonschema::JSONSchema;
use serde_json::Value;

const SCHEMA_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../contracts/log-message.schema.json"
);

fn load_json(path: &str) -> Value {
    let raw = std::fs::read_to_string(path).expect("json file should be readable");
    serde_json::from_str(&raw).expect("json file should be valid")
}

fn compile_validator() -> JSONSchema {
    let schema = load_json(SCHEMA_PATH);
    JSONSchema::compile(&schema).expect("schema should compile")
}

fn entry(kind: LogKind) -> LogEntry {
    LogEntry {
        kind,
        activity: "Copy attempt".to_string(),
        timestamp_ms: 1_772_360_100_000,
        session_id: "session-1772360100000-k3j9x0q2m".to_string(),
        fingerprint: None,
        url: "https://gallery.example.test/".to_string(),
        referrer: Some("https://search.example.test/".to_string()),
        count: Some(1),
        block: None,
    }
}

#[test]
fn log_message_fixture_matches_schema() {
    let validator = compile_validator();
    let fixture = load_json(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/fixtures/log-message.valid.json"
    ));
    assert!(
        validator.is_valid(&fixture),
        "log message fixture should validate against schema"
    );

    let decoded: LogMessage =
        serde_json::from_value(fixture).expect("fixture should decode as a log message");
    assert_eq!(decoded.kind, LogKind::Block);
}

#[test]
fn generated_messages_match_schema() {
    let validator = compile_validator();
    let signals = EnvironmentSignals {
        platform: Some("MacIntel".to_string()),
        ..EnvironmentSignals::default()
    };
    let profile = VisitorProfile {
        ip: "unknown".to_string(),
        origin: Lookup::<OriginDetails>::Unavailable("offline".to_string()),
        geolocation: Lookup::Unavailable("denied".to_string()),
        fingerprint: compute_fingerprint(&signals, &RollingHash),
        signals,
    };

    let suspicious = LogMessage::from_entry(&entry(LogKind::Suspicious), None)
        .expect("suspicious message builds");
    let mut block_entry = entry(LogKind::Block);
    block_entry.count = None;
    block_entry.block = Some(BlockDetails {
        reason: BlockReason::ReloadBypass,
        blocked_until_ms: 1_772_361_000_000,
        base_duration_ms: 600_000,
    });
    let block =
        LogMessage::from_entry(&block_entry, Some(&profile)).expect("block message builds");

    for message in [suspicious, block] {
        let value = serde_json::to_value(&message).expect("message serializes");
        assert!(
            validator.is_valid(&value),
            "generated {:?} message should validate against schema",
            message.kind
        );
    }
}

#[test]
fn message_without_session_is_rejected() {
    let validator = compile_validator();
    let mut fixture = load_json(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/fixtures/log-message.valid.json"
    ));
    fixture
        .as_object_mut()
        .expect("fixture is an object")
        .remove("session_id");
    assert!(!validator.is_valid(&fixture));
}
