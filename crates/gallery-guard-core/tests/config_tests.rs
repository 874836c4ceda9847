//! Integration tests for guard configuration decoding.

use gallery_guard_core::{CoreError, GuardConfig, KeyCombo};

#[test]
fn config_tests_accepts_overrides_and_shortcut_text() {
    let config = GuardConfig::from_json_str(
        r#"{
            "violation_threshold": 5,
            "privileged_origins": ["203.0.113.4", "2001:db8::1"],
            "protected_shortcuts": ["F12", "Ctrl+Shift+I"]
        }"#,
    )
    .expect("config should decode");

    assert_eq!(config.violation_threshold, 5);
    assert_eq!(config.base_block_duration_ms, 600_000);
    assert_eq!(
        config.protected_shortcuts,
        vec![KeyCombo::new("F12"), KeyCombo::new("I").ctrl().shift()]
    );
}

#[test]
fn config_tests_rejects_bad_origin_and_bad_shortcut() {
    let bad_origin = GuardConfig::from_json_str(r#"{ "privileged_origins": ["admin-host"] }"#);
    assert!(matches!(bad_origin, Err(CoreError::InvalidConfig(_))));

    let bad_shortcut = GuardConfig::from_json_str(r#"{ "escape_shortcuts": ["Hyper+Q"] }"#);
    assert!(matches!(bad_shortcut, Err(CoreError::Codec(_))));
}

#[test]
fn config_tests_rejects_zero_threshold() {
    let config = GuardConfig {
        violation_threshold: 0,
        ..GuardConfig::default()
    };
    assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));
}
