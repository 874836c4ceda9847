//! Integration tests for scripted replays.

use gallery_guard_app::{Effect, ReplayScript, replay};

const DEMO: &str = include_str!("../../../demos/reload-bypass.json");

#[test]
fn replay_script_tests_demo_reload_bypass_extends_then_expires() {
    let script: ReplayScript = serde_json::from_str(DEMO).expect("demo script parses");
    let report = replay(&script, true).expect("replay runs");

    assert_eq!(report.loads, 2);
    assert_eq!(report.effects.len(), 12);
    let renders: Vec<_> = report
        .effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::RenderLockout { view } => Some(view.remaining.as_str()),
            _ => None,
        })
        .collect();
    // Unload before the reload does not add to the reload's extension.
    assert_eq!(renders, vec!["10m 0s", "15m 0s"]);
    assert!(report.effects.iter().any(|effect| matches!(
        effect,
        Effect::UpdateVisitorDetails { ip, .. } if ip == "unknown"
    )));
    assert_eq!(report.effects.last(), Some(&Effect::Reload));

    assert!(!report.status.blocked);
    assert_eq!(report.status.suspicious_count, 2);
    assert_eq!(report.delivered, 11);
}

#[test]
fn replay_script_tests_kill_switch_replays_without_effects() {
    let script: ReplayScript = serde_json::from_str(DEMO).expect("demo script parses");
    let report = replay(&script, false).expect("replay runs");

    assert!(report.effects.is_empty());
    assert!(!report.status.protection_enabled);
    assert_eq!(report.status.suspicious_count, 0);
}

#[test]
fn replay_script_tests_rejects_plain_http_collector() {
    let script: ReplayScript = serde_json::from_str(
        r#"{ "config": { "collector_endpoint": "http://collector.test/" }, "steps": [] }"#,
    )
    .expect("script parses");
    assert!(replay(&script, true).is_err());
}
