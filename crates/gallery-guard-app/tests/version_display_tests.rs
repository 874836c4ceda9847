//! Integration tests for VERSION propagation into runtime display.

mod common;

use std::fs;

use gallery_guard_app::{GuardRuntime, app_version, project_runtime_status};
use gallery_guard_core::GuardConfig;

#[test]
fn version_display_tests_matches_root_version_file() {
    let root_version_path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../VERSION");
    let root_version = fs::read_to_string(root_version_path).expect("VERSION should be readable");
    assert_eq!(app_version(), root_version.trim());
}

#[test]
fn version_display_tests_status_carries_version() {
    let harness = common::Harness::new(0);
    let (mut runtime, _) = GuardRuntime::start(
        GuardConfig::default(),
        harness.deps(),
        common::fixture_page(),
        true,
    )
    .expect("runtime starts");
    assert!(project_runtime_status(&runtime).recent_activity.is_empty());

    runtime.resolve_visitor();
    let status = project_runtime_status(&runtime);
    assert_eq!(status.version, app_version());
    assert_eq!(status.recent_activity, vec!["VISIT: New visit".to_string()]);
}
