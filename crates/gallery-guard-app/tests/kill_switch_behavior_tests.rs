//! Integration tests for runtime kill-switch behavior.

mod common;

use gallery_guard_app::{GuardRuntime, PageEvent, protection_enabled_from_env};
use gallery_guard_core::GuardConfig;

#[test]
fn kill_switch_behavior_tests_disables_protection_when_env_is_false() {
    // Safety:
    // - Integration tests mutate process env in a single-threaded test body.
    // - We reset the variable before returning.
    unsafe { std::env::set_var("GALLERY_GUARD_PROTECTION_ENABLED", "OFF") };
    assert!(!protection_enabled_from_env());

    // Safety: see rationale above.
    unsafe { std::env::set_var("GALLERY_GUARD_PROTECTION_ENABLED", "yes") };
    assert!(protection_enabled_from_env());

    // Safety: see rationale above.
    unsafe { std::env::remove_var("GALLERY_GUARD_PROTECTION_ENABLED") };
    assert!(protection_enabled_from_env());
}

#[test]
fn kill_switch_behavior_tests_disabled_runtime_ignores_violations() {
    let harness = common::Harness::new(0);
    let (mut runtime, effects) = GuardRuntime::start(
        GuardConfig::default(),
        harness.deps(),
        common::fixture_page(),
        false,
    )
    .expect("runtime starts");
    assert!(effects.is_empty());
    assert!(runtime.resolve_visitor().is_empty());
    assert_eq!(runtime.controller().logs().len(), 1);

    for _ in 0..5 {
        assert!(runtime.handle(&PageEvent::Copy).is_empty());
    }
    assert!(!runtime.controller().is_blocked());
    assert!(!runtime.protection_enabled());
}
