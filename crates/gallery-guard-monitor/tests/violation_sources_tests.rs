//! Integration tests for violation sources and their thresholds.

use std::sync::Arc;

use gallery_guard_core::{GuardConfig, KeyCombo};
use gallery_guard_monitor::{
    BreakpointTimer, ContentAction, ContentTarget, DebuggerPauseDetector, DevToolsDetector,
    ResizeMonitor, ShortcutPolicy, ShortcutVerdict, TabSwitchMonitor, Violation,
    WindowGapDetector, WindowMetrics, WindowMetricsSource, classify_content_action,
};

struct DockedPanel;

impl WindowMetricsSource for DockedPanel {
    fn sample(&self) -> Option<WindowMetrics> {
        Some(WindowMetrics {
            outer_width: 1920,
            outer_height: 1080,
            inner_width: 1500,
            inner_height: 1000,
        })
    }
}

struct NoMetrics;

impl WindowMetricsSource for NoMetrics {
    fn sample(&self) -> Option<WindowMetrics> {
        None
    }
}

struct SteppingDebugger;

impl BreakpointTimer for SteppingDebugger {
    fn measure_pause_ms(&self) -> Option<u64> {
        Some(2_500)
    }
}

#[test]
fn violation_sources_tests_shortcut_policy_depends_on_block_state() {
    let policy = ShortcutPolicy::from_config(&GuardConfig::default());
    let view_source = KeyCombo::new("u").ctrl();
    let reload = KeyCombo::new("F5");
    let close_tab = KeyCombo::new("w").ctrl();

    assert_eq!(
        policy.classify(&view_source, false),
        ShortcutVerdict::Violation(Violation::BlockedShortcut(view_source.clone()))
    );
    assert_eq!(policy.classify(&close_tab, false), ShortcutVerdict::Allowed);

    assert_eq!(
        policy.classify(&reload, true),
        ShortcutVerdict::EscapeAttempt(reload.clone())
    );
    assert_eq!(policy.classify(&view_source, true), ShortcutVerdict::Allowed);
}

#[test]
fn violation_sources_tests_extra_modifiers_still_match() {
    let policy = ShortcutPolicy::from_config(&GuardConfig::default());
    let hard_reload = KeyCombo::new("R").ctrl().shift();
    assert!(matches!(
        policy.classify(&hard_reload, false),
        ShortcutVerdict::Violation(Violation::BlockedShortcut(_))
    ));
}

#[test]
fn violation_sources_tests_only_protected_content_counts() {
    assert_eq!(
        classify_content_action(ContentAction::DragStart, ContentTarget::Image),
        Some(Violation::Drag)
    );
    assert_eq!(
        classify_content_action(ContentAction::SelectStart, ContentTarget::Protected),
        Some(Violation::Selection)
    );
    assert_eq!(
        classify_content_action(ContentAction::ContextMenu, ContentTarget::Other),
        None
    );
}

#[test]
fn violation_sources_tests_tab_switches_fire_after_limit() {
    let mut monitor = TabSwitchMonitor::new(3);
    for _ in 0..3 {
        assert_eq!(monitor.on_hidden(), None);
    }
    assert_eq!(
        monitor.on_hidden(),
        Some(Violation::ExcessiveTabSwitches { count: 4 })
    );
    assert_eq!(
        monitor.on_hidden(),
        Some(Violation::ExcessiveTabSwitches { count: 5 })
    );
    assert_eq!(monitor.count(), 5);
}

#[test]
fn violation_sources_tests_resize_burst_raises_once_then_resets() {
    let mut monitor = ResizeMonitor::new(5);
    let fired: Vec<bool> = (0..12).map(|_| monitor.on_resize().is_some()).collect();
    let expected: Vec<bool> = (1..=12).map(|n| n % 6 == 0).collect();
    assert_eq!(fired, expected);
}

#[test]
fn violation_sources_tests_detectors_report_their_violation() {
    let gap = WindowGapDetector::new(Arc::new(DockedPanel), 160);
    assert!(gap.detect());
    assert_eq!(gap.violation(), Violation::DevToolsWindowGap);

    let blind = WindowGapDetector::new(Arc::new(NoMetrics), 160);
    assert!(!blind.detect());

    let debugger = DebuggerPauseDetector::new(Arc::new(SteppingDebugger), 100);
    assert!(debugger.detect());
    assert_eq!(debugger.name(), "debugger_pause");
    assert_eq!(debugger.violation(), Violation::DebuggerPause);
}
