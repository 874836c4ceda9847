//! Integration tests for lockout view contents and rendering.

use gallery_guard_core::BlockReason;
use gallery_guard_ui::{
    CONTAINER_ID, EventTarget, LOADING_PLACEHOLDER, LockoutView, SUPPRESSED_EVENTS,
    ViolationWarning, lockout_interceptors,
};

#[test]
fn lockout_view_tests_placeholders_until_profile_is_known() {
    let view = LockoutView::new(BlockReason::ReloadBypass, 90_000, "session-1-abc");
    assert_eq!(view.container_id, CONTAINER_ID);
    assert_eq!(view.fingerprint, LOADING_PLACEHOLDER);
    assert_eq!(view.ip, LOADING_PLACEHOLDER);
    assert_eq!(view.reason, "Bypass attempt by reload");
    assert_eq!(view.remaining, "1m 30s");

    let filled = view.with_fingerprint("fp-2e9").with_ip("203.0.113.9");
    assert_eq!(filled.fingerprint, "fp-2e9");
    assert_eq!(filled.ip, "203.0.113.9");
}

#[test]
fn lockout_view_tests_visitor_details_fill_in_place() {
    let mut view = LockoutView::new(BlockReason::ReloadBypass, 60_000, "session-1-abc");
    view.update_visitor("fp-abc", "unknown");
    assert_eq!(view.fingerprint, "fp-abc");
    assert_eq!(view.ip, "unknown");
    assert!(view.render_html().contains(r#"<span id="block-ip">unknown</span>"#));
}

#[test]
fn lockout_view_tests_escape_warning_does_not_promise_extension() {
    let warning = ViolationWarning::default();
    assert_eq!(warning.dismiss_after_ms, 3_000);
    assert!(
        warning
            .lines
            .iter()
            .all(|line| !line.to_ascii_lowercase().contains("extended"))
    );
}

#[test]
fn lockout_view_tests_interceptors_cover_document_and_window_in_capture_mode() {
    let interceptors = lockout_interceptors();
    assert_eq!(interceptors.len(), SUPPRESSED_EVENTS.len() * 2);
    assert!(interceptors.iter().all(|listener| listener.capture && !listener.passive));
    for event in SUPPRESSED_EVENTS {
        for target in [EventTarget::Document, EventTarget::Window] {
            assert!(
                interceptors
                    .iter()
                    .any(|listener| listener.target == target && listener.event == event)
            );
        }
    }
}

#[test]
fn lockout_view_tests_render_escapes_session_and_updates_timer() {
    let mut view = LockoutView::new(
        BlockReason::SuspiciousActivity { count: 3 },
        600_000,
        "<script>alert(1)</script>",
    );
    view.update_remaining(5_000);

    let html = view.render_html();
    assert!(html.contains(r#"id="block-screen""#));
    assert!(html.contains("0m 5s"));
    assert!(html.contains("Suspicious activity (3)"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));
}
