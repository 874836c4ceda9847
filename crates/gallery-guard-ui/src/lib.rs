#![warn(missing_docs)]
//! # gallery-guard-ui
//!
//! ## Purpose
//! Defines the view states shown to a visitor: the lockout screen and the
//! transient protection notices.
//!
//! ## Responsibilities
//! - Describe the full-viewport lockout view and its live countdown.
//! - List the event interceptors a host must install while blocked.
//! - Render views as self-contained HTML with escaped dynamic text.
//!
//! ## Data flow
//! Lockout transitions -> [`LockoutView`] -> host renderer (or
//! [`LockoutView::render_html`]). Timer ticks refresh
//! [`LockoutView::remaining`] through [`LockoutView::update_remaining`].
//!
//! ## Ownership and lifetimes
//! Views own all their strings so hosts can keep them across ticks.
//!
//! ## Error model
//! This crate favors explicit view state over recoverable errors.
//!
//! ## Security and privacy notes
//! Every dynamic value is HTML-escaped before rendering. Fingerprint and IP
//! stay as placeholders until known and never delay rendering.

use gallery_guard_core::BlockReason;
use serde::{Deserialize, Serialize};

/// Id of the lockout container element.
pub const CONTAINER_ID: &str = "block-screen";
/// Id of the countdown element.
pub const TIMER_ELEMENT_ID: &str = "block-timer";
/// Id of the fingerprint element.
pub const FINGERPRINT_ELEMENT_ID: &str = "block-fingerprint";
/// Id of the IP element.
pub const IP_ELEMENT_ID: &str = "block-ip";
/// Id of the violation warning element.
pub const WARNING_ELEMENT_ID: &str = "violation-warning";
/// Text shown while a best-effort value is still loading.
pub const LOADING_PLACEHOLDER: &str = "Loading...";

/// Events suppressed while blocked, in capture mode.
pub const SUPPRESSED_EVENTS: [&str; 16] = [
    "keydown",
    "keyup",
    "keypress",
    "mousedown",
    "mouseup",
    "click",
    "dblclick",
    "touchstart",
    "touchend",
    "touchmove",
    "contextmenu",
    "selectstart",
    "dragstart",
    "beforeunload",
    "unload",
    "pagehide",
];

/// Where an interceptor is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTarget {
    /// The document.
    Document,
    /// The window.
    Window,
}

/// Listener that cancels the default action and stops propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInterceptor {
    /// Attachment point.
    pub target: EventTarget,
    /// Event name.
    pub event: String,
    /// Installed in the capturing phase.
    pub capture: bool,
    /// Listener may call `preventDefault`.
    pub passive: bool,
}

/// Interceptors for every suppressed event on both document and window.
pub fn lockout_interceptors() -> Vec<EventInterceptor> {
    [EventTarget::Document, EventTarget::Window]
        .into_iter()
        .flat_map(|target| {
            SUPPRESSED_EVENTS.iter().map(move |event| EventInterceptor {
                target,
                event: (*event).to_string(),
                capture: true,
                passive: false,
            })
        })
        .collect()
}

/// Formats a countdown as `<m>m <s>s`.
pub fn format_remaining(remaining_ms: u64) -> String {
    let minutes = remaining_ms / 60_000;
    let seconds = (remaining_ms % 60_000) / 1_000;
    format!("{minutes}m {seconds}s")
}

/// Full-viewport, non-dismissable lockout screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutView {
    /// Container element id.
    pub container_id: String,
    /// Headline.
    pub title: String,
    /// Blocking message.
    pub message: String,
    /// Countdown text.
    pub remaining: String,
    /// Visitor fingerprint or placeholder.
    pub fingerprint: String,
    /// Visitor IP or placeholder.
    pub ip: String,
    /// Reason text.
    pub reason: String,
    /// Session token of this load.
    pub session_id: String,
    /// Warning banner.
    pub warning: String,
    /// Footer note.
    pub footer: String,
    /// Listeners the host must install.
    pub interceptors: Vec<EventInterceptor>,
}

impl LockoutView {
    /// Builds the lockout view for a freshly entered or restored block.
    pub fn new(reason: BlockReason, remaining_ms: u64, session_id: impl Into<String>) -> Self {
        Self {
            container_id: CONTAINER_ID.to_string(),
            title: "ACCESS BLOCKED".to_string(),
            message: "Repeated violations of the terms of use were detected.".to_string(),
            remaining: format_remaining(remaining_ms),
            fingerprint: LOADING_PLACEHOLDER.to_string(),
            ip: LOADING_PLACEHOLDER.to_string(),
            reason: reason.describe(),
            session_id: session_id.into(),
            warning: "ANY BYPASS ATTEMPT WILL EXTEND THE BLOCK".to_string(),
            footer: "Refresh, navigation and close attempts are detected and recorded.".to_string(),
            interceptors: lockout_interceptors(),
        }
    }

    /// Fills in the fingerprint once known.
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    /// Fills in the IP once known.
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = ip.into();
        self
    }

    /// Replaces the placeholders with the resolved visitor details.
    pub fn update_visitor(&mut self, fingerprint: impl Into<String>, ip: impl Into<String>) {
        self.fingerprint = fingerprint.into();
        self.ip = ip.into();
    }

    /// Refreshes the countdown text.
    pub fn update_remaining(&mut self, remaining_ms: u64) {
        self.remaining = format_remaining(remaining_ms);
    }

    /// Renders the view as a self-contained HTML fragment.
    pub fn render_html(&self) -> String {
        format!(
            r#"<div id="{container}" role="alertdialog" aria-modal="true">
  <style>
    #{container} {{ position: fixed; inset: 0; width: 100vw; height: 100vh; background: #000; color: #fff; display: flex; flex-direction: column; align-items: center; justify-content: center; text-align: center; z-index: 2147483647; font-family: Arial, sans-serif; padding: 20px; overflow: hidden; }}
    #{container} .block-title {{ color: #e74c3c; font-size: 2.5em; margin-bottom: 20px; }}
    #{container} .block-info {{ background: #222; padding: 15px; border-radius: 5px; max-width: 500px; word-break: break-all; margin: 20px 0; }}
    #{container} .warning-text {{ color: #ff6b6b; font-weight: bold; margin: 20px 0; }}
  </style>
  <div class="block-title">{title}</div>
  <p>{message}</p>
  <p>Time remaining: <span id="{timer_id}">{remaining}</span></p>
  <div class="block-info">
    <p><strong>Identifier:</strong> <span id="{fp_id}">{fingerprint}</span></p>
    <p><strong>IP address:</strong> <span id="{ip_id}">{ip}</span></p>
    <p><strong>Reason:</strong> {reason}</p>
    <p><strong>Session:</strong> {session}</p>
  </div>
  <div class="warning-text">{warning}</div>
  <p>{footer}</p>
</div>"#,
            container = escape_html(&self.container_id),
            title = escape_html(&self.title),
            message = escape_html(&self.message),
            timer_id = TIMER_ELEMENT_ID,
            remaining = escape_html(&self.remaining),
            fp_id = FINGERPRINT_ELEMENT_ID,
            fingerprint = escape_html(&self.fingerprint),
            ip_id = IP_ELEMENT_ID,
            ip = escape_html(&self.ip),
            reason = escape_html(&self.reason),
            session = escape_html(&self.session_id),
            warning = escape_html(&self.warning),
            footer = escape_html(&self.footer),
        )
    }
}

/// Brief translucent flash shown when a violation is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionAlert {
    /// Time the tint stays visible.
    pub visible_ms: u64,
    /// Fade-out duration before removal.
    pub fade_ms: u64,
    /// Stacking order, below the lockout screen.
    pub z_index: u32,
}

impl Default for ProtectionAlert {
    fn default() -> Self {
        Self {
            visible_ms: 500,
            fade_ms: 300,
            z_index: 9_998,
        }
    }
}

/// Centered warning shown when an escape shortcut is swallowed while blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationWarning {
    /// Element id; at most one warning is shown at a time.
    pub element_id: String,
    /// Headline.
    pub title: String,
    /// Body lines.
    pub lines: Vec<String>,
    /// Auto-dismiss delay.
    pub dismiss_after_ms: u64,
}

impl Default for ViolationWarning {
    fn default() -> Self {
        Self {
            element_id: WARNING_ELEMENT_ID.to_string(),
            title: "VIOLATION DETECTED".to_string(),
            lines: vec![
                "Shortcut blocked and recorded".to_string(),
                "The lockout stays in force until the timer ends".to_string(),
            ],
            dismiss_after_ms: 3_000,
        }
    }
}

/// Escapes text for HTML element and attribute content.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    //! Unit tests for countdown formatting and escaping.

    use super::*;

    #[test]
    fn countdown_uses_minutes_and_seconds() {
        assert_eq!(format_remaining(0), "0m 0s");
        assert_eq!(format_remaining(61_999), "1m 1s");
        assert_eq!(format_remaining(600_000), "10m 0s");
    }

    #[test]
    fn escapes_markup_in_dynamic_text() {
        assert_eq!(
            escape_html(r#"<b a="1">&'"#),
            "&lt;b a=&quot;1&quot;&gt;&amp;&#39;"
        );
    }
}
