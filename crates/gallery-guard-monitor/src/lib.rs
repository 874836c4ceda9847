#![warn(missing_docs)]
//! # gallery-guard-monitor
//!
//! ## Purpose
//! Classifies raw page events into violations.
//!
//! ## Responsibilities
//! - Guard protected visual content against context menus, drags and selection.
//! - Classify key presses against the protected and escape shortcut sets.
//! - Host the pluggable dev-tools heuristics (window gap, debugger pause).
//! - Count tab switches and resizes per load.
//!
//! ## Data flow
//! Host event -> classifier in this crate -> [`Violation`] -> lockout
//! controller counter.
//!
//! ## Ownership and lifetimes
//! Detectors hold their metric sources as shared trait objects so a host can
//! reuse one window handle for several checks.
//!
//! ## Error model
//! Classification is total. A detector that cannot measure reports "not
//! detected".
//!
//! ## Security and privacy notes
//! Heuristics here are racy by nature and only ever raise suspicion; they are
//! never the sole input to a block decision beyond the configured threshold.

use std::fmt;
use std::sync::Arc;

use gallery_guard_core::{GuardConfig, KeyCombo};
use serde::{Deserialize, Serialize};

/// Kind of element an input event targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTarget {
    /// A gallery image.
    Image,
    /// Any element explicitly marked protected.
    Protected,
    /// Unprotected content.
    Other,
}

impl ContentTarget {
    /// Returns `true` for content the guard defends.
    pub fn is_protected(self) -> bool {
        matches!(self, ContentTarget::Image | ContentTarget::Protected)
    }
}

/// Pointer-level interaction on page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentAction {
    /// Context menu request.
    ContextMenu,
    /// Drag start.
    DragStart,
    /// Text/content selection start.
    SelectStart,
}

/// One suspicious event. Each increments the violation counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Context menu on protected content.
    ContextMenu,
    /// Drag of protected content.
    Drag,
    /// Selection of protected content.
    Selection,
    /// Protected shortcut pressed.
    BlockedShortcut(KeyCombo),
    /// Outer/inner window gap above threshold.
    DevToolsWindowGap,
    /// Breakpoint took longer than the pause threshold.
    DebuggerPause,
    /// Tab switch count above limit.
    ExcessiveTabSwitches {
        /// Hidden transitions so far.
        count: u32,
    },
    /// Copy attempt.
    Copy,
    /// Print attempt.
    Print,
    /// Resize count above limit.
    ExcessiveResizes,
}

impl Violation {
    /// `true` when the host should flash the protection alert.
    pub fn shows_alert(&self) -> bool {
        matches!(
            self,
            Violation::ContextMenu
                | Violation::Drag
                | Violation::BlockedShortcut(_)
                | Violation::Print
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::ContextMenu => f.write_str("Context menu on protected image"),
            Violation::Drag => f.write_str("Drag of protected image"),
            Violation::Selection => f.write_str("Selection of protected content"),
            Violation::BlockedShortcut(combo) => write!(f, "Blocked shortcut: {combo}"),
            Violation::DevToolsWindowGap => f.write_str("Developer tools detected (window size)"),
            Violation::DebuggerPause => f.write_str("Debugger detected"),
            Violation::ExcessiveTabSwitches { count } => {
                write!(f, "Suspicious tab switching ({count})")
            }
            Violation::Copy => f.write_str("Copy attempt"),
            Violation::Print => f.write_str("Print attempt"),
            Violation::ExcessiveResizes => f.write_str("Suspicious resizing"),
        }
    }
}

/// Classifies a pointer action against its target.
///
/// Returns `None` for unprotected content and for selection of images that
/// the host does not mark protected.
pub fn classify_content_action(action: ContentAction, target: ContentTarget) -> Option<Violation> {
    if !target.is_protected() {
        return None;
    }
    Some(match action {
        ContentAction::ContextMenu => Violation::ContextMenu,
        ContentAction::DragStart => Violation::Drag,
        ContentAction::SelectStart => Violation::Selection,
    })
}

/// Result of classifying one key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutVerdict {
    /// Let the key through.
    Allowed,
    /// Suppress the key and record a violation.
    Violation(Violation),
    /// Suppress the key while blocked. Counted and warned like any violation
    /// while blocked; never extends the block.
    EscapeAttempt(KeyCombo),
}

/// Protected and escape shortcut sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutPolicy {
    protected: Vec<KeyCombo>,
    escape: Vec<KeyCombo>,
}

impl ShortcutPolicy {
    /// Creates a policy from explicit sets.
    pub fn new(protected: Vec<KeyCombo>, escape: Vec<KeyCombo>) -> Self {
        Self { protected, escape }
    }

    /// Builds the policy from configuration.
    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(
            config.protected_shortcuts.clone(),
            config.escape_shortcuts.clone(),
        )
    }

    /// Classifies `pressed` for the current block state.
    pub fn classify(&self, pressed: &KeyCombo, blocked: bool) -> ShortcutVerdict {
        if blocked {
            if self.escape.iter().any(|combo| combo.matches(pressed)) {
                return ShortcutVerdict::EscapeAttempt(pressed.clone());
            }
            return ShortcutVerdict::Allowed;
        }

        if self.protected.iter().any(|combo| combo.matches(pressed)) {
            return ShortcutVerdict::Violation(Violation::BlockedShortcut(pressed.clone()));
        }
        ShortcutVerdict::Allowed
    }
}

/// Pluggable dev-tools presence heuristic.
pub trait DevToolsDetector: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Runs one check.
    fn detect(&self) -> bool;

    /// Violation raised when [`DevToolsDetector::detect`] fires.
    fn violation(&self) -> Violation;
}

/// Outer and inner window dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowMetrics {
    /// Browser window width.
    pub outer_width: u32,
    /// Browser window height.
    pub outer_height: u32,
    /// Viewport width.
    pub inner_width: u32,
    /// Viewport height.
    pub inner_height: u32,
}

impl WindowMetrics {
    /// Returns `true` when either dimension gap exceeds `threshold_px`.
    pub fn gap_exceeds(&self, threshold_px: u32) -> bool {
        self.outer_width.saturating_sub(self.inner_width) > threshold_px
            || self.outer_height.saturating_sub(self.inner_height) > threshold_px
    }
}

/// Host-provided window metrics.
pub trait WindowMetricsSource: Send + Sync {
    /// Samples current metrics, or `None` when unavailable.
    fn sample(&self) -> Option<WindowMetrics>;
}

/// Detects docked dev-tools from the outer/inner window gap.
pub struct WindowGapDetector {
    source: Arc<dyn WindowMetricsSource>,
    threshold_px: u32,
}

impl WindowGapDetector {
    /// Creates the detector.
    pub fn new(source: Arc<dyn WindowMetricsSource>, threshold_px: u32) -> Self {
        Self {
            source,
            threshold_px,
        }
    }
}

impl DevToolsDetector for WindowGapDetector {
    fn name(&self) -> &'static str {
        "window_gap"
    }

    fn detect(&self) -> bool {
        self.source
            .sample()
            .is_some_and(|metrics| metrics.gap_exceeds(self.threshold_px))
    }

    fn violation(&self) -> Violation {
        Violation::DevToolsWindowGap
    }
}

/// Executes a breakpoint statement and reports the wall-clock time across it.
pub trait BreakpointTimer: Send + Sync {
    /// Returns elapsed milliseconds, or `None` when the measurement cannot run.
    fn measure_pause_ms(&self) -> Option<u64>;
}

/// Detects a paused or stepping debugger from breakpoint timing.
pub struct DebuggerPauseDetector {
    timer: Arc<dyn BreakpointTimer>,
    threshold_ms: u64,
}

impl DebuggerPauseDetector {
    /// Creates the detector.
    pub fn new(timer: Arc<dyn BreakpointTimer>, threshold_ms: u64) -> Self {
        Self {
            timer,
            threshold_ms,
        }
    }
}

impl DevToolsDetector for DebuggerPauseDetector {
    fn name(&self) -> &'static str {
        "debugger_pause"
    }

    fn detect(&self) -> bool {
        self.timer
            .measure_pause_ms()
            .is_some_and(|elapsed| elapsed > self.threshold_ms)
    }

    fn violation(&self) -> Violation {
        Violation::DebuggerPause
    }
}

/// Counts hidden transitions for one load.
#[derive(Debug, Clone)]
pub struct TabSwitchMonitor {
    limit: u32,
    hidden_count: u32,
}

impl TabSwitchMonitor {
    /// Creates a monitor tolerating `limit` switches.
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            hidden_count: 0,
        }
    }

    /// Records one hidden transition; returns a violation past the limit.
    pub fn on_hidden(&mut self) -> Option<Violation> {
        self.hidden_count = self.hidden_count.saturating_add(1);
        (self.hidden_count > self.limit).then_some(Violation::ExcessiveTabSwitches {
            count: self.hidden_count,
        })
    }

    /// Hidden transitions recorded so far.
    pub fn count(&self) -> u32 {
        self.hidden_count
    }
}

/// Counts resizes; raises one violation per `limit + 1` resizes.
#[derive(Debug, Clone)]
pub struct ResizeMonitor {
    limit: u32,
    count: u32,
}

impl ResizeMonitor {
    /// Creates a monitor tolerating `limit` resizes.
    pub fn new(limit: u32) -> Self {
        Self { limit, count: 0 }
    }

    /// Records one resize.
    pub fn on_resize(&mut self) -> Option<Violation> {
        self.count = self.count.saturating_add(1);
        if self.count > self.limit {
            // One violation per burst of resizes.
            self.count = 0;
            return Some(Violation::ExcessiveResizes);
        }
        None
    }
}
