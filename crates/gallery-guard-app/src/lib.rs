#![warn(missing_docs)]
//! # gallery-guard-app
//!
//! ## Purpose
//! Wires the lockout controller, activity monitors, dev-tools detectors,
//! visitor profile and collector logger into one page runtime.
//!
//! ## Responsibilities
//! - Run load-time checks and render the lockout before any network lookup.
//! - Resolve the visitor profile afterwards and fill in the shown details.
//! - Translate host [`PageEvent`]s into controller calls.
//! - Turn controller transitions into rendering [`Effect`]s.
//! - Provide the kill switch, version display and log redaction helpers.
//! - Replay scripted event sequences against in-memory collaborators.
//!
//! ## Data flow
//! [`GuardRuntime::start`] -> lockout with placeholders ->
//! [`GuardRuntime::resolve_visitor`] -> visit log and details update.
//! Host event -> monitors/detectors -> [`LockoutController`] -> [`Effect`]s.
//! Every log entry flows to the [`RemoteLogger`] sink.
//!
//! ## Ownership and lifetimes
//! [`GuardRuntime`] owns one page load. A reload is modelled by dropping the
//! runtime and starting a new one over the same store.
//!
//! ## Error model
//! Construction failures are wrapped in [`AppError`]. Event handling never
//! fails; degraded collaborators only reduce what is logged.
//!
//! ## Security and privacy notes
//! - Kill-switch env var disables all protections at runtime.
//! - Privileged visitors pass through every handler untouched.
//! - Log redaction helpers strip token/credential strings.

use std::sync::Arc;

use gallery_guard_core::{
    BlockReason, Clock, CoreError, GuardConfig, KeyCombo, KeyValueStore, LogKind, ManualClock, MemoryStore,
    PageContext,
};
use gallery_guard_fingerprint::{
    CachingResolver, EnvironmentSignals, HashStrategy, OfflineResolver, OriginDetails,
    OriginResolver, RollingHash, SignalSource, StaticResolver, StaticSignalSource, UNKNOWN,
    VisitorProfile, compute_fingerprint, new_session_token, resolve_profile,
};
use gallery_guard_lockout::{
    BypassAttempt, Collaborators, GuardStatus, LockoutController, LockoutError, LockoutState,
    TickOutcome, Transition,
};
use gallery_guard_monitor::{
    ContentAction, ContentTarget, DevToolsDetector, ResizeMonitor, ShortcutPolicy,
    ShortcutVerdict, TabSwitchMonitor, Violation, classify_content_action,
};
use gallery_guard_report::{LogTransport, RecordingTransport, RemoteLogger, ReportError};
use gallery_guard_ui::{LOADING_PLACEHOLDER, LockoutView, ProtectionAlert, ViolationWarning};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("GALLERY_GUARD_VERSION");

/// Kill-switch environment variable.
pub const PROTECTION_ENV_VAR: &str = "GALLERY_GUARD_PROTECTION_ENABLED";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Checks runtime kill-switch env var.
///
/// Semantics:
/// - Unset => protections enabled.
/// - `0`, `false`, `off` (case-insensitive) => protections disabled.
/// - Any other value => protections enabled.
pub fn protection_enabled_from_env() -> bool {
    match std::env::var(PROTECTION_ENV_VAR) {
        Ok(value) => !matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "off"
        ),
        Err(_) => true,
    }
}

/// Redacts secret-looking values in log-safe output.
///
/// Every `key=value` or `key: value` pair whose key names a credential keeps
/// its key and loses its value.
pub fn redact_sensitive(input: &str) -> String {
    const MARKERS: [&str; 5] = ["password", "token", "authorization", "bearer", "secret"];

    let mut redacted = Vec::new();
    let mut hide_next = false;
    for word in input.split(' ') {
        if hide_next {
            redacted.push("<redacted>".to_string());
            hide_next = false;
            continue;
        }
        let lower = word.to_ascii_lowercase();
        let Some(marker) = MARKERS.iter().find(|marker| lower.contains(*marker)) else {
            redacted.push(word.to_string());
            continue;
        };
        match word.find(['=', ':']) {
            Some(split) if split + 1 < word.len() => {
                redacted.push(format!("{}<redacted>", &word[..=split]));
                hide_next = word[split + 1..].eq_ignore_ascii_case("bearer");
            }
            Some(_) => {
                redacted.push(word.to_string());
                hide_next = true;
            }
            None if *marker == "bearer" => {
                redacted.push(word.to_string());
                hide_next = true;
            }
            None => redacted.push(word.to_string()),
        }
    }
    redacted.join(" ")
}

/// Host event delivered to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PageEvent {
    /// Context menu, drag or selection on page content.
    ContentAction {
        /// Pointer action.
        action: ContentAction,
        /// Target classification.
        target: ContentTarget,
    },
    /// Key press with its modifiers.
    KeyDown {
        /// Pressed combination.
        combo: KeyCombo,
    },
    /// Document became hidden.
    VisibilityHidden,
    /// Copy to clipboard.
    Copy,
    /// Print dialog requested.
    BeforePrint,
    /// Window resized.
    Resize,
    /// Refresh or close requested.
    BeforeUnload,
    /// Page is being hidden for navigation.
    PageHide,
    /// Address poll observed a URL.
    UrlChanged {
        /// Observed address.
        url: String,
    },
    /// Lockout container vanished from the document.
    OverlayRemoved,
    /// Window-gap detector poll.
    DevToolsPoll,
    /// Debugger-pause detector poll.
    DebuggerPoll,
    /// Lockout countdown tick.
    BlockTimer,
}

/// Instruction for the host renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// Replace the whole document with the lockout view.
    RenderLockout {
        /// View to render.
        view: LockoutView,
    },
    /// Refresh the countdown text.
    UpdateTimer {
        /// New countdown text.
        remaining: String,
    },
    /// Reload the page.
    Reload,
    /// Flash the protection tint.
    ShowProtectionAlert {
        /// Alert parameters.
        alert: ProtectionAlert,
    },
    /// Show the bypass warning.
    ShowViolationWarning {
        /// Warning parameters.
        warning: ViolationWarning,
    },
    /// Replace the visitor placeholders on the shown lockout.
    UpdateVisitorDetails {
        /// Visitor fingerprint.
        fingerprint: String,
        /// Visitor IP or `"unknown"`.
        ip: String,
    },
    /// Cancel the triggering event's default action.
    PreventDefault,
}

/// Collaborators injected into [`GuardRuntime::start`].
#[derive(Clone)]
pub struct RuntimeDeps {
    /// Origin-scoped persistence.
    pub store: Arc<dyn KeyValueStore>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Network-origin resolver.
    pub resolver: Arc<dyn OriginResolver>,
    /// Environment signal provider.
    pub signals: Arc<dyn SignalSource>,
    /// Fingerprint hashing strategy.
    pub hasher: Arc<dyn HashStrategy>,
    /// Collector transport.
    pub transport: Arc<dyn LogTransport>,
    /// Window-gap detector, polled on [`PageEvent::DevToolsPoll`].
    pub window_gap: Option<Arc<dyn DevToolsDetector>>,
    /// Debugger detector, polled on [`PageEvent::DebuggerPoll`].
    pub debugger: Option<Arc<dyn DevToolsDetector>>,
}

/// One page load with every protection wired in.
pub struct GuardRuntime {
    controller: LockoutController,
    clock: Arc<dyn Clock>,
    logger: Arc<RemoteLogger>,
    resolver: Arc<CachingResolver>,
    profile: VisitorProfile,
    visitor_resolved: bool,
    shortcuts: ShortcutPolicy,
    tabs: TabSwitchMonitor,
    resizes: ResizeMonitor,
    window_gap: Option<Arc<dyn DevToolsDetector>>,
    debugger: Option<Arc<dyn DevToolsDetector>>,
    view: Option<LockoutView>,
    current_url: String,
    protection_enabled: bool,
}

impl GuardRuntime {
    /// Starts a page load: fingerprints the visitor, runs load-time checks and
    /// renders any active lockout. Only the public IP is looked up here, and
    /// only when the privileged allow-list needs it. Returns the effects the
    /// host must apply immediately; call [`GuardRuntime::resolve_visitor`] next.
    ///
    /// # Errors
    /// Returns [`AppError`] when the config or collector endpoint is invalid.
    pub fn start(
        config: GuardConfig,
        deps: RuntimeDeps,
        page: PageContext,
        protection_enabled: bool,
    ) -> Result<(Self, Vec<Effect>), AppError> {
        let logger = Arc::new(RemoteLogger::new(&config.collector_endpoint, deps.transport)?);
        let resolver = Arc::new(CachingResolver::new(deps.resolver));
        let signals = deps.signals.collect();
        let fingerprint = compute_fingerprint(&signals, deps.hasher.as_ref());
        let profile = VisitorProfile::local(signals, fingerprint);
        logger.attach_profile(profile.clone());

        let shortcuts = ShortcutPolicy::from_config(&config);
        let tabs = TabSwitchMonitor::new(config.tab_switch_limit);
        let resizes = ResizeMonitor::new(config.resize_limit);
        let clock = deps.clock.clone();
        let session = new_session_token(clock.now_ms());
        let current_url = page.url.clone();
        let controller = LockoutController::new(
            config,
            Collaborators {
                store: deps.store,
                clock: deps.clock,
                resolver: resolver.clone(),
                sink: logger.clone(),
            },
            session,
            page,
        )?;

        let mut runtime = Self {
            controller,
            clock,
            logger,
            resolver,
            profile,
            visitor_resolved: false,
            shortcuts,
            tabs,
            resizes,
            window_gap: deps.window_gap,
            debugger: deps.debugger,
            view: None,
            current_url,
            protection_enabled,
        };

        let mut effects = Vec::new();
        if !protection_enabled {
            info!("[app] protections disabled by {PROTECTION_ENV_VAR}");
            return Ok((runtime, effects));
        }

        runtime
            .controller
            .attach_fingerprint(runtime.profile.fingerprint.as_str());
        let outcome = runtime.controller.on_page_load();
        if outcome.bypass_detected {
            info!("[app] reload during active block detected");
        }
        if let LockoutState::Blocked {
            blocked_until_ms,
            reason,
        } = outcome.state
        {
            effects.push(runtime.render_lockout(blocked_until_ms, reason));
        }
        Ok((runtime, effects))
    }

    /// Runs the remaining visitor lookups, logs the visit and fills in the
    /// lockout placeholders. Failed lookups degrade to `"unknown"`.
    /// Only the first call does anything.
    pub fn resolve_visitor(&mut self) -> Vec<Effect> {
        if self.visitor_resolved {
            return Vec::new();
        }
        let profile = resolve_profile(
            self.profile.signals.clone(),
            self.profile.fingerprint.clone(),
            self.resolver.as_ref(),
        );
        debug!("[app] visitor resolved, origin known: {}", profile.origin.known().is_some());
        self.logger.attach_profile(profile.clone());
        self.profile = profile;
        self.visitor_resolved = true;
        self.controller.log_visit();

        let Some(view) = self.view.as_mut() else {
            return Vec::new();
        };
        view.update_visitor(self.profile.fingerprint.as_str(), self.profile.ip.as_str());
        vec![Effect::UpdateVisitorDetails {
            fingerprint: view.fingerprint.clone(),
            ip: view.ip.clone(),
        }]
    }

    /// Handles one host event.
    pub fn handle(&mut self, event: &PageEvent) -> Vec<Effect> {
        if !self.protection_enabled || self.controller.is_privileged() {
            return Vec::new();
        }
        debug!("[app] event {event:?}");
        let was_blocked = self.controller.state().is_blocked();
        let blocked = self.controller.check_status().is_blocked();
        if was_blocked && !blocked {
            info!("[app] block elapsed before {event:?}; reload required");
            self.view = None;
            return vec![Effect::Reload];
        }

        match event {
            PageEvent::ContentAction { action, target } => {
                if blocked {
                    return vec![Effect::PreventDefault];
                }
                match classify_content_action(*action, *target) {
                    Some(violation) => self.violation_effects(&violation, true),
                    None => Vec::new(),
                }
            }
            PageEvent::KeyDown { combo } => match self.shortcuts.classify(combo, blocked) {
                ShortcutVerdict::Allowed => Vec::new(),
                ShortcutVerdict::Violation(violation) => self.violation_effects(&violation, true),
                ShortcutVerdict::EscapeAttempt(combo) => {
                    self.controller
                        .record_violation(&Violation::BlockedShortcut(combo));
                    vec![
                        Effect::PreventDefault,
                        Effect::ShowViolationWarning {
                            warning: ViolationWarning::default(),
                        },
                    ]
                }
            },
            PageEvent::VisibilityHidden => {
                if blocked {
                    return Vec::new();
                }
                self.controller.log_activity("Tab switch detected");
                match self.tabs.on_hidden() {
                    Some(violation) => self.violation_effects(&violation, false),
                    None => Vec::new(),
                }
            }
            PageEvent::Copy if !blocked => self.violation_effects(&Violation::Copy, false),
            PageEvent::BeforePrint if !blocked => self.violation_effects(&Violation::Print, true),
            PageEvent::Resize if !blocked => match self.resizes.on_resize() {
                Some(violation) => self.violation_effects(&violation, false),
                None => Vec::new(),
            },
            PageEvent::Copy | PageEvent::BeforePrint | PageEvent::Resize => Vec::new(),
            PageEvent::BeforeUnload => {
                self.controller.record_bypass_attempt(BypassAttempt::Unload);
                if blocked {
                    vec![Effect::PreventDefault]
                } else {
                    Vec::new()
                }
            }
            PageEvent::PageHide => {
                self.controller
                    .record_bypass_attempt(BypassAttempt::PageHide);
                Vec::new()
            }
            PageEvent::UrlChanged { url } => self.url_changed(url),
            PageEvent::OverlayRemoved => {
                match self
                    .controller
                    .record_bypass_attempt(BypassAttempt::OverlayRemoved)
                {
                    Transition::Extended { .. } | Transition::Entered { .. } => {
                        vec![Effect::Reload]
                    }
                    Transition::None | Transition::Cleared => Vec::new(),
                }
            }
            PageEvent::DevToolsPoll => self.poll(self.window_gap.clone(), blocked),
            PageEvent::DebuggerPoll => self.poll(self.debugger.clone(), blocked),
            PageEvent::BlockTimer => self.tick(),
        }
    }

    /// Clears the block on behalf of a privileged visitor.
    ///
    /// # Errors
    /// Returns [`AppError::Lockout`] for non-privileged visitors.
    pub fn force_unblock(&mut self) -> Result<Vec<Effect>, AppError> {
        let transition = self.controller.force_unblock()?;
        self.view = None;
        Ok(match transition {
            Transition::Cleared => vec![Effect::Reload],
            _ => Vec::new(),
        })
    }

    /// Controller for this load.
    pub fn controller(&self) -> &LockoutController {
        &self.controller
    }

    /// Collector logger for this load.
    pub fn logger(&self) -> &RemoteLogger {
        &self.logger
    }

    /// Visitor profile; lookups stay pending until [`GuardRuntime::resolve_visitor`].
    pub fn profile(&self) -> &VisitorProfile {
        &self.profile
    }

    /// Lockout view currently shown, if any.
    pub fn view(&self) -> Option<&LockoutView> {
        self.view.as_ref()
    }

    /// Returns `true` when protections are active for this load.
    pub fn protection_enabled(&self) -> bool {
        self.protection_enabled
    }

    /// Controller status snapshot.
    pub fn status(&self) -> GuardStatus {
        self.controller.status()
    }

    fn violation_effects(&mut self, violation: &Violation, prevent: bool) -> Vec<Effect> {
        let transition = self.controller.record_violation(violation);
        let mut effects = Vec::new();
        if prevent {
            effects.push(Effect::PreventDefault);
        }
        if matches!(transition, Transition::None) && violation.shows_alert() {
            effects.push(Effect::ShowProtectionAlert {
                alert: ProtectionAlert::default(),
            });
        }
        effects.extend(self.transition_effects(transition));
        effects
    }

    fn url_changed(&mut self, url: &str) -> Vec<Effect> {
        if url == self.current_url {
            return Vec::new();
        }
        let previous = std::mem::replace(&mut self.current_url, url.to_string());
        self.controller.set_page(PageContext {
            url: url.to_string(),
            referrer: Some(previous),
        });

        let transition = self
            .controller
            .record_bypass_attempt(BypassAttempt::AddressChange);
        match transition {
            Transition::Extended {
                blocked_until_ms, ..
            } => match self.controller.state() {
                LockoutState::Blocked { reason, .. } => {
                    vec![self.render_lockout(blocked_until_ms, reason)]
                }
                LockoutState::Unblocked => Vec::new(),
            },
            other => self.transition_effects(other),
        }
    }

    fn poll(&mut self, detector: Option<Arc<dyn DevToolsDetector>>, blocked: bool) -> Vec<Effect> {
        let Some(detector) = detector else {
            return Vec::new();
        };
        if blocked || !detector.detect() {
            return Vec::new();
        }
        info!("[app] dev-tools heuristic {} fired", detector.name());
        self.violation_effects(&detector.violation(), false)
    }

    fn tick(&mut self) -> Vec<Effect> {
        match self.controller.tick() {
            TickOutcome::Remaining { remaining_ms } => {
                let Some(view) = self.view.as_mut() else {
                    return Vec::new();
                };
                view.update_remaining(remaining_ms);
                vec![Effect::UpdateTimer {
                    remaining: view.remaining.clone(),
                }]
            }
            TickOutcome::Expired => {
                self.view = None;
                vec![Effect::Reload]
            }
            TickOutcome::Idle => Vec::new(),
        }
    }

    fn transition_effects(&mut self, transition: Transition) -> Vec<Effect> {
        match transition {
            Transition::Entered {
                blocked_until_ms,
                reason,
            } => vec![self.render_lockout(blocked_until_ms, reason)],
            Transition::Extended {
                blocked_until_ms, ..
            } => {
                let remaining_ms = blocked_until_ms.saturating_sub(self.now_ms());
                match self.view.as_mut() {
                    Some(view) => {
                        view.update_remaining(remaining_ms);
                        vec![Effect::UpdateTimer {
                            remaining: view.remaining.clone(),
                        }]
                    }
                    None => Vec::new(),
                }
            }
            Transition::Cleared => {
                self.view = None;
                vec![Effect::Reload]
            }
            Transition::None => Vec::new(),
        }
    }

    fn render_lockout(&mut self, blocked_until_ms: u64, reason: BlockReason) -> Effect {
        let remaining_ms = blocked_until_ms.saturating_sub(self.now_ms());
        let ip = if self.visitor_resolved {
            self.profile.ip.as_str()
        } else {
            self.resolver.resolved_ip().unwrap_or(LOADING_PLACEHOLDER)
        };
        let view = LockoutView::new(reason, remaining_ms, self.controller.session().as_str())
            .with_fingerprint(self.profile.fingerprint.as_str())
            .with_ip(ip);
        self.view = Some(view.clone());
        Effect::RenderLockout { view }
    }

    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

/// Flat status projection for display and replay output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeStatus {
    /// App version.
    pub version: String,
    /// Protections active for this load.
    pub protection_enabled: bool,
    /// A block is active.
    pub blocked: bool,
    /// Visitor is privileged.
    pub privileged: bool,
    /// Violations counted on this load.
    pub suspicious_count: u32,
    /// Session token of this load.
    pub session_id: String,
    /// Visitor fingerprint or `"unknown"`.
    pub fingerprint: String,
    /// Persisted expiry, if any.
    pub blocked_until_ms: Option<u64>,
    /// Recent log lines as `KIND: activity`.
    pub recent_activity: Vec<String>,
    /// Collector deliveries that failed.
    pub failed_deliveries: usize,
}

/// Projects a runtime into its flat status snapshot.
pub fn project_runtime_status(runtime: &GuardRuntime) -> RuntimeStatus {
    let status = runtime.status();
    RuntimeStatus {
        version: app_version().to_string(),
        protection_enabled: runtime.protection_enabled(),
        blocked: status.blocked,
        privileged: status.privileged,
        suspicious_count: status.suspicious_count,
        session_id: status.session_id,
        fingerprint: status.fingerprint.unwrap_or_else(|| UNKNOWN.to_string()),
        blocked_until_ms: status.blocked_until_ms,
        recent_activity: status
            .recent_logs
            .iter()
            .map(|entry| format!("{}: {}", kind_label(entry.kind), entry.activity))
            .collect(),
        failed_deliveries: runtime.logger().failures().len(),
    }
}

fn kind_label(kind: LogKind) -> &'static str {
    match kind {
        LogKind::Visit => "VISIT",
        LogKind::Activity => "ACTIVITY",
        LogKind::Suspicious => "SUSPICIOUS",
        LogKind::Block => "BLOCK",
    }
}

/// Scripted step of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayAction {
    /// Deliver a page event.
    Page(PageEvent),
    /// Drop the current load and start a new one over the same store.
    Reload,
}

/// Replay step at an absolute clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayStep {
    /// Clock time in epoch milliseconds; never moves the clock backwards.
    pub at_ms: u64,
    /// What happens at that time.
    pub action: ReplayAction,
}

/// Event script run against in-memory collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayScript {
    /// Configuration; defaults when omitted.
    pub config: GuardConfig,
    /// Clock time of the first load.
    pub start_ms: u64,
    /// Address of the first load.
    pub page_url: String,
    /// Visitor IP; offline resolver when omitted.
    pub visitor_ip: Option<String>,
    /// Visitor country reported with the IP.
    pub visitor_country: Option<String>,
    /// Environment signals of the visitor.
    pub signals: EnvironmentSignals,
    /// Steps in order.
    pub steps: Vec<ReplayStep>,
}

/// Outcome of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Effects of every load, in order.
    pub effects: Vec<Effect>,
    /// Status of the last load.
    pub status: RuntimeStatus,
    /// Number of page loads started.
    pub loads: u32,
    /// Envelopes handed to the transport.
    pub delivered: usize,
}

/// Runs a script against a fresh in-memory store and manual clock.
///
/// # Errors
/// Returns [`AppError`] when the script's config is invalid.
pub fn replay(script: &ReplayScript, protection_enabled: bool) -> Result<ReplayReport, AppError> {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(script.start_ms));
    let transport = Arc::new(RecordingTransport::new());
    let resolver: Arc<dyn OriginResolver> = match &script.visitor_ip {
        Some(ip) => Arc::new(StaticResolver::new(
            ip.clone(),
            OriginDetails {
                country: script.visitor_country.clone(),
                ..OriginDetails::default()
            },
        )),
        None => Arc::new(OfflineResolver),
    };
    let deps = RuntimeDeps {
        store,
        clock: clock.clone(),
        resolver,
        signals: Arc::new(StaticSignalSource::new(script.signals.clone())),
        hasher: Arc::new(RollingHash),
        transport: transport.clone(),
        window_gap: None,
        debugger: None,
    };
    let page = PageContext {
        url: script.page_url.clone(),
        referrer: None,
    };

    let (mut runtime, mut effects) = GuardRuntime::start(
        script.config.clone(),
        deps.clone(),
        page.clone(),
        protection_enabled,
    )?;
    effects.extend(runtime.resolve_visitor());
    let mut loads = 1;

    for step in &script.steps {
        if step.at_ms > clock.now_ms() {
            clock.set(step.at_ms);
        }
        match &step.action {
            ReplayAction::Page(event) => effects.extend(runtime.handle(event)),
            ReplayAction::Reload => {
                let (next, load_effects) = GuardRuntime::start(
                    script.config.clone(),
                    deps.clone(),
                    page.clone(),
                    protection_enabled,
                )?;
                runtime = next;
                effects.extend(load_effects);
                effects.extend(runtime.resolve_visitor());
                loads += 1;
            }
        }
    }

    info!("[app] replay finished after {loads} load(s)");
    Ok(ReplayReport {
        effects,
        status: project_runtime_status(&runtime),
        loads,
        delivered: transport.sent().len(),
    })
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be decoded or validated.
    #[error("config error: {0}")]
    Config(#[from] CoreError),
    /// Lockout controller error.
    #[error("lockout error: {0}")]
    Lockout(#[from] LockoutError),
    /// Collector logger error.
    #[error("report error: {0}")]
    Report(#[from] ReportError),
    /// Replay script could not be decoded.
    #[error("script error: {0}")]
    Script(#[from] serde_json::Error),
    /// Script or config file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
