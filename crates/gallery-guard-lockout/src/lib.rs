#![warn(missing_docs)]
//! # gallery-guard-lockout
//!
//! ## Purpose
//! Implements the lockout state machine that decides, on every load and on
//! every monitored event, whether the visitor is blocked.
//!
//! ## Responsibilities
//! - Classify the persisted block record on load and on every tick.
//! - Count violations and enter a block when the threshold is crossed.
//! - Detect reload/navigation during a block by session-token comparison.
//! - Extend an active block once per detected bypass, never shortening it.
//!   Unload and page hide only mark the attempt; the reload that follows is
//!   charged by the next load's session mismatch.
//! - Honour the privileged-origin override.
//!
//! ## Data flow
//! Host events -> [`LockoutController`] -> [`Transition`] values that the app
//! turns into rendering effects. Every decision is mirrored into the
//! [`KeyValueStore`] and logged through the [`LogSink`].
//!
//! ## Ownership and lifetimes
//! The controller owns its load-scoped state (counter, session, log) and
//! shares its collaborators through `Arc` trait objects.
//!
//! ## Error model
//! Storage failures are logged and swallowed. Only construction with an
//! invalid config and an unauthorised override return [`LockoutError`].
//!
//! ## Security and privacy notes
//! The extension rule is `max(current, now + base) + penalty`, so a bypass
//! attempt always adds punitive time. Privileged resolution fails closed.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//!
//! use gallery_guard_core::{GuardConfig, LogEntry, LogSink, ManualClock, MemoryStore, PageContext, SessionToken};
//! use gallery_guard_fingerprint::OfflineResolver;
//! use gallery_guard_lockout::{Collaborators, LockoutController, LockoutState};
//!
//! struct Discard;
//! impl LogSink for Discard {
//!     fn emit(&self, _entry: &LogEntry) {}
//! }
//!
//! let collaborators = Collaborators {
//!     store: Arc::new(MemoryStore::new()),
//!     clock: Arc::new(ManualClock::new(0)),
//!     resolver: Arc::new(OfflineResolver),
//!     sink: Arc::new(Discard),
//! };
//! let session = SessionToken::new("session-1").expect("token is not blank");
//! let mut controller =
//!     LockoutController::new(GuardConfig::default(), collaborators, session, PageContext::default())
//!         .expect("default config is valid");
//! controller.on_page_load();
//! assert_eq!(controller.state(), LockoutState::Unblocked);
//! ```

use std::fmt;
use std::sync::Arc;

use gallery_guard_core::{
    BlockDetails, BlockReason, BlockRecord, Clock, CoreError, GuardConfig, KEY_BLOCKED_UNTIL,
    KEY_BLOCK_STATE, KEY_FINGERPRINT, KEY_REFRESH_ATTEMPT_TIME, KEY_SESSION_ID, KeyValueStore,
    LogEntry, LogKind, LogSink, PageContext, SessionToken, BLOCK_STATE_ACTIVE, block_sentinel_active,
    clear_block_record, parse_blocked_until, read_block_record, write_block_record,
};
use gallery_guard_fingerprint::{OriginResolver, PrivilegedOrigins};
use gallery_guard_monitor::Violation;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Injected collaborators of the controller.
#[derive(Clone)]
pub struct Collaborators {
    /// Origin-scoped persistence.
    pub store: Arc<dyn KeyValueStore>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Network-origin resolver used for the privileged override.
    pub resolver: Arc<dyn OriginResolver>,
    /// Destination of every log entry.
    pub sink: Arc<dyn LogSink>,
}

/// Lockout state as seen by this load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutState {
    /// Protections active, no block.
    Unblocked,
    /// Block active until the given instant.
    Blocked {
        /// Absolute expiry in epoch milliseconds.
        blocked_until_ms: u64,
        /// Why the lockout screen is shown.
        reason: BlockReason,
    },
}

impl LockoutState {
    /// Returns `true` for [`LockoutState::Blocked`].
    pub fn is_blocked(&self) -> bool {
        matches!(self, LockoutState::Blocked { .. })
    }

    /// Expiry when blocked.
    pub fn blocked_until(&self) -> Option<u64> {
        match self {
            LockoutState::Blocked {
                blocked_until_ms, ..
            } => Some(*blocked_until_ms),
            LockoutState::Unblocked => None,
        }
    }
}

/// Observable effect of one controller call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed.
    None,
    /// `Unblocked -> Blocked`; the host must render the lockout view.
    Entered {
        /// Absolute expiry in epoch milliseconds.
        blocked_until_ms: u64,
        /// Why the block was entered.
        reason: BlockReason,
    },
    /// `Blocked -> Blocked` with a later expiry.
    Extended {
        /// Expiry before the bypass attempt.
        previous_until_ms: Option<u64>,
        /// Expiry after the bypass attempt.
        blocked_until_ms: u64,
    },
    /// `Blocked -> Unblocked`; the host must reload.
    Cleared,
}

/// Action that tries to escape an active lockout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassAttempt {
    /// `beforeunload` fired (refresh or close).
    Unload,
    /// `pagehide` fired (navigation away).
    PageHide,
    /// The page address changed.
    AddressChange,
    /// The lockout container was removed from the document.
    OverlayRemoved,
    /// This load's session token differs from the persisted one.
    SessionMismatch,
}

impl fmt::Display for BypassAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BypassAttempt::Unload => "Refresh attempt while blocked",
            BypassAttempt::PageHide => "Navigation attempt while blocked",
            BypassAttempt::AddressChange => "Address change while blocked",
            BypassAttempt::OverlayRemoved => "Lockout screen removal attempt",
            BypassAttempt::SessionMismatch => "Bypass attempt by reload detected",
        };
        f.write_str(text)
    }
}

/// Result of [`LockoutController::on_page_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    /// State after load-time checks.
    pub state: LockoutState,
    /// Visitor matched the privileged allow-list.
    pub privileged: bool,
    /// Load-time session mismatch was classified as a bypass attempt.
    pub bypass_detected: bool,
}

/// Result of one block-timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not blocked; nothing to display.
    Idle,
    /// Still blocked.
    Remaining {
        /// Milliseconds until expiry.
        remaining_ms: u64,
    },
    /// Block elapsed during this load; record cleared, host must reload.
    Expired,
}

/// Diagnostic snapshot for hosts and administrators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardStatus {
    /// A block is currently active.
    pub blocked: bool,
    /// Visitor is privileged.
    pub privileged: bool,
    /// Violations counted on this load.
    pub suspicious_count: u32,
    /// Visitor fingerprint, once known.
    pub fingerprint: Option<String>,
    /// This load's session token.
    pub session_id: String,
    /// Persisted expiry, if any.
    pub blocked_until_ms: Option<u64>,
    /// Most recent log entries, oldest first.
    pub recent_logs: Vec<LogEntry>,
}

/// Lockout state machine for one page load.
pub struct LockoutController {
    config: GuardConfig,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    resolver: Arc<dyn OriginResolver>,
    sink: Arc<dyn LogSink>,
    privileged_origins: PrivilegedOrigins,
    session: SessionToken,
    page: PageContext,
    fingerprint: Option<String>,
    state: LockoutState,
    privileged: bool,
    violations: u32,
    blocked_this_load: bool,
    overlay_tamper_handled: bool,
    logs: Vec<LogEntry>,
}

impl LockoutController {
    /// Creates a controller for one page load.
    ///
    /// # Errors
    /// Returns [`LockoutError::Config`] when `config` fails validation.
    pub fn new(
        config: GuardConfig,
        collaborators: Collaborators,
        session: SessionToken,
        page: PageContext,
    ) -> Result<Self, LockoutError> {
        config.validate().map_err(LockoutError::Config)?;
        let privileged_origins = PrivilegedOrigins::parse(&config.privileged_origins)
            .map_err(|error| LockoutError::Config(CoreError::InvalidConfig(error.to_string())))?;

        Ok(Self {
            config,
            store: collaborators.store,
            clock: collaborators.clock,
            resolver: collaborators.resolver,
            sink: collaborators.sink,
            privileged_origins,
            session,
            page,
            fingerprint: None,
            state: LockoutState::Unblocked,
            privileged: false,
            violations: 0,
            blocked_this_load: false,
            overlay_tamper_handled: false,
            logs: Vec::new(),
        })
    }

    /// Runs the load-time checks: privileged override, persisted block
    /// classification and session-mismatch bypass detection.
    pub fn on_page_load(&mut self) -> LoadOutcome {
        let now = self.clock.now_ms();

        self.privileged = self.privileged_origins.resolve(self.resolver.as_ref());
        if self.privileged {
            info!("[lockout] privileged origin recognised; protections disabled");
            self.persist(clear_block_record(self.store.as_ref()), "clear block for privileged");
            self.state = LockoutState::Unblocked;
            self.persist_session();
            return LoadOutcome {
                state: self.state,
                privileged: true,
                bypass_detected: false,
            };
        }

        self.state = self.classify_record(now, BlockReason::ReloadBypass);

        let previous_session = self.store.get(KEY_SESSION_ID).ok().flatten();
        let bypass_detected = block_sentinel_active(self.store.as_ref())
            && previous_session.is_some_and(|previous| previous != self.session.as_str());

        let entered = bypass_detected
            && matches!(
                self.record_bypass_attempt(BypassAttempt::SessionMismatch),
                Transition::Entered { .. }
            );
        // Entering already logged the block.
        if !entered {
            if let LockoutState::Blocked {
                blocked_until_ms,
                reason,
            } = self.state
            {
                self.log_block(now, reason, blocked_until_ms);
            }
        }

        self.persist_session();
        LoadOutcome {
            state: self.state,
            privileged: false,
            bypass_detected,
        }
    }

    /// Records one violation. Enters a block when the counter reaches the
    /// threshold; never extends an active block.
    pub fn record_violation(&mut self, violation: &Violation) -> Transition {
        if self.privileged {
            return Transition::None;
        }

        let now = self.clock.now_ms();
        self.violations = self.violations.saturating_add(1);
        self.log_suspicious(now, violation.to_string());

        if self.refresh_state(now).is_blocked() || self.blocked_this_load {
            return Transition::None;
        }

        if self.violations >= self.config.violation_threshold {
            let blocked_until_ms = now.saturating_add(self.config.base_block_duration_ms);
            let reason = BlockReason::SuspiciousActivity {
                count: self.violations,
            };
            self.persist(
                write_block_record(self.store.as_ref(), blocked_until_ms),
                "write block record",
            );
            self.enter_block(now, blocked_until_ms, reason);
            return Transition::Entered {
                blocked_until_ms,
                reason,
            };
        }

        Transition::None
    }

    /// Handles an escape attempt. Ignored unless a block is active, except a
    /// load-time session mismatch, which also revives a block whose sentinel
    /// survived without an expiry. Unload and page hide are logged and marked
    /// but never extend.
    pub fn record_bypass_attempt(&mut self, attempt: BypassAttempt) -> Transition {
        if self.privileged {
            return Transition::None;
        }

        let now = self.clock.now_ms();
        let blocked = self.refresh_state(now).is_blocked();
        if !blocked && attempt != BypassAttempt::SessionMismatch {
            return Transition::None;
        }

        match attempt {
            // The next load's session mismatch charges the reload.
            BypassAttempt::Unload | BypassAttempt::PageHide => {
                self.violations = self.violations.saturating_add(1);
                self.log_suspicious(now, attempt.to_string());
                self.mark_refresh_attempt(now);
                return Transition::None;
            }
            BypassAttempt::OverlayRemoved if self.overlay_tamper_handled => {
                return Transition::None;
            }
            BypassAttempt::OverlayRemoved => self.overlay_tamper_handled = true,
            BypassAttempt::AddressChange | BypassAttempt::SessionMismatch => {}
        }

        self.violations = self.violations.saturating_add(1);
        self.log_suspicious(now, attempt.to_string());
        self.extend_block(now)
    }

    /// Re-reads the persisted record, clearing it once elapsed or corrupt.
    /// Repeated calls after expiry keep returning [`LockoutState::Unblocked`].
    pub fn check_status(&mut self) -> LockoutState {
        let now = self.clock.now_ms();
        self.refresh_state(now)
    }

    /// Block-timer tick while the lockout screen is shown.
    pub fn tick(&mut self) -> TickOutcome {
        let was_blocked = self.state.is_blocked();
        let now = self.clock.now_ms();
        match self.refresh_state(now) {
            LockoutState::Blocked {
                blocked_until_ms, ..
            } => TickOutcome::Remaining {
                remaining_ms: blocked_until_ms.saturating_sub(now),
            },
            LockoutState::Unblocked if was_blocked => {
                info!("[lockout] block elapsed; reload required");
                TickOutcome::Expired
            }
            LockoutState::Unblocked => TickOutcome::Idle,
        }
    }

    /// Returns `true` while the persisted block is active. Does not mutate.
    pub fn is_blocked(&self) -> bool {
        if self.privileged {
            return false;
        }
        read_block_record(self.store.as_ref(), self.clock.now_ms())
            .active_until()
            .is_some()
    }

    /// Clears any block on behalf of a privileged visitor.
    ///
    /// # Errors
    /// Returns [`LockoutError::NotPrivileged`] for everyone else.
    pub fn force_unblock(&mut self) -> Result<Transition, LockoutError> {
        if !self.privileged {
            warn!("[lockout] unblock refused for non-privileged visitor");
            return Err(LockoutError::NotPrivileged);
        }
        self.persist(clear_block_record(self.store.as_ref()), "force unblock");
        let was_blocked = self.state.is_blocked();
        self.state = LockoutState::Unblocked;
        info!("[lockout] block cleared by privileged override");
        Ok(if was_blocked {
            Transition::Cleared
        } else {
            Transition::None
        })
    }

    /// Stores the fingerprint computed for this load.
    pub fn attach_fingerprint(&mut self, fingerprint: impl Into<String>) {
        let fingerprint = fingerprint.into();
        self.persist(
            self.store.set(KEY_FINGERPRINT, &fingerprint),
            "persist fingerprint",
        );
        self.fingerprint = Some(fingerprint);
    }

    /// Updates the page address used in subsequent log entries.
    pub fn set_page(&mut self, page: PageContext) {
        self.page = page;
    }

    /// Records the visit entry for this load.
    pub fn log_visit(&mut self) {
        let now = self.clock.now_ms();
        let entry = self.entry(LogKind::Visit, "New visit", now);
        self.push(entry);
    }

    /// Records benign activity without touching the counter.
    pub fn log_activity(&mut self, activity: impl Into<String>) {
        let now = self.clock.now_ms();
        let entry = self.entry(LogKind::Activity, activity, now);
        self.push(entry);
    }

    /// Current state as of the last check.
    pub fn state(&self) -> LockoutState {
        self.state
    }

    /// Violations counted on this load.
    pub fn violations(&self) -> u32 {
        self.violations
    }

    /// Visitor is privileged.
    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// This load's session token.
    pub fn session(&self) -> &SessionToken {
        &self.session
    }

    /// Fingerprint, once attached.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Configuration in force.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Every log entry of this load.
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Diagnostic snapshot.
    pub fn status(&self) -> GuardStatus {
        let skip = self.logs.len().saturating_sub(self.config.recent_log_limit);
        GuardStatus {
            blocked: self.is_blocked(),
            privileged: self.privileged,
            suspicious_count: self.violations,
            fingerprint: self.fingerprint.clone(),
            session_id: self.session.to_string(),
            blocked_until_ms: self
                .store
                .get(KEY_BLOCKED_UNTIL)
                .ok()
                .flatten()
                .and_then(|raw| parse_blocked_until(&raw).ok()),
            recent_logs: self.logs[skip..].to_vec(),
        }
    }

    fn classify_record(&mut self, now: u64, reason: BlockReason) -> LockoutState {
        match read_block_record(self.store.as_ref(), now) {
            BlockRecord::Active { blocked_until_ms } => LockoutState::Blocked {
                blocked_until_ms,
                reason,
            },
            BlockRecord::Expired { blocked_until_ms } => {
                debug!("[lockout] clearing elapsed block (until={blocked_until_ms})");
                self.persist(clear_block_record(self.store.as_ref()), "clear elapsed block");
                LockoutState::Unblocked
            }
            BlockRecord::Corrupt => {
                warn!("[lockout] clearing corrupt block record");
                self.persist(clear_block_record(self.store.as_ref()), "clear corrupt block");
                LockoutState::Unblocked
            }
            BlockRecord::Absent => LockoutState::Unblocked,
        }
    }

    fn refresh_state(&mut self, now: u64) -> LockoutState {
        if self.privileged {
            return LockoutState::Unblocked;
        }
        let reason = match self.state {
            LockoutState::Blocked { reason, .. } => reason,
            LockoutState::Unblocked => BlockReason::ReloadBypass,
        };
        self.state = self.classify_record(now, reason);
        self.state
    }

    fn extend_block(&mut self, now: u64) -> Transition {
        let fresh_until = now.saturating_add(self.config.base_block_duration_ms);
        let previous_until_ms = self
            .store
            .get(KEY_BLOCKED_UNTIL)
            .ok()
            .flatten()
            .and_then(|raw| parse_blocked_until(&raw).ok());

        let blocked_until_ms = match previous_until_ms {
            Some(current) => current
                .max(fresh_until)
                .saturating_add(self.config.escalation_penalty_ms),
            None => fresh_until,
        };
        self.persist(
            write_block_record(self.store.as_ref(), blocked_until_ms),
            "extend block record",
        );

        match self.state {
            LockoutState::Blocked { reason, .. } => {
                info!(
                    "[lockout] block extended previous={previous_until_ms:?} until={blocked_until_ms}"
                );
                self.state = LockoutState::Blocked {
                    blocked_until_ms,
                    reason,
                };
                Transition::Extended {
                    previous_until_ms,
                    blocked_until_ms,
                }
            }
            LockoutState::Unblocked => {
                let reason = BlockReason::ReloadBypass;
                self.enter_block(now, blocked_until_ms, reason);
                Transition::Entered {
                    blocked_until_ms,
                    reason,
                }
            }
        }
    }

    fn enter_block(&mut self, now: u64, blocked_until_ms: u64, reason: BlockReason) {
        info!(
            "[lockout] block entered until={blocked_until_ms} reason={}",
            reason.describe()
        );
        self.blocked_this_load = true;
        self.state = LockoutState::Blocked {
            blocked_until_ms,
            reason,
        };
        self.log_block(now, reason, blocked_until_ms);
    }

    fn mark_refresh_attempt(&mut self, now: u64) {
        self.persist(
            self.store.set(KEY_BLOCK_STATE, BLOCK_STATE_ACTIVE),
            "mark block sentinel",
        );
        self.persist(
            self.store.set(KEY_REFRESH_ATTEMPT_TIME, &now.to_string()),
            "mark refresh attempt",
        );
    }

    fn persist_session(&mut self) {
        self.persist(
            self.store.set(KEY_SESSION_ID, self.session.as_str()),
            "persist session",
        );
    }

    fn persist(&self, result: Result<(), CoreError>, what: &str) {
        if let Err(error) = result {
            warn!("[lockout] {what} failed: {error}");
        }
    }

    fn log_suspicious(&mut self, now: u64, activity: String) {
        let mut entry = self.entry(LogKind::Suspicious, activity, now);
        entry.count = Some(self.violations);
        self.push(entry);
    }

    fn log_block(&mut self, now: u64, reason: BlockReason, blocked_until_ms: u64) {
        let mut entry = self.entry(LogKind::Block, "Lockout active", now);
        entry.block = Some(BlockDetails {
            reason,
            blocked_until_ms,
            base_duration_ms: self.config.base_block_duration_ms,
        });
        self.push(entry);
    }

    fn entry(&self, kind: LogKind, activity: impl Into<String>, now: u64) -> LogEntry {
        LogEntry {
            kind,
            activity: activity.into(),
            timestamp_ms: now,
            session_id: self.session.to_string(),
            fingerprint: self.fingerprint.clone(),
            url: self.page.url.clone(),
            referrer: self.page.referrer.clone(),
            count: None,
            block: None,
        }
    }

    fn push(&mut self, entry: LogEntry) {
        self.sink.emit(&entry);
        self.logs.push(entry);
    }
}

/// Lockout controller errors.
#[derive(Debug, Error)]
pub enum LockoutError {
    /// Configuration failed validation.
    #[error("invalid lockout config: {0}")]
    Config(CoreError),
    /// Override requested by a non-privileged visitor.
    #[error("override requires a privileged origin")]
    NotPrivileged,
}
