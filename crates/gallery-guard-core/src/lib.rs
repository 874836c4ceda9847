#![warn(missing_docs)]
//! # gallery-guard-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `gallery-guard` workspace.
//!
//! ## Responsibilities
//! - Name the persisted keys and encode/decode the persisted block record.
//! - Abstract the wall clock and the origin-scoped key/value store.
//! - Represent session tokens, key combinations, log entries and block reasons.
//! - Load and validate [`GuardConfig`].
//!
//! ## Data flow
//! The lockout controller reads [`BlockRecord`] through [`read_block_record`]
//! on every load and tick, writes expiries with [`write_block_record`], and
//! emits [`LogEntry`] values into a [`LogSink`].
//!
//! ## Ownership and lifetimes
//! Collaborators are shared as trait objects; every value crossing a crate
//! boundary is owned so hosts can hold snapshots past the originating call.
//!
//! ## Error model
//! Storage, codec and configuration failures are [`CoreError`] variants. The
//! block record reader never fails: unreadable or corrupt state degrades to
//! "not blocked".
//!
//! ## Security and privacy notes
//! Persisted values are treated as attacker-controlled input. Nothing in this
//! crate trusts a stored expiry without parsing it.
//!
//! ## Example
//! ```rust
//! use gallery_guard_core::{BlockRecord, MemoryStore, read_block_record, write_block_record};
//!
//! let store = MemoryStore::new();
//! write_block_record(&store, 5_000).expect("memory store accepts writes");
//! assert_eq!(
//!     read_block_record(&store, 1_000),
//!     BlockRecord::Active { blocked_until_ms: 5_000 }
//! );
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Persisted expiry timestamp (epoch millis, decimal string).
pub const KEY_BLOCKED_UNTIL: &str = "blockedUntil";
/// Persisted block sentinel (`"active"` or absent).
pub const KEY_BLOCK_STATE: &str = "blockState";
/// Session token of the most recent load.
pub const KEY_SESSION_ID: &str = "sessionId";
/// Fingerprint of the most recent load.
pub const KEY_FINGERPRINT: &str = "fingerprint";
/// Diagnostic timestamp of the last unload attempt while blocked.
pub const KEY_REFRESH_ATTEMPT_TIME: &str = "refreshAttemptTime";
/// Value stored under [`KEY_BLOCK_STATE`] while a block is active.
pub const BLOCK_STATE_ACTIVE: &str = "active";

/// Source of the current time in Unix epoch milliseconds.
pub trait Clock: Send + Sync {
    /// Returns the current time as epoch milliseconds.
    fn now_ms(&self) -> u64;
}

/// Wall clock backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually driven clock for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    /// Moves the clock to an absolute time.
    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    /// Moves the clock forward by `delta_ms`.
    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Origin-scoped string key/value store (browser local storage or a stand-in).
pub trait KeyValueStore: Send + Sync {
    /// Reads one value.
    ///
    /// # Errors
    /// Returns [`CoreError::Store`] when the backing store is unavailable.
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// Writes one value, replacing any previous one.
    ///
    /// # Errors
    /// Returns [`CoreError::Store`] when the backing store rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;

    /// Deletes one value. Deleting a missing key is not an error.
    ///
    /// # Errors
    /// Returns [`CoreError::Store`] when the backing store is unavailable.
    fn remove(&self, key: &str) -> Result<(), CoreError>;
}

/// In-memory [`KeyValueStore`] used by tests and the replay binary.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every stored pair.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| CoreError::Store("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CoreError::Store("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CoreError::Store("memory store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Decoded view of the persisted block record at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRecord {
    /// No expiry is stored.
    Absent,
    /// Expiry is stored and still in the future.
    Active {
        /// Absolute expiry in epoch milliseconds.
        blocked_until_ms: u64,
    },
    /// Expiry is stored but has elapsed; the record must be cleared.
    Expired {
        /// Elapsed expiry in epoch milliseconds.
        blocked_until_ms: u64,
    },
    /// Expiry is stored but unparsable; the record must be cleared.
    Corrupt,
}

impl BlockRecord {
    /// Returns the expiry when the record is active.
    pub fn active_until(&self) -> Option<u64> {
        match self {
            BlockRecord::Active { blocked_until_ms } => Some(*blocked_until_ms),
            _ => None,
        }
    }
}

/// Parses a persisted expiry value.
///
/// # Errors
/// Returns [`CoreError::CorruptBlockRecord`] for anything other than a
/// non-negative decimal integer.
pub fn parse_blocked_until(raw: &str) -> Result<u64, CoreError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| CoreError::CorruptBlockRecord(raw.to_string()))
}

/// Reads and classifies the persisted block record.
///
/// An unavailable store reads as [`BlockRecord::Absent`].
pub fn read_block_record(store: &dyn KeyValueStore, now_ms: u64) -> BlockRecord {
    let raw = match store.get(KEY_BLOCKED_UNTIL) {
        Ok(Some(raw)) => raw,
        Ok(None) | Err(_) => return BlockRecord::Absent,
    };

    match parse_blocked_until(&raw) {
        Ok(blocked_until_ms) if now_ms < blocked_until_ms => {
            BlockRecord::Active { blocked_until_ms }
        }
        Ok(blocked_until_ms) => BlockRecord::Expired { blocked_until_ms },
        Err(_) => BlockRecord::Corrupt,
    }
}

/// Returns `true` when the block sentinel is set.
pub fn block_sentinel_active(store: &dyn KeyValueStore) -> bool {
    matches!(store.get(KEY_BLOCK_STATE), Ok(Some(value)) if value == BLOCK_STATE_ACTIVE)
}

/// Persists an active block expiring at `blocked_until_ms`.
///
/// # Errors
/// Propagates [`CoreError::Store`] from the backing store.
pub fn write_block_record(store: &dyn KeyValueStore, blocked_until_ms: u64) -> Result<(), CoreError> {
    store.set(KEY_BLOCKED_UNTIL, &blocked_until_ms.to_string())?;
    store.set(KEY_BLOCK_STATE, BLOCK_STATE_ACTIVE)
}

/// Removes every block-related key.
///
/// # Errors
/// Propagates [`CoreError::Store`] from the backing store.
pub fn clear_block_record(store: &dyn KeyValueStore) -> Result<(), CoreError> {
    store.remove(KEY_BLOCKED_UNTIL)?;
    store.remove(KEY_BLOCK_STATE)?;
    store.remove(KEY_REFRESH_ATTEMPT_TIME)
}

/// Random identifier distinguishing one page load from the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wraps a raw token.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidSessionToken`] when `raw` is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CoreError::InvalidSessionToken);
        }
        Ok(Self(raw))
    }

    /// Builds a `session-<issued_at_ms>-<suffix>` token.
    pub fn generated(issued_at_ms: u64, suffix: &str) -> Self {
        Self(format!("session-{issued_at_ms}-{suffix}"))
    }

    /// Returns the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One keyboard shortcut: a key plus the modifiers that must be held.
///
/// Serialized as `"Ctrl+Shift+I"` style text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyCombo {
    /// Key name as reported by the host (`"F12"`, `"r"`, `"Tab"`).
    pub key: String,
    /// Control modifier.
    pub ctrl: bool,
    /// Shift modifier.
    pub shift: bool,
    /// Alt modifier.
    pub alt: bool,
}

impl KeyCombo {
    /// Creates a combo with no modifiers.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            shift: false,
            alt: false,
        }
    }

    /// Adds the control modifier.
    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// Adds the shift modifier.
    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Adds the alt modifier.
    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// Parses `"Ctrl+Shift+I"` style text.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidKeyCombo`] for an empty key or an unknown
    /// modifier.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let parts: Vec<&str> = raw.split('+').map(str::trim).collect();
        let (key, modifiers) = match parts.split_last() {
            Some((key, modifiers)) if !key.is_empty() => (*key, modifiers),
            _ => return Err(CoreError::InvalidKeyCombo(raw.to_string())),
        };

        let mut combo = KeyCombo::new(key);
        for modifier in modifiers {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => combo.ctrl = true,
                "shift" => combo.shift = true,
                "alt" => combo.alt = true,
                _ => return Err(CoreError::InvalidKeyCombo(raw.to_string())),
            }
        }
        Ok(combo)
    }

    /// Returns `true` when `pressed` satisfies this combo.
    ///
    /// Every modifier required here must be held; extra held modifiers do not
    /// prevent a match. Keys compare case-insensitively.
    pub fn matches(&self, pressed: &KeyCombo) -> bool {
        self.key.eq_ignore_ascii_case(&pressed.key)
            && (!self.ctrl || pressed.ctrl)
            && (!self.shift || pressed.shift)
            && (!self.alt || pressed.alt)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        if self.alt {
            f.write_str("Alt+")?;
        }
        f.write_str(&self.key)
    }
}

impl TryFrom<String> for KeyCombo {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        KeyCombo::parse(&value)
    }
}

impl From<KeyCombo> for String {
    fn from(value: KeyCombo) -> Self {
        value.to_string()
    }
}

/// Shortcuts treated as violations while the visitor is not blocked.
pub fn default_protected_shortcuts() -> Vec<KeyCombo> {
    vec![
        KeyCombo::new("F12"),
        KeyCombo::new("F5"),
        KeyCombo::new("r").ctrl(),
        KeyCombo::new("i").ctrl().shift(),
        KeyCombo::new("j").ctrl().shift(),
        KeyCombo::new("c").ctrl().shift(),
        KeyCombo::new("u").ctrl(),
        KeyCombo::new("s").ctrl(),
        KeyCombo::new("p").ctrl(),
    ]
}

/// Shortcuts swallowed as escape attempts while a block is active.
pub fn default_escape_shortcuts() -> Vec<KeyCombo> {
    let mut combos = vec![
        KeyCombo::new("F5"),
        KeyCombo::new("F11"),
        KeyCombo::new("F12"),
        KeyCombo::new("F4").alt(),
        KeyCombo::new("Tab").alt(),
    ];
    for key in ["r", "l", "t", "n", "w"] {
        combos.push(KeyCombo::new(key).ctrl());
    }
    for key in ["r", "t", "n"] {
        combos.push(KeyCombo::new(key).ctrl().shift());
    }
    combos
}

/// Default outbound collector endpoint.
pub const DEFAULT_COLLECTOR_ENDPOINT: &str = "https://collector.gallery-guard.test/v1/events";

/// Tunables for detection, lockout timing and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Suspicious events per load that trigger a lockout.
    pub violation_threshold: u32,
    /// Length of a fresh block.
    pub base_block_duration_ms: u64,
    /// Punitive time added on every bypass attempt while blocked.
    pub escalation_penalty_ms: u64,
    /// Outer/inner window gap that signals docked dev-tools.
    pub devtools_gap_threshold_px: u32,
    /// Elapsed time across a breakpoint that signals a paused debugger.
    pub debugger_pause_threshold_ms: u64,
    /// Hidden transitions tolerated before each further one is a violation.
    pub tab_switch_limit: u32,
    /// Resizes tolerated before a violation is raised.
    pub resize_limit: u32,
    /// Window-gap polling period.
    pub devtools_poll_interval_ms: u64,
    /// Breakpoint timing polling period.
    pub debugger_poll_interval_ms: u64,
    /// Address polling period.
    pub url_poll_interval_ms: u64,
    /// Lockout countdown refresh period.
    pub block_tick_interval_ms: u64,
    /// Number of log entries exposed by status snapshots.
    pub recent_log_limit: usize,
    /// IP addresses exempt from every protection.
    pub privileged_origins: Vec<String>,
    /// HTTPS endpoint receiving structured log messages.
    pub collector_endpoint: String,
    /// Shortcuts that count as violations while unblocked.
    pub protected_shortcuts: Vec<KeyCombo>,
    /// Shortcuts swallowed while blocked.
    pub escape_shortcuts: Vec<KeyCombo>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            violation_threshold: 3,
            base_block_duration_ms: 10 * 60 * 1_000,
            escalation_penalty_ms: 5 * 60 * 1_000,
            devtools_gap_threshold_px: 160,
            debugger_pause_threshold_ms: 100,
            tab_switch_limit: 3,
            resize_limit: 5,
            devtools_poll_interval_ms: 1_000,
            debugger_poll_interval_ms: 5_000,
            url_poll_interval_ms: 100,
            block_tick_interval_ms: 1_000,
            recent_log_limit: 10,
            privileged_origins: Vec::new(),
            collector_endpoint: DEFAULT_COLLECTOR_ENDPOINT.to_string(),
            protected_shortcuts: default_protected_shortcuts(),
            escape_shortcuts: default_escape_shortcuts(),
        }
    }
}

impl GuardConfig {
    /// Decodes and validates a JSON config document. Missing fields take
    /// their defaults.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] for malformed JSON and
    /// [`CoreError::InvalidConfig`] when validation fails.
    pub fn from_json_str(raw: &str) -> Result<Self, CoreError> {
        let config: GuardConfig = serde_json::from_str(raw).map_err(CoreError::Codec)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidConfig`] naming the first failing field.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.violation_threshold == 0 {
            return Err(CoreError::InvalidConfig(
                "violation_threshold must be greater than zero".to_string(),
            ));
        }
        if self.base_block_duration_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "base_block_duration_ms must be greater than zero".to_string(),
            ));
        }
        // Every bypass attempt must strictly lengthen the block.
        if self.escalation_penalty_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "escalation_penalty_ms must be greater than zero".to_string(),
            ));
        }
        for (name, period) in [
            ("devtools_poll_interval_ms", self.devtools_poll_interval_ms),
            ("debugger_poll_interval_ms", self.debugger_poll_interval_ms),
            ("url_poll_interval_ms", self.url_poll_interval_ms),
            ("block_tick_interval_ms", self.block_tick_interval_ms),
        ] {
            if period == 0 {
                return Err(CoreError::InvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        for origin in &self.privileged_origins {
            origin.parse::<IpAddr>().map_err(|_| {
                CoreError::InvalidConfig(format!("privileged origin is not an ip address: {origin}"))
            })?;
        }
        validate_https_endpoint(&self.collector_endpoint)
    }
}

/// Validates that `endpoint` is an absolute HTTPS URL.
///
/// # Errors
/// Returns [`CoreError::InvalidConfig`] for unparsable or non-HTTPS URLs.
pub fn validate_https_endpoint(endpoint: &str) -> Result<(), CoreError> {
    let parsed = Url::parse(endpoint)
        .map_err(|error| CoreError::InvalidConfig(format!("invalid endpoint url: {error}")))?;
    if parsed.scheme() != "https" {
        return Err(CoreError::InvalidConfig(
            "collector endpoint must use https".to_string(),
        ));
    }
    Ok(())
}

/// Category of an in-memory / outbound log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogKind {
    /// First log of a page load.
    Visit,
    /// Benign activity worth recording.
    Activity,
    /// Suspicious activity; increments the violation counter.
    Suspicious,
    /// A lockout was entered.
    Block,
}

/// Why the lockout screen is being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockReason {
    /// The page was reloaded or navigated while a block was active.
    ReloadBypass,
    /// The violation counter crossed the threshold.
    SuspiciousActivity {
        /// Counter value when the block was entered.
        count: u32,
    },
}

impl BlockReason {
    /// Human-readable reason text.
    pub fn describe(&self) -> String {
        match self {
            BlockReason::ReloadBypass => "Bypass attempt by reload".to_string(),
            BlockReason::SuspiciousActivity { count } => format!("Suspicious activity ({count})"),
        }
    }
}

/// Block-specific fields attached to [`LogKind::Block`] entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDetails {
    /// Why the block was entered.
    pub reason: BlockReason,
    /// Absolute expiry in epoch milliseconds.
    pub blocked_until_ms: u64,
    /// Configured base duration.
    pub base_duration_ms: u64,
}

/// Address and referrer of the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    /// Current page address.
    pub url: String,
    /// Referring page, when the host exposes one.
    pub referrer: Option<String>,
}

/// One structured log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Record category.
    pub kind: LogKind,
    /// Short description of what happened.
    pub activity: String,
    /// Event time in epoch milliseconds.
    pub timestamp_ms: u64,
    /// Session token of the load that produced the entry.
    pub session_id: String,
    /// Visitor fingerprint, when already computed.
    pub fingerprint: Option<String>,
    /// Page address at event time.
    pub url: String,
    /// Referring page.
    pub referrer: Option<String>,
    /// Violation counter after this event (suspicious entries only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Block fields (block entries only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockDetails>,
}

/// Destination for log entries. Implementations must not fail the caller.
pub trait LogSink: Send + Sync {
    /// Records or forwards one entry.
    fn emit(&self, entry: &LogEntry);
}

/// Error type for core storage, codec and validation failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Backing key/value store failed.
    #[error("storage failure: {0}")]
    Store(String),
    /// Persisted expiry could not be parsed.
    #[error("corrupt block record: {0:?}")]
    CorruptBlockRecord(String),
    /// Session token is blank.
    #[error("session token is empty")]
    InvalidSessionToken,
    /// Key combination text is malformed.
    #[error("invalid key combination: {0:?}")]
    InvalidKeyCombo(String),
    /// Configuration violates a constraint.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// JSON encoding/decoding error.
    #[error("codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    //! Unit tests for record classification, key combos and config checks.

    use super::*;

    #[test]
    fn corrupt_expiry_reads_as_corrupt_not_blocked() {
        let store = MemoryStore::new();
        store.set(KEY_BLOCKED_UNTIL, "soon").unwrap();
        assert_eq!(read_block_record(&store, 0), BlockRecord::Corrupt);
        assert_eq!(read_block_record(&store, 0).active_until(), None);
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let store = MemoryStore::new();
        write_block_record(&store, 1_000).unwrap();
        assert_eq!(
            read_block_record(&store, 999),
            BlockRecord::Active {
                blocked_until_ms: 1_000
            }
        );
        assert_eq!(
            read_block_record(&store, 1_000),
            BlockRecord::Expired {
                blocked_until_ms: 1_000
            }
        );
    }

    #[test]
    fn clearing_removes_every_block_key() {
        let store = MemoryStore::new();
        write_block_record(&store, 1_000).unwrap();
        store.set(KEY_REFRESH_ATTEMPT_TIME, "10").unwrap();
        store.set(KEY_SESSION_ID, "session-1").unwrap();

        clear_block_record(&store).unwrap();

        let snapshot = store.snapshot();
        assert!(!snapshot.contains_key(KEY_BLOCKED_UNTIL));
        assert!(!snapshot.contains_key(KEY_BLOCK_STATE));
        assert!(!snapshot.contains_key(KEY_REFRESH_ATTEMPT_TIME));
        assert!(snapshot.contains_key(KEY_SESSION_ID));
    }

    #[test]
    fn key_combo_parses_and_matches_with_extra_modifiers() {
        let combo = KeyCombo::parse("Ctrl+Shift+I").unwrap();
        assert_eq!(combo, KeyCombo::new("I").ctrl().shift());
        assert!(combo.matches(&KeyCombo::new("i").ctrl().shift().alt()));
        assert!(!combo.matches(&KeyCombo::new("i").ctrl()));
        assert!(KeyCombo::parse("Meta+").is_err());
        assert!(KeyCombo::parse("Hyper+x").is_err());
    }

    #[test]
    fn config_rejects_zero_penalty_and_plain_http() {
        let mut config = GuardConfig::default();
        config.validate().expect("defaults are valid");

        config.escalation_penalty_ms = 0;
        assert!(config.validate().is_err());

        let mut config = GuardConfig::default();
        config.collector_endpoint = "http://collector.test/events".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_json_fills_missing_fields_with_defaults() {
        let config = GuardConfig::from_json_str(
            r#"{"violation_threshold":5,"protected_shortcuts":["F12","Ctrl+U"]}"#,
        )
        .expect("config should decode");
        assert_eq!(config.violation_threshold, 5);
        assert_eq!(config.base_block_duration_ms, 600_000);
        assert_eq!(config.protected_shortcuts[1], KeyCombo::new("U").ctrl());
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(100);
        clock.advance(50);
        assert_eq!(clock.now_ms(), 150);
        clock.set(10);
        assert_eq!(clock.now_ms(), 10);
    }
}
