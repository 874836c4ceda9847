#![warn(missing_docs)]
//! # gallery-guard-fingerprint
//!
//! ## Purpose
//! Derives the visitor identity for one page load.
//!
//! ## Responsibilities
//! - Define a backend-agnostic source of environment signals.
//! - Hash signals into a non-cryptographic fingerprint through a replaceable
//!   [`HashStrategy`].
//! - Generate per-load [`SessionToken`] values.
//! - Resolve network origin, origin details and geolocation best-effort.
//! - Decide whether the visitor belongs to the privileged allow-list.
//!
//! ## Data flow
//! Host exposes signals through [`SignalSource`] -> [`compute_fingerprint`]
//! hashes them -> [`VisitorProfile::local`] is usable immediately ->
//! [`resolve_profile`] adds [`OriginResolver`] lookups later ->
//! [`VisitorProfile`] feeds the lockout view and outbound logs.
//! [`collect_profile`] runs both steps at once. [`CachingResolver`] lets the
//! privileged check and the later lookups share one public-IP request.
//!
//! ## Ownership and lifetimes
//! Profiles own every string so they can outlive the lookups that built them.
//!
//! ## Error model
//! Lookups return [`LookupError`]; profile collection folds every failure into
//! an `unknown`/unavailable value and never fails as a whole.
//!
//! ## Security and privacy notes
//! The fingerprint is only roughly unique and must not be used as a secret.
//! Privileged-origin resolution fails closed: any lookup error means
//! "not privileged".

use std::net::IpAddr;
use std::sync::{Arc, OnceLock};

use gallery_guard_core::SessionToken;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder for values whose lookup failed.
pub const UNKNOWN: &str = "unknown";

/// Failure text of lookups that have not run yet.
pub const LOOKUP_PENDING: &str = "lookup pending";

/// Prefix of fingerprints produced by [`RollingHash`].
pub const FINGERPRINT_PREFIX: &str = "fp-";

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SESSION_SUFFIX_LEN: usize = 9;

/// Environment signals exposed by the host. Unavailable signals are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSignals {
    /// Browser user agent.
    pub user_agent: Option<String>,
    /// Declared platform.
    pub platform: Option<String>,
    /// Screen width in CSS pixels.
    pub screen_width: Option<u32>,
    /// Screen height in CSS pixels.
    pub screen_height: Option<u32>,
    /// Screen colour depth.
    pub color_depth: Option<u32>,
    /// Local timezone offset from UTC in minutes.
    pub timezone_offset_minutes: Option<i32>,
    /// Preferred languages in order.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Hash of a reference drawing on the rendering surface.
    pub canvas_hash: Option<String>,
    /// WebGL vendor string.
    pub webgl_vendor: Option<String>,
    /// WebGL renderer string.
    pub webgl_renderer: Option<String>,
    /// Logical CPU count.
    pub hardware_concurrency: Option<u32>,
    /// `true` when the host reports automation control.
    pub webdriver: Option<bool>,
}

/// Trait implemented by concrete signal providers.
pub trait SignalSource: Send + Sync {
    /// Collects the signals available on this load.
    fn collect(&self) -> EnvironmentSignals;
}

/// Signal source returning a fixed snapshot, for tests and replays.
#[derive(Debug, Clone, Default)]
pub struct StaticSignalSource {
    signals: EnvironmentSignals,
}

impl StaticSignalSource {
    /// Wraps a snapshot.
    pub fn new(signals: EnvironmentSignals) -> Self {
        Self { signals }
    }
}

impl SignalSource for StaticSignalSource {
    fn collect(&self) -> EnvironmentSignals {
        self.signals.clone()
    }
}

/// Replaceable fingerprint hashing strategy.
pub trait HashStrategy: Send + Sync {
    /// Hashes the joined signal components into a fingerprint string.
    fn fingerprint(&self, components: &str) -> String;
}

/// 31-multiplier rolling hash over UTF-16 code units with 32-bit wrap-around.
#[derive(Debug, Default, Clone, Copy)]
pub struct RollingHash;

impl HashStrategy for RollingHash {
    fn fingerprint(&self, components: &str) -> String {
        let hash = rolling_hash_code(components);
        format!(
            "{FINGERPRINT_PREFIX}{}",
            to_base36(u64::from(hash.unsigned_abs()))
        )
    }
}

/// Raw signed rolling hash, also used to condense canvas output.
pub fn rolling_hash_code(input: &str) -> i32 {
    input.encode_utf16().fold(0_i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Derived, non-unique visitor identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Returns the fingerprint text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Joins the identifying signals with `|`, skipping empty or zero values.
pub fn fingerprint_components(signals: &EnvironmentSignals) -> String {
    let numeric = |value: Option<u32>| value.filter(|v| *v != 0).map(|v| v.to_string());
    let text = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

    let languages = (!signals.languages.is_empty()).then(|| signals.languages.join(","));
    let components = [
        text(&signals.user_agent),
        text(&signals.platform),
        numeric(signals.screen_width),
        numeric(signals.screen_height),
        numeric(signals.color_depth),
        signals
            .timezone_offset_minutes
            .filter(|offset| *offset != 0)
            .map(|offset| offset.to_string()),
        languages,
        text(&signals.canvas_hash),
        text(&signals.webgl_vendor),
        text(&signals.webgl_renderer),
    ];

    components
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("|")
}

/// Computes the fingerprint for one set of signals.
pub fn compute_fingerprint(signals: &EnvironmentSignals, hasher: &dyn HashStrategy) -> Fingerprint {
    Fingerprint(hasher.fingerprint(&fingerprint_components(signals)))
}

/// Generates a session token with the thread-local RNG.
pub fn new_session_token(now_ms: u64) -> SessionToken {
    session_token_with_rng(now_ms, &mut rand::rng())
}

/// Generates `session-<now_ms>-<9 base-36 chars>` from the supplied RNG.
pub fn session_token_with_rng<R: Rng>(now_ms: u64, rng: &mut R) -> SessionToken {
    let suffix: String = (0..SESSION_SUFFIX_LEN)
        .map(|_| char::from(BASE36_DIGITS[rng.random_range(0..BASE36_DIGITS.len())]))
        .collect();
    SessionToken::generated(now_ms, &suffix)
}

/// Network-origin details reported by a lookup service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginDetails {
    /// Country name or code.
    pub country: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// Network operator.
    pub org: Option<String>,
}

/// Geolocation reading in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy_m: f64,
}

/// Best-effort network lookups. Every method may fail independently.
pub trait OriginResolver: Send + Sync {
    /// Resolves the visitor's public IP address.
    fn public_ip(&self) -> Result<String, LookupError>;

    /// Resolves details about the visitor's network origin.
    fn origin_details(&self) -> Result<OriginDetails, LookupError>;

    /// Reads the device position.
    fn geolocation(&self) -> Result<GeoPosition, LookupError>;
}

/// Outcome of one best-effort lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup<T> {
    /// Lookup succeeded.
    Known(T),
    /// Lookup failed; carries the failure text.
    Unavailable(String),
}

impl<T> Lookup<T> {
    fn from_result(result: Result<T, LookupError>) -> Self {
        match result {
            Ok(value) => Lookup::Known(value),
            Err(error) => Lookup::Unavailable(error.to_string()),
        }
    }

    /// Returns the value when known.
    pub fn known(&self) -> Option<&T> {
        match self {
            Lookup::Known(value) => Some(value),
            Lookup::Unavailable(_) => None,
        }
    }
}

/// Everything collected about the visitor on one load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorProfile {
    /// Public IP, or [`UNKNOWN`].
    pub ip: String,
    /// Network-origin details.
    pub origin: Lookup<OriginDetails>,
    /// Device position.
    pub geolocation: Lookup<GeoPosition>,
    /// Raw signals used for the fingerprint.
    pub signals: EnvironmentSignals,
    /// Derived fingerprint.
    pub fingerprint: Fingerprint,
}

impl VisitorProfile {
    /// Country from origin details, when known.
    pub fn country(&self) -> Option<&str> {
        self.origin.known().and_then(|details| details.country.as_deref())
    }

    /// `"<platform> - <width>x<height>"` summary for alerts.
    pub fn platform_summary(&self) -> String {
        let platform = self.signals.platform.as_deref().unwrap_or(UNKNOWN);
        match (self.signals.screen_width, self.signals.screen_height) {
            (Some(width), Some(height)) => format!("{platform} - {width}x{height}"),
            _ => platform.to_string(),
        }
    }

    /// Profile known before any network lookup: signals and fingerprint only.
    pub fn local(signals: EnvironmentSignals, fingerprint: Fingerprint) -> Self {
        Self {
            ip: UNKNOWN.to_string(),
            origin: Lookup::Unavailable(LOOKUP_PENDING.to_string()),
            geolocation: Lookup::Unavailable(LOOKUP_PENDING.to_string()),
            signals,
            fingerprint,
        }
    }
}

/// Collects signals, fingerprint and network lookups. Never fails.
pub fn collect_profile(
    source: &dyn SignalSource,
    resolver: &dyn OriginResolver,
    hasher: &dyn HashStrategy,
) -> VisitorProfile {
    let signals = source.collect();
    let fingerprint = compute_fingerprint(&signals, hasher);
    resolve_profile(signals, fingerprint, resolver)
}

/// Runs the network lookups for an already fingerprinted visitor. Never fails.
pub fn resolve_profile(
    signals: EnvironmentSignals,
    fingerprint: Fingerprint,
    resolver: &dyn OriginResolver,
) -> VisitorProfile {
    VisitorProfile {
        ip: resolver.public_ip().unwrap_or_else(|_| UNKNOWN.to_string()),
        origin: Lookup::from_result(resolver.origin_details()),
        geolocation: Lookup::from_result(resolver.geolocation()),
        signals,
        fingerprint,
    }
}

/// Allow-list of network origins exempt from all protections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivilegedOrigins {
    allowed: Vec<IpAddr>,
}

impl PrivilegedOrigins {
    /// Parses an allow-list of IP address strings.
    ///
    /// # Errors
    /// Returns [`LookupError::InvalidAddress`] for the first unparsable entry.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, LookupError> {
        let allowed = entries
            .iter()
            .map(|entry| {
                entry
                    .as_ref()
                    .trim()
                    .parse::<IpAddr>()
                    .map_err(|_| LookupError::InvalidAddress(entry.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { allowed })
    }

    /// Returns `true` only when `resolved` is a listed address.
    pub fn matches(&self, resolved: &Result<String, LookupError>) -> bool {
        match resolved {
            Ok(raw) => raw
                .trim()
                .parse::<IpAddr>()
                .map(|ip| self.allowed.contains(&ip))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Resolves the visitor's IP and checks it. Lookup failure is "not privileged".
    pub fn resolve(&self, resolver: &dyn OriginResolver) -> bool {
        if self.allowed.is_empty() {
            return false;
        }
        self.matches(&resolver.public_ip())
    }
}

/// Resolver that knows nothing; every lookup is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineResolver;

impl OriginResolver for OfflineResolver {
    fn public_ip(&self) -> Result<String, LookupError> {
        Err(LookupError::Unsupported("offline".to_string()))
    }

    fn origin_details(&self) -> Result<OriginDetails, LookupError> {
        Err(LookupError::Unsupported("offline".to_string()))
    }

    fn geolocation(&self) -> Result<GeoPosition, LookupError> {
        Err(LookupError::Unsupported("offline".to_string()))
    }
}

/// Resolver answering from fixed values; geolocation is never available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticResolver {
    ip: String,
    details: OriginDetails,
}

impl StaticResolver {
    /// Creates a resolver that reports `ip` and `details`.
    pub fn new(ip: impl Into<String>, details: OriginDetails) -> Self {
        Self {
            ip: ip.into(),
            details,
        }
    }
}

impl OriginResolver for StaticResolver {
    fn public_ip(&self) -> Result<String, LookupError> {
        Ok(self.ip.clone())
    }

    fn origin_details(&self) -> Result<OriginDetails, LookupError> {
        Ok(self.details.clone())
    }

    fn geolocation(&self) -> Result<GeoPosition, LookupError> {
        Err(LookupError::Unsupported("no position source".to_string()))
    }
}

/// Resolver wrapper that performs the public-IP lookup at most once.
///
/// The privileged check and the later profile lookups share one answer.
pub struct CachingResolver {
    inner: Arc<dyn OriginResolver>,
    ip: OnceLock<Result<String, LookupError>>,
}

impl CachingResolver {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn OriginResolver>) -> Self {
        Self {
            inner,
            ip: OnceLock::new(),
        }
    }

    /// Public IP when it has already been resolved successfully.
    pub fn resolved_ip(&self) -> Option<&str> {
        match self.ip.get() {
            Some(Ok(ip)) => Some(ip.as_str()),
            Some(Err(_)) | None => None,
        }
    }
}

impl OriginResolver for CachingResolver {
    fn public_ip(&self) -> Result<String, LookupError> {
        self.ip.get_or_init(|| self.inner.public_ip()).clone()
    }

    fn origin_details(&self) -> Result<OriginDetails, LookupError> {
        self.inner.origin_details()
    }

    fn geolocation(&self) -> Result<GeoPosition, LookupError> {
        self.inner.geolocation()
    }
}

/// Lookup and allow-list errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// Capability is missing on this host.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Network request failed.
    #[error("network failure: {0}")]
    Network(String),
    /// Response could not be decoded.
    #[error("decode failure: {0}")]
    Decode(String),
    /// Allow-list entry is not an IP address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for hashing and token generation.

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn rolling_hash_matches_reference_values() {
        assert_eq!(rolling_hash_code(""), 0);
        assert_eq!(rolling_hash_code("a"), 97);
        assert_eq!(rolling_hash_code("ab"), 3_105);
        assert_eq!(RollingHash.fingerprint(""), "fp-0");
        assert_eq!(RollingHash.fingerprint("ab"), "fp-2e9");
    }

    #[test]
    fn rolling_hash_wraps_instead_of_overflowing() {
        let long = "x".repeat(10_000);
        let hashed = RollingHash.fingerprint(&long);
        assert!(hashed.starts_with(FINGERPRINT_PREFIX));
    }

    #[test]
    fn components_skip_missing_and_zero_signals() {
        let signals = EnvironmentSignals {
            user_agent: Some("UA".to_string()),
            screen_width: Some(0),
            screen_height: Some(1080),
            timezone_offset_minutes: Some(0),
            languages: vec!["fr-FR".to_string(), "en".to_string()],
            ..EnvironmentSignals::default()
        };
        assert_eq!(fingerprint_components(&signals), "UA|1080|fr-FR,en");
    }

    #[test]
    fn session_tokens_have_expected_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let token = session_token_with_rng(1_700, &mut rng);
        let suffix = token
            .as_str()
            .strip_prefix("session-1700-")
            .expect("prefix should be present");
        assert_eq!(suffix.len(), SESSION_SUFFIX_LEN);
        assert!(suffix.bytes().all(|byte| BASE36_DIGITS.contains(&byte)));
    }

    #[test]
    fn privileged_resolution_fails_closed() {
        let origins = PrivilegedOrigins::parse(&["203.0.113.7"]).unwrap();
        assert!(origins.matches(&Ok("203.0.113.7".to_string())));
        assert!(!origins.matches(&Ok("198.51.100.1".to_string())));
        assert!(!origins.matches(&Ok("not-an-ip".to_string())));
        assert!(!origins.matches(&Err(LookupError::Network("timeout".to_string()))));
        assert!(!origins.resolve(&OfflineResolver));
    }
}
