//! Integration tests for best-effort visitor profile collection.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use gallery_guard_fingerprint::{
    CachingResolver, EnvironmentSignals, GeoPosition, HashStrategy, LOOKUP_PENDING, Lookup,
    LookupError, OfflineResolver, OriginDetails, OriginResolver, PrivilegedOrigins, RollingHash,
    SignalSource, StaticResolver, StaticSignalSource, UNKNOWN, VisitorProfile, collect_profile,
    compute_fingerprint, resolve_profile,
};

struct PartialResolver;

impl OriginResolver for PartialResolver {
    fn public_ip(&self) -> Result<String, LookupError> {
        Ok("198.51.100.7".to_string())
    }

    fn origin_details(&self) -> Result<OriginDetails, LookupError> {
        Err(LookupError::Network("connection reset".to_string()))
    }

    fn geolocation(&self) -> Result<GeoPosition, LookupError> {
        Ok(GeoPosition {
            latitude: 48.85,
            longitude: 2.35,
            accuracy_m: 30.0,
        })
    }
}

#[derive(Default)]
struct CountingResolver {
    ip_calls: AtomicUsize,
}

impl OriginResolver for CountingResolver {
    fn public_ip(&self) -> Result<String, LookupError> {
        self.ip_calls.fetch_add(1, Ordering::SeqCst);
        Ok("192.0.2.10".to_string())
    }

    fn origin_details(&self) -> Result<OriginDetails, LookupError> {
        Err(LookupError::Network("timeout".to_string()))
    }

    fn geolocation(&self) -> Result<GeoPosition, LookupError> {
        Err(LookupError::Unsupported("denied".to_string()))
    }
}

struct ConstantHash;

impl HashStrategy for ConstantHash {
    fn fingerprint(&self, _components: &str) -> String {
        "fp-constant".to_string()
    }
}

fn signals() -> EnvironmentSignals {
    EnvironmentSignals {
        platform: Some("Win32".to_string()),
        screen_width: Some(1366),
        screen_height: Some(768),
        timezone_offset_minutes: Some(-60),
        ..EnvironmentSignals::default()
    }
}

#[test]
fn visitor_profile_tests_offline_lookups_degrade_to_unknown() {
    let profile = collect_profile(
        &StaticSignalSource::new(signals()),
        &OfflineResolver,
        &RollingHash,
    );
    assert_eq!(profile.ip, UNKNOWN);
    assert!(matches!(profile.origin, Lookup::Unavailable(_)));
    assert!(profile.geolocation.known().is_none());
    assert_eq!(profile.country(), None);
    assert_eq!(profile.platform_summary(), "Win32 - 1366x768");
    assert!(profile.fingerprint.as_str().starts_with("fp-"));
}

#[test]
fn visitor_profile_tests_partial_failures_are_independent() {
    let profile = collect_profile(
        &StaticSignalSource::new(signals()),
        &PartialResolver,
        &ConstantHash,
    );
    assert_eq!(profile.ip, "198.51.100.7");
    assert_eq!(
        profile.origin,
        Lookup::Unavailable("network failure: connection reset".to_string())
    );
    assert!(profile.geolocation.known().is_some());
    assert_eq!(profile.fingerprint.as_str(), "fp-constant");
}

#[test]
fn visitor_profile_tests_fingerprint_is_stable_across_loads() {
    let source = StaticSignalSource::new(signals());
    let first = collect_profile(&source, &OfflineResolver, &RollingHash);
    let second = collect_profile(&source, &OfflineResolver, &RollingHash);
    assert_eq!(first.fingerprint, second.fingerprint);
}

#[test]
fn visitor_profile_tests_privileged_match_uses_resolved_ip() {
    let origins = PrivilegedOrigins::parse(&["192.0.2.10"]).expect("valid allow-list");
    let admin = StaticResolver::new("192.0.2.10", OriginDetails::default());
    let visitor = StaticResolver::new("192.0.2.11", OriginDetails::default());

    assert!(origins.resolve(&admin));
    assert!(!origins.resolve(&visitor));
    assert!(!origins.resolve(&OfflineResolver));
    assert!(!PrivilegedOrigins::default().resolve(&admin));
}

#[test]
fn visitor_profile_tests_local_profile_marks_lookups_pending() {
    let signals = StaticSignalSource::new(signals()).collect();
    let fingerprint = compute_fingerprint(&signals, &ConstantHash);
    let profile = VisitorProfile::local(signals, fingerprint);
    assert_eq!(profile.ip, UNKNOWN);
    assert_eq!(profile.origin, Lookup::Unavailable(LOOKUP_PENDING.to_string()));
    assert_eq!(profile.fingerprint.as_str(), "fp-constant");
}

#[test]
fn visitor_profile_tests_caching_resolver_looks_up_ip_once() {
    let inner = Arc::new(CountingResolver::default());
    let resolver = CachingResolver::new(inner.clone());
    assert_eq!(resolver.resolved_ip(), None);

    let origins = PrivilegedOrigins::parse(&["192.0.2.10"]).expect("valid allow-list");
    assert!(origins.resolve(&resolver));
    assert_eq!(resolver.resolved_ip(), Some("192.0.2.10"));

    let signals = signals();
    let fingerprint = compute_fingerprint(&signals, &RollingHash);
    let profile = resolve_profile(signals, fingerprint, &resolver);
    assert_eq!(profile.ip, "192.0.2.10");
    assert!(profile.origin.known().is_none());
    assert!(profile.geolocation.known().is_none());
    assert_eq!(inner.ip_calls.load(Ordering::SeqCst), 1);
}
