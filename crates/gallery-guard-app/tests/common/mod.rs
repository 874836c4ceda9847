//! Shared fixtures for app integration tests.

use std::sync::Arc;

use gallery_guard_app::RuntimeDeps;
use gallery_guard_core::{ManualClock, MemoryStore, PageContext};
use gallery_guard_fingerprint::{
    EnvironmentSignals, OfflineResolver, OriginDetails, OriginResolver, RollingHash,
    StaticResolver, StaticSignalSource,
};
use gallery_guard_monitor::{DevToolsDetector, WindowMetrics, WindowMetricsSource};
use gallery_guard_report::RecordingTransport;

/// In-memory collaborators shared across loads of one test.
#[allow(dead_code)]
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub transport: Arc<RecordingTransport>,
    pub resolver: Arc<dyn OriginResolver>,
    pub window_gap: Option<Arc<dyn DevToolsDetector>>,
}

#[allow(dead_code)]
impl Harness {
    /// Offline visitor starting at `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            clock: Arc::new(ManualClock::new(start_ms)),
            transport: Arc::new(RecordingTransport::new()),
            resolver: Arc::new(OfflineResolver),
            window_gap: None,
        }
    }

    /// Visitor resolving to `ip`.
    pub fn with_ip(mut self, ip: &str) -> Self {
        self.resolver = Arc::new(StaticResolver::new(
            ip,
            OriginDetails {
                country: Some("France".to_string()),
                ..OriginDetails::default()
            },
        ));
        self
    }

    /// Dependencies for one page load.
    pub fn deps(&self) -> RuntimeDeps {
        RuntimeDeps {
            store: self.store.clone(),
            clock: self.clock.clone(),
            resolver: self.resolver.clone(),
            signals: Arc::new(StaticSignalSource::new(fixture_signals())),
            hasher: Arc::new(RollingHash),
            transport: self.transport.clone(),
            window_gap: self.window_gap.clone(),
            debugger: None,
        }
    }
}

/// Deterministic desktop signals.
#[allow(dead_code)]
pub fn fixture_signals() -> EnvironmentSignals {
    EnvironmentSignals {
        user_agent: Some("Mozilla/5.0 (X11; Linux x86_64)".to_string()),
        platform: Some("Linux x86_64".to_string()),
        screen_width: Some(1920),
        screen_height: Some(1080),
        languages: vec!["en-US".to_string()],
        ..EnvironmentSignals::default()
    }
}

/// Gallery page context.
#[allow(dead_code)]
pub fn fixture_page() -> PageContext {
    PageContext {
        url: "https://gallery.example.test/".to_string(),
        referrer: None,
    }
}

/// Window metrics with a fixed outer/inner gap.
#[allow(dead_code)]
pub struct FixedMetrics(pub WindowMetrics);

impl WindowMetricsSource for FixedMetrics {
    fn sample(&self) -> Option<WindowMetrics> {
        Some(self.0)
    }
}
