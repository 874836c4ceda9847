#![warn(missing_docs)]
//! # gallery-guard-report
//!
//! ## Purpose
//! Turns lockout log entries into structured collector messages and delivers
//! them through an injected transport.
//!
//! ## Responsibilities
//! - Build versioned [`LogMessage`] documents with RFC 3339 timestamps.
//! - Attach the visitor profile summary and block alert details.
//! - Derive a stable SHA-256 delivery key per message.
//! - Deliver fire-and-forget: failures are recorded, never retried.
//!
//! ## Data flow
//! [`LogEntry`] -> [`LogMessage`] -> [`LogEnvelope`] -> [`LogTransport`].
//!
//! ## Ownership and lifetimes
//! [`RemoteLogger`] owns the endpoint and shares the transport through `Arc`.
//! The visitor profile is attached once it is known and cloned into messages.
//!
//! ## Error model
//! Endpoint validation returns [`ReportError`]. Delivery failures are
//! classified with [`classify_delivery_error`] and kept in a local list.
//!
//! ## Security and privacy notes
//! Only HTTPS collector endpoints are accepted. Envelope bodies are not logged.

use std::sync::{Arc, Mutex, PoisonError};

use gallery_guard_core::{
    BlockDetails, CoreError, LogEntry, LogKind, LogSink, validate_https_endpoint,
};
use gallery_guard_fingerprint::{UNKNOWN, VisitorProfile};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};

/// Canonical schema tag for v1 collector messages.
pub const MESSAGE_SCHEMA_VERSION: &str = "v1";

/// Visitor summary attached to every message once the profile is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorSummary {
    /// Public IP or `"unknown"`.
    pub ip: String,
    /// Country or `"unknown"`.
    pub country: String,
    /// City or `"unknown"`.
    pub city: String,
    /// Network operator or `"unknown"`.
    pub org: String,
    /// `"<platform> - <w>x<h>"`.
    pub platform: String,
}

impl VisitorSummary {
    /// Projects a profile into its reportable summary.
    pub fn from_profile(profile: &VisitorProfile) -> Self {
        let details = profile.origin.known();
        let pick = |field: Option<&String>| field.cloned().unwrap_or_else(|| UNKNOWN.to_string());
        Self {
            ip: profile.ip.clone(),
            country: pick(details.and_then(|d| d.country.as_ref())),
            city: pick(details.and_then(|d| d.city.as_ref())),
            org: pick(details.and_then(|d| d.org.as_ref())),
            platform: profile.platform_summary(),
        }
    }
}

/// Extra fields carried by block alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAlert {
    /// Human-readable reason.
    pub reason: String,
    /// Configured base duration as text, e.g. `"10 minutes"`.
    pub duration: String,
    /// Expiry as RFC 3339.
    pub blocked_until: String,
    /// Visitor IP or `"unknown"`.
    pub origin: String,
    /// Visitor country or `"unknown"`.
    pub country: String,
    /// Platform summary or `"unknown"`.
    pub platform: String,
}

/// Structured message posted to the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    /// Schema tag.
    pub schema_version: String,
    /// Record category.
    pub kind: LogKind,
    /// What happened.
    pub activity: String,
    /// Event time as RFC 3339.
    pub timestamp: String,
    /// Event time in epoch milliseconds.
    pub timestamp_ms: u64,
    /// Page address.
    pub url: String,
    /// Referring page.
    pub referrer: Option<String>,
    /// Session token of the load.
    pub session_id: String,
    /// Fingerprint or `"unknown"`.
    pub fingerprint: String,
    /// Violation counter (suspicious entries only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Visitor summary, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor: Option<VisitorSummary>,
    /// Block alert fields (block entries only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<BlockAlert>,
}

impl LogMessage {
    /// Builds a message from a log entry and the optional visitor profile.
    ///
    /// # Errors
    /// Returns [`ReportError::Timestamp`] when a timestamp is out of range.
    pub fn from_entry(entry: &LogEntry, profile: Option<&VisitorProfile>) -> Result<Self, ReportError> {
        let visitor = profile.map(VisitorSummary::from_profile);
        let alert = match &entry.block {
            Some(details) => Some(block_alert(details, visitor.as_ref())?),
            None => None,
        };

        Ok(Self {
            schema_version: MESSAGE_SCHEMA_VERSION.to_string(),
            kind: entry.kind,
            activity: entry.activity.clone(),
            timestamp: format_timestamp(entry.timestamp_ms)?,
            timestamp_ms: entry.timestamp_ms,
            url: entry.url.clone(),
            referrer: entry.referrer.clone(),
            session_id: entry.session_id.clone(),
            fingerprint: entry
                .fingerprint
                .clone()
                .or_else(|| profile.map(|p| p.fingerprint.to_string()))
                .unwrap_or_else(|| UNKNOWN.to_string()),
            count: entry.count,
            visitor,
            alert,
        })
    }
}

fn block_alert(details: &BlockDetails, visitor: Option<&VisitorSummary>) -> Result<BlockAlert, ReportError> {
    let (origin, country, platform) = match visitor {
        Some(summary) => (
            summary.ip.clone(),
            summary.country.clone(),
            summary.platform.clone(),
        ),
        None => (UNKNOWN.to_string(), UNKNOWN.to_string(), UNKNOWN.to_string()),
    };
    Ok(BlockAlert {
        reason: details.reason.describe(),
        duration: describe_duration(details.base_duration_ms),
        blocked_until: format_timestamp(details.blocked_until_ms)?,
        origin,
        country,
        platform,
    })
}

/// Formats epoch milliseconds as RFC 3339 UTC.
///
/// # Errors
/// Returns [`ReportError::Timestamp`] when the instant is out of range.
pub fn format_timestamp(epoch_ms: u64) -> Result<String, ReportError> {
    let nanos = i128::from(epoch_ms) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|error| ReportError::Timestamp(error.to_string()))?
        .format(&Rfc3339)
        .map_err(|error| ReportError::Timestamp(error.to_string()))
}

/// Renders a duration as whole minutes when exact, seconds otherwise.
pub fn describe_duration(duration_ms: u64) -> String {
    let seconds = duration_ms / 1_000;
    match (seconds / 60, seconds % 60) {
        (1, 0) => "1 minute".to_string(),
        (minutes, 0) if minutes > 0 => format!("{minutes} minutes"),
        _ => format!("{seconds} seconds"),
    }
}

/// Computes the SHA-256 delivery key from the identifying message fields.
pub fn delivery_key_for_message(message: &LogMessage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.session_id.as_bytes());
    hasher.update(message.timestamp_ms.to_be_bytes());
    hasher.update(format!("{:?}", message.kind).as_bytes());
    hasher.update(message.activity.as_bytes());
    hasher.update(message.count.unwrap_or_default().to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Serialized message ready for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEnvelope {
    /// Collector-side deduplication key.
    pub delivery_key: String,
    /// Target endpoint.
    pub endpoint: String,
    /// JSON body.
    pub body: String,
}

/// Outbound transport. Implementations must not block the caller for long.
pub trait LogTransport: Send + Sync {
    /// Posts one envelope.
    fn send(&self, envelope: &LogEnvelope) -> Result<(), DeliveryError>;
}

/// Transport that keeps envelopes in memory.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<LogEnvelope>>,
}

impl RecordingTransport {
    /// Creates an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Envelopes sent so far.
    pub fn sent(&self) -> Vec<LogEnvelope> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl LogTransport for RecordingTransport {
    fn send(&self, envelope: &LogEnvelope) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope.clone());
        Ok(())
    }
}

/// Delivery failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The collector may accept the message later.
    Transient,
    /// The collector rejected the message.
    Permanent,
}

/// Classifies delivery failures for local diagnostics.
pub fn classify_delivery_error(error: &DeliveryError) -> FailureClass {
    match error {
        DeliveryError::Timeout | DeliveryError::Network(_) => FailureClass::Transient,
        DeliveryError::Server(status) if *status >= 500 => FailureClass::Transient,
        DeliveryError::Server(_) | DeliveryError::Client(_) => FailureClass::Permanent,
    }
}

/// One message that could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Key of the dropped envelope.
    pub delivery_key: String,
    /// Activity text of the dropped message.
    pub activity: String,
    /// Failure cause.
    pub error: DeliveryError,
    /// Failure class.
    pub class: FailureClass,
}

/// Fire-and-forget collector client.
pub struct RemoteLogger {
    endpoint: String,
    transport: Arc<dyn LogTransport>,
    profile: Mutex<Option<VisitorProfile>>,
    failures: Mutex<Vec<DeliveryFailure>>,
}

impl RemoteLogger {
    /// Creates a logger for an HTTPS endpoint.
    ///
    /// # Errors
    /// Returns [`ReportError::Endpoint`] for non-HTTPS or malformed URLs.
    pub fn new(endpoint: &str, transport: Arc<dyn LogTransport>) -> Result<Self, ReportError> {
        validate_https_endpoint(endpoint).map_err(ReportError::Endpoint)?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            transport,
            profile: Mutex::new(None),
            failures: Mutex::new(Vec::new()),
        })
    }

    /// Attaches the visitor profile to every subsequent message.
    pub fn attach_profile(&self, profile: VisitorProfile) {
        *self.profile.lock().unwrap_or_else(PoisonError::into_inner) = Some(profile);
    }

    /// Builds the envelope for one entry without sending it.
    ///
    /// # Errors
    /// Returns [`ReportError`] when the message cannot be encoded.
    pub fn envelope_for(&self, entry: &LogEntry) -> Result<LogEnvelope, ReportError> {
        let profile = self.profile.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let message = LogMessage::from_entry(entry, profile.as_ref())?;
        Ok(LogEnvelope {
            delivery_key: delivery_key_for_message(&message),
            endpoint: self.endpoint.clone(),
            body: serde_json::to_string(&message)?,
        })
    }

    /// Messages dropped so far.
    pub fn failures(&self) -> Vec<DeliveryFailure> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Collector endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl LogSink for RemoteLogger {
    fn emit(&self, entry: &LogEntry) {
        let envelope = match self.envelope_for(entry) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!("[report] dropping unencodable entry: {error}");
                return;
            }
        };

        match self.transport.send(&envelope) {
            Ok(()) => debug!("[report] delivered key={}", envelope.delivery_key),
            Err(error) => {
                let class = classify_delivery_error(&error);
                warn!("[report] delivery failed ({class:?}): {error}");
                self.failures
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(DeliveryFailure {
                        delivery_key: envelope.delivery_key,
                        activity: entry.activity.clone(),
                        error,
                        class,
                    });
            }
        }
    }
}

/// Message building and endpoint errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Collector endpoint failed validation.
    #[error("invalid collector endpoint: {0}")]
    Endpoint(CoreError),
    /// Timestamp out of the representable range.
    #[error("timestamp out of range: {0}")]
    Timestamp(String),
    /// JSON encoding failure.
    #[error("message encoding failed: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Transport-level delivery errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Request timed out.
    #[error("delivery timed out")]
    Timeout,
    /// Connection-level failure.
    #[error("network failure: {0}")]
    Network(String),
    /// Collector answered with a 5xx-family status.
    #[error("collector error status {0}")]
    Server(u16),
    /// Collector rejected the request.
    #[error("collector rejected request with status {0}")]
    Client(u16),
}
