// crates/orion-core/src/contracts/event.rs
// ============================================================================
// Module: Event Contract
// Description: Raw observation published by a watcher.
// Purpose: Canonical wire shape for the `event` stream.
// Dependencies: serde, serde_json, time
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::contracts::CONTRACT_VERSION;
use crate::identifiers::EventId;
use crate::severity::EventSeverity;

/// Raw observation emitted by a watcher.
///
/// # Invariants
/// - Created by a watcher, never mutated after publication.
/// - `data` is an opaque, watcher-defined map; Guardian reads well-known
///   optional keys (`service_name`, `resource_type`) out of it for
///   fingerprinting but does not otherwise interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Event {
    /// Contract schema version, always [`CONTRACT_VERSION`].
    pub version: String,
    /// Identifier for this event.
    pub event_id: EventId,
    /// Wall-clock publication time, RFC3339 UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Watcher name that produced this event.
    pub source: String,
    /// Watcher-defined event type (e.g. `service_down`).
    pub event_type: String,
    /// Severity as reported by the watcher.
    pub severity: EventSeverity,
    /// Opaque watcher-defined payload.
    pub data: Value,
}

impl Event {
    /// Builds a new event stamped with `version = 1.0` at the given time.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        event_type: impl Into<String>,
        severity: EventSeverity,
        data: Value,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            version: CONTRACT_VERSION.to_string(),
            event_id: EventId::new(),
            timestamp: now,
            source: source.into(),
            event_type: event_type.into(),
            severity,
            data,
        }
    }

    /// Returns `data.service_name` if present and a string.
    #[must_use]
    pub fn service_name(&self) -> Option<&str> {
        self.data.get("service_name").and_then(Value::as_str)
    }

    /// Returns `data.resource_type` if present and a string.
    #[must_use]
    pub fn resource_type(&self) -> Option<&str> {
        self.data.get("resource_type").and_then(Value::as_str)
    }
}
