// crates/orion-core/src/contracts/incident.rs
// ============================================================================
// Module: Incident Contract
// Description: Correlated condition published by Guardian.
// Purpose: Canonical wire shape for the `incident` stream.
// Dependencies: serde, time
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::contracts::CONTRACT_VERSION;
use crate::identifiers::EventId;
use crate::identifiers::IncidentId;
use crate::severity::IncidentSeverity;

/// Lifecycle state of an incident.
///
/// # Invariants
/// - An incident is created `Open`; this crate does not model further
///   transitions (out of scope: acknowledgement is routed through the audit
///   store, not a state mutation — see `DESIGN.md` Open Question (b)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentState {
    /// The incident is active and has not been superseded.
    Open,
}

/// The time window over which member events were correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorrelationWindow {
    /// Start of the correlation window, RFC3339 UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    /// End of the correlation window, RFC3339 UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

/// Correlated condition derived from one or more events.
///
/// # Invariants
/// - `event_ids` is non-empty.
/// - `severity <= max(severity of member events)` mapped through
///   [`crate::severity::EventSeverity::to_incident_severity`] — Guardian
///   must never escalate beyond observed data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Incident {
    /// Contract schema version, always [`CONTRACT_VERSION`].
    pub version: String,
    /// Identifier for this incident.
    pub incident_id: IncidentId,
    /// Wall-clock publication time, RFC3339 UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Always `"guardian"`.
    pub source: String,
    /// Incident type, derived from the head event's `event_type`.
    pub incident_type: String,
    /// Severity, the max of member event severities mapped onto the
    /// incident scale.
    pub severity: IncidentSeverity,
    /// Member event identifiers; always non-empty.
    pub event_ids: BTreeSet<EventId>,
    /// Correlation window used to gather member events.
    pub correlation_window: CorrelationWindow,
    /// Lifecycle state.
    pub state: IncidentState,
    /// Human-readable description.
    pub description: String,
}

/// Error building an [`Incident`].
#[derive(Debug, thiserror::Error)]
pub enum IncidentError {
    /// `event_ids` was empty.
    #[error("incident must correlate at least one event")]
    EmptyEventIds,
}

impl Incident {
    /// Builds a new incident, rejecting an empty `event_ids` set.
    ///
    /// # Errors
    ///
    /// Returns [`IncidentError::EmptyEventIds`] if `event_ids` is empty.
    #[allow(clippy::too_many_arguments, reason = "mirrors the flat contract shape")]
    pub fn new(
        incident_type: impl Into<String>,
        severity: IncidentSeverity,
        event_ids: BTreeSet<EventId>,
        correlation_window: CorrelationWindow,
        description: impl Into<String>,
        now: OffsetDateTime,
    ) -> Result<Self, IncidentError> {
        if event_ids.is_empty() {
            return Err(IncidentError::EmptyEventIds);
        }
        Ok(Self {
            version: CONTRACT_VERSION.to_string(),
            incident_id: IncidentId::new(),
            timestamp: now,
            source: "guardian".to_string(),
            incident_type: incident_type.into(),
            severity,
            event_ids,
            correlation_window,
            state: IncidentState::Open,
            description: description.into(),
        })
    }
}
