// crates/orion-core/src/severity.rs
// ============================================================================
// Module: Orion Severity
// Description: Shared severity orderings for events and incidents.
// Purpose: Give Guardian and Brain a single, total ordering to reason about
//          "never escalate beyond observed data".
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Events and incidents use two different four-value severity scales that
//! map onto each other in a fixed way. Both derive `Ord` so correlation logic
//! can take a `max()` directly instead of hand-rolling comparisons.

use serde::Deserialize;
use serde::Serialize;

/// Severity as reported by a watcher on an [`crate::contracts::Event`].
///
/// # Invariants
/// - Ordering is `Info < Warning < Error < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    /// Informational, no correlation trigger on its own.
    Info,
    /// Warning-level; the floor for correlation-window membership.
    Warning,
    /// Error-level.
    Error,
    /// Critical-level.
    Critical,
}

/// Severity assigned to an [`crate::contracts::Incident`] by Guardian.
///
/// # Invariants
/// - Ordering is `Low < Medium < High < Critical`.
/// - An incident's severity never exceeds `max(member event severities)`
///   mapped through [`EventSeverity::to_incident_severity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    /// Low severity; informational events only.
    Low,
    /// Medium severity; warning-level events.
    Medium,
    /// High severity; error-level events.
    High,
    /// Critical severity; at least one critical event.
    Critical,
}

impl EventSeverity {
    /// Maps an event severity onto the incident severity scale
    /// (`info -> low`, `warning -> medium`, `error -> high`, `critical -> critical`).
    #[must_use]
    pub const fn to_incident_severity(self) -> IncidentSeverity {
        match self {
            Self::Info => IncidentSeverity::Low,
            Self::Warning => IncidentSeverity::Medium,
            Self::Error => IncidentSeverity::High,
            Self::Critical => IncidentSeverity::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_severity_orders_correctly() {
        assert!(EventSeverity::Info < EventSeverity::Warning);
        assert!(EventSeverity::Warning < EventSeverity::Error);
        assert!(EventSeverity::Error < EventSeverity::Critical);
    }

    #[test]
    fn mapping_preserves_order() {
        assert_eq!(EventSeverity::Info.to_incident_severity(), IncidentSeverity::Low);
        assert_eq!(EventSeverity::Warning.to_incident_severity(), IncidentSeverity::Medium);
        assert_eq!(EventSeverity::Error.to_incident_severity(), IncidentSeverity::High);
        assert_eq!(EventSeverity::Critical.to_incident_severity(), IncidentSeverity::Critical);
    }
}
