// crates/orion-guardian/src/correlator.rs
// ============================================================================
// Module: Guardian Correlator
// Description: Pure, buffer-and-window event correlation logic.
// Purpose: Deduplicate and correlate raw events into incidents, with no I/O,
//          so the algorithm in spec.md §4.2 is unit-testable in isolation.
// Dependencies: orion-core, std::collections
// ============================================================================

//! ## Overview
//! [`Correlator`] holds the bounded event buffer and the
//! fingerprint-to-incident map described in spec.md §4.2. [`Correlator::ingest`]
//! is the entire algorithm: append, compute the window, classify, dedupe,
//! and build an [`Incident`] if one is warranted. It takes the event's own
//! timestamp as "now" for window arithmetic — correlation is a function of
//! observed event times, not wall-clock arrival time, so out-of-order
//! redelivery from the bus cannot change which events fall in-window.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::VecDeque;

use orion_core::contracts::CorrelationWindow;
use orion_core::contracts::Event;
use orion_core::contracts::Incident;
use orion_core::contracts::IncidentState;
use orion_core::fingerprint::fingerprint;
use orion_core::identifiers::IncidentId;
use orion_core::severity::EventSeverity;
use orion_core::severity::IncidentSeverity;
use time::OffsetDateTime;

/// Default bounded event buffer size (spec.md §4.2).
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// Default correlation window, in seconds (spec.md §4.2).
pub const DEFAULT_WINDOW_SECONDS: i64 = 60;

/// Maps a head event's `event_type` to an incident type. Anything not
/// listed falls back to `"correlation_detected"`.
#[must_use]
pub fn incident_type_for(event_type: &str) -> &'static str {
    match event_type {
        "service_down" => "service_outage",
        "metric_threshold_exceeded" => "metric_anomaly",
        "edge_device_offline" => "edge_device_failure",
        _ => "correlation_detected",
    }
}

/// Buffer-and-window correlator.
///
/// # Invariants
/// - The buffer never exceeds `max_buffer` entries; the oldest is evicted
///   first.
/// - A fingerprint, once mapped, suppresses every later event sharing it.
pub struct Correlator {
    max_buffer: usize,
    window: time::Duration,
    buffer: VecDeque<Event>,
    emitted: HashMap<String, IncidentId>,
}

impl Correlator {
    /// Builds a correlator with the given buffer size and correlation
    /// window.
    #[must_use]
    pub fn new(max_buffer: usize, window_seconds: i64) -> Self {
        Self {
            max_buffer,
            window: time::Duration::seconds(window_seconds),
            buffer: VecDeque::new(),
            emitted: HashMap::new(),
        }
    }

    /// Ingests one event, returning an [`Incident`] if correlation and
    /// deduplication warrant emitting one.
    pub fn ingest(&mut self, event: Event) -> Option<Incident> {
        self.buffer.push_back(event);
        while self.buffer.len() > self.max_buffer {
            self.buffer.pop_front();
        }
        let head = self.buffer.back().expect("just pushed").clone();

        let window_start = head.timestamp - self.window;
        let within_window: Vec<&Event> =
            self.buffer.iter().filter(|candidate| candidate.timestamp >= window_start).collect();

        let has_warning_or_above =
            within_window.iter().any(|candidate| candidate.severity >= EventSeverity::Warning);
        if !has_warning_or_above {
            return None;
        }

        let fp = fingerprint(&head);
        if self.emitted.contains_key(&fp) {
            return None;
        }

        let severity = within_window
            .iter()
            .map(|candidate| candidate.severity)
            .max()
            .unwrap_or(EventSeverity::Info)
            .to_incident_severity();

        let event_ids: BTreeSet<_> = within_window.iter().map(|candidate| candidate.event_id).collect();
        let window_start_ts = within_window
            .iter()
            .map(|candidate| candidate.timestamp)
            .min()
            .unwrap_or(head.timestamp);

        let incident = Incident::new(
            incident_type_for(&head.event_type),
            severity,
            event_ids,
            CorrelationWindow { start: window_start_ts, end: head.timestamp },
            describe(&head, severity),
            head.timestamp,
        )
        .ok()?;

        self.emitted.insert(fp, incident.incident_id);
        Some(incident)
    }
}

fn describe(head: &Event, severity: IncidentSeverity) -> String {
    format!(
        "correlated {} ({:?} severity) observed from {}",
        head.event_type, severity, head.source
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(event_type: &str, severity: EventSeverity, ts: OffsetDateTime) -> Event {
        Event::new("watcher-a", event_type, severity, json!({}), ts)
    }

    #[test]
    fn info_only_events_do_not_correlate() {
        let mut correlator = Correlator::new(DEFAULT_BUFFER_SIZE, DEFAULT_WINDOW_SECONDS);
        let now = OffsetDateTime::now_utc();
        assert!(correlator.ingest(event("heartbeat", EventSeverity::Info, now)).is_none());
    }

    #[test]
    fn warning_or_above_correlates_and_maps_incident_type() {
        let mut correlator = Correlator::new(DEFAULT_BUFFER_SIZE, DEFAULT_WINDOW_SECONDS);
        let now = OffsetDateTime::now_utc();
        let incident =
            correlator.ingest(event("service_down", EventSeverity::Critical, now)).expect("incident");
        assert_eq!(incident.incident_type, "service_outage");
        assert_eq!(incident.severity, IncidentSeverity::Critical);
        assert_eq!(incident.state, IncidentState::Open);
    }

    #[test]
    fn duplicate_fingerprint_is_suppressed() {
        let mut correlator = Correlator::new(DEFAULT_BUFFER_SIZE, DEFAULT_WINDOW_SECONDS);
        let now = OffsetDateTime::now_utc();
        let first = correlator.ingest(event("service_down", EventSeverity::Error, now));
        assert!(first.is_some());
        let second = correlator.ingest(event("service_down", EventSeverity::Error, now + time::Duration::seconds(1)));
        assert!(second.is_none());
    }

    #[test]
    fn incident_severity_never_exceeds_max_member_severity() {
        let mut correlator = Correlator::new(DEFAULT_BUFFER_SIZE, DEFAULT_WINDOW_SECONDS);
        let now = OffsetDateTime::now_utc();
        correlator.ingest(event("metric_threshold_exceeded", EventSeverity::Warning, now));
        let incident = correlator
            .ingest(event("metric_threshold_exceeded", EventSeverity::Warning, now + time::Duration::seconds(5)));
        if let Some(incident) = incident {
            assert!(incident.severity <= IncidentSeverity::Medium);
        }
    }

    #[test]
    fn events_outside_the_window_do_not_contribute() {
        let mut correlator = Correlator::new(DEFAULT_BUFFER_SIZE, 60);
        let t0 = OffsetDateTime::now_utc();
        correlator.ingest(event("service_down", EventSeverity::Critical, t0));
        let later = t0 + time::Duration::seconds(120);
        let incident =
            correlator.ingest(event("edge_device_offline", EventSeverity::Warning, later)).expect("incident");
        assert_eq!(incident.event_ids.len(), 1);
        assert_eq!(incident.incident_type, "edge_device_failure");
    }

    #[test]
    fn buffer_is_bounded() {
        let mut correlator = Correlator::new(3, DEFAULT_WINDOW_SECONDS);
        let now = OffsetDateTime::now_utc();
        for n in 0..10 {
            correlator.ingest(event(&format!("type_{n}"), EventSeverity::Info, now));
        }
        assert!(correlator.buffer.len() <= 3);
    }
}
