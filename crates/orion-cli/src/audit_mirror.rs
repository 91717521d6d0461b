// crates/orion-cli/src/audit_mirror.rs
// ============================================================================
// Module: Audit Mirror
// Description: Subscribes every pipeline stream onto the audit store.
// Purpose: Give `orion audit tail` something to read for every kind besides
//          escalations, which the Approval Coordinator already records
//          itself (spec.md §4.8).
// Dependencies: orion-audit, orion-bus, orion-core, tokio, tracing
// ============================================================================

//! ## Overview
//! The audit store is written from two places: the Approval Coordinator
//! writes its own escalation entries directly (it already holds a clock and
//! an `Arc<AuditStore>`), and this module mirrors the four remaining
//! streams — `event`, `incident`, `decision`, `outcome` — verbatim. Mirroring
//! reads the bus like any other subscriber; it never mutates what it reads.

use std::sync::Arc;

use orion_audit::AuditKind;
use orion_audit::AuditStore;
use orion_bus::Bus;
use orion_core::ContractKind;
use orion_core::clock::Clock;

const CONSUMER_GROUP: &str = "audit_mirror";

/// Spawns one mirroring subscription per `(stream, audit kind)` pair,
/// returning every subscription handle so the caller can cancel them all on
/// shutdown.
#[must_use]
pub fn spawn<C>(bus: &Bus, audit: Arc<AuditStore>, clock: &C) -> Vec<(orion_bus::Subscription, tokio::task::JoinHandle<()>)>
where
    C: Clock + Clone + 'static,
{
    [
        (ContractKind::Event, AuditKind::Event),
        (ContractKind::Incident, AuditKind::Incident),
        (ContractKind::Decision, AuditKind::Decision),
        (ContractKind::Outcome, AuditKind::Outcome),
    ]
    .into_iter()
    .map(|(stream, kind)| spawn_one(bus, Arc::clone(&audit), clock.clone(), stream, kind))
    .collect()
}

fn spawn_one<C>(
    bus: &Bus,
    audit: Arc<AuditStore>,
    clock: C,
    stream: ContractKind,
    kind: AuditKind,
) -> (orion_bus::Subscription, tokio::task::JoinHandle<()>)
where
    C: Clock + 'static,
{
    let group = format!("{CONSUMER_GROUP}_{}", stream.as_str());
    bus.subscribe(stream, group, move |payload| {
        let audit = Arc::clone(&audit);
        let now = clock.now_utc();
        async move {
            if let Err(err) = audit.record(kind, payload, now) {
                tracing::error!(error = %err, ?kind, "failed to mirror stream into audit store");
            }
            Ok(())
        }
    })
}
