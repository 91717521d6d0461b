// crates/orion-guardian/src/lib.rs
// ============================================================================
// Module: Orion Guardian
// Description: Subscriber that turns raw events into correlated incidents.
// Purpose: Wire the pure `Correlator` (spec.md §4.2) to the bus.
// Dependencies: orion-bus, orion-core, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! Guardian is the first pipeline stage: it subscribes to `event`, runs each
//! through [`correlator::Correlator`], and publishes any resulting
//! [`orion_core::contracts::Incident`]. The wiring here is intentionally
//! thin — every interesting invariant lives in the correlator, which has no
//! dependency on the bus and is tested without one.

pub mod correlator;

use std::sync::Arc;
use std::sync::Mutex;

use orion_bus::Bus;
use orion_bus::BusError;
use orion_core::ContractKind;
use orion_core::contracts::Event;

use crate::correlator::Correlator;

/// Consumer group name Guardian subscribes under.
pub const CONSUMER_GROUP: &str = "guardian";

/// Starts Guardian's subscribe loop against `bus`, returning the
/// subscription handle so callers can cancel it.
#[must_use]
pub fn spawn(bus: &Bus, correlator: Correlator) -> (orion_bus::Subscription, tokio::task::JoinHandle<()>) {
    let correlator = Arc::new(Mutex::new(correlator));
    let bus_for_publish = bus.clone();
    bus.subscribe(ContractKind::Event, CONSUMER_GROUP, move |payload| {
        let correlator = Arc::clone(&correlator);
        let bus = bus_for_publish.clone();
        async move {
            let event: Event = serde_json::from_value(payload)
                .map_err(|err| BusError::ReadFailed { kind: ContractKind::Event, reason: err.to_string() })?;
            let incident = {
                let mut correlator = correlator.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                correlator.ingest(event)
            };
            if let Some(incident) = incident {
                bus.publish(&incident).await?;
            }
            Ok(())
        }
    })
}
