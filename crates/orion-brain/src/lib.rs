// crates/orion-brain/src/lib.rs
// ============================================================================
// Crate: orion-brain
// Description: Turns incidents into decisions, gated by autonomy level.
// Purpose: Wire the Cooldown Tracker, Circuit Breaker, and Brain's decision
//          algorithm (spec.md §4.4-§4.6) to the bus.
// Dependencies: orion-bus, orion-core, orion-council, orion-policy, tokio,
//               tracing
// ============================================================================

//! ## Overview
//! Brain subscribes to `incident`, runs [`brain::Brain::decide`], and
//! publishes the resulting [`orion_core::contracts::Decision`] plus — for
//! N3 RISKY decisions — a sibling [`orion_core::contracts::ApprovalRequest`]
//! whose `expires_at` is minted from the injected wall clock at publish
//! time, not inside the pure decision algorithm.

pub mod brain;
pub mod breaker;
pub mod cooldown;

use std::sync::Arc;

use orion_bus::Bus;
use orion_bus::BusError;
use orion_core::ContractKind;
use orion_core::clock::Clock;
use orion_core::contracts::ApprovalRequest;
use orion_core::contracts::Incident;
use orion_council::LocalModel;
use orion_council::ResourceMonitor;
use tokio::sync::Mutex;

use crate::brain::Brain;

/// Consumer group name Brain subscribes under.
pub const CONSUMER_GROUP: &str = "brain";

/// Starts Brain's subscribe loop against `bus`, returning a handle to the
/// shared, mutex-guarded `Brain` (so a caller can feed circuit-breaker
/// results back in from outside the subscribe loop — see
/// [`crate::brain::Brain::record_failure`]/
/// [`crate::brain::Brain::record_success`]) plus the subscription handle so
/// callers can cancel it.
#[must_use]
pub fn spawn<M, R, C>(
    bus: &Bus,
    brain: Brain<M, R>,
    clock: C,
) -> (Arc<Mutex<Brain<M, R>>>, orion_bus::Subscription, tokio::task::JoinHandle<()>)
where
    M: LocalModel + 'static,
    R: ResourceMonitor + 'static,
    C: Clock + 'static,
{
    let brain = Arc::new(Mutex::new(brain));
    let brain_handle = Arc::clone(&brain);
    let clock = Arc::new(clock);
    let bus_for_publish = bus.clone();
    let (subscription, handle) = bus.subscribe(ContractKind::Incident, CONSUMER_GROUP, move |payload| {
        let brain = Arc::clone(&brain);
        let clock = Arc::clone(&clock);
        let bus = bus_for_publish.clone();
        async move {
            let incident: Incident = serde_json::from_value(payload)
                .map_err(|err| BusError::ReadFailed { kind: ContractKind::Incident, reason: err.to_string() })?;

            let (decision, approval_timeout, now_wall) = {
                let mut brain = brain.lock().await;
                let now_wall = clock.now_utc();
                let now_mono = clock.monotonic();
                let output = brain.decide(&incident, now_wall, now_mono).await;
                (output, brain.approval_timeout(), now_wall)
            };

            bus.publish(&decision.decision).await?;

            if let Some(draft) = decision.approval_request {
                let timeout = time::Duration::seconds(i64::try_from(approval_timeout.as_secs()).unwrap_or(i64::MAX));
                let expires_at = now_wall + timeout;
                let request = ApprovalRequest::new(
                    decision.decision.decision_id,
                    draft.action_type,
                    draft.requested_action,
                    expires_at,
                    incident.incident_id,
                    now_wall,
                );
                bus.publish(&request).await?;
            }

            Ok(())
        }
    });
    (brain_handle, subscription, handle)
}
