// crates/orion-commander/src/lib.rs
// ============================================================================
// Crate: orion-commander
// Description: Executes SAFE and approved-RISKY actions; emits outcomes.
// Purpose: Wire the Executor (spec.md §4.9) to the bus: ingest `decision`
//          and `approval_decision`, publish `action`/`outcome`, and feed
//          execution results back into Brain's circuit breaker.
// Dependencies: orion-bus, orion-core, orion-policy, tokio, tracing
// ============================================================================

//! ## Overview
//! Commander subscribes to two streams against the same
//! [`executor::Executor`] instance, behind one mutex: `decision` (to
//! execute) and `approval_decision` (to stock the pending-approval map
//! `REQUEST_APPROVAL` decisions consume). Circuit-breaker feedback is a
//! plain callback rather than a dependency on `orion-brain` — Commander has
//! no reason to know Brain's types, only that *something* wants to hear
//! about execution success/failure per action type.

pub mod executor;

use std::sync::Arc;

use orion_bus::Bus;
use orion_bus::BusError;
use orion_core::ContractKind;
use orion_core::clock::Clock;
use orion_core::contracts::ApprovalDecision;
use orion_core::contracts::Decision;
use tokio::sync::Mutex;

use crate::executor::Executor;

/// Consumer group name Commander subscribes under on both streams.
pub const CONSUMER_GROUP: &str = "commander";

/// Called after each execution with `(action_type, succeeded)`, so the
/// caller can route the result into a circuit breaker it owns.
pub type BreakerFeedback = Arc<dyn Fn(&str, bool) + Send + Sync>;

/// Starts Commander's two subscribe loops against `bus`, returning both
/// subscription handles so callers can cancel them independently.
#[must_use]
pub fn spawn<C>(
    bus: &Bus,
    executor: Executor,
    clock: C,
    feedback: Option<BreakerFeedback>,
) -> (orion_bus::Subscription, tokio::task::JoinHandle<()>, orion_bus::Subscription, tokio::task::JoinHandle<()>)
where
    C: Clock + 'static,
{
    let executor = Arc::new(Mutex::new(executor));
    let clock = Arc::new(clock);

    let decision_executor = Arc::clone(&executor);
    let decision_clock = Arc::clone(&clock);
    let decision_bus = bus.clone();
    let decision_feedback = feedback.clone();
    let (decision_sub, decision_handle) = bus.subscribe(ContractKind::Decision, CONSUMER_GROUP, move |payload| {
        let executor = Arc::clone(&decision_executor);
        let clock = Arc::clone(&decision_clock);
        let bus = decision_bus.clone();
        let feedback = decision_feedback.clone();
        async move {
            let decision: Decision = serde_json::from_value(payload)
                .map_err(|err| BusError::ReadFailed { kind: ContractKind::Decision, reason: err.to_string() })?;

            let now_wall = clock.now_utc();
            let now_mono = clock.monotonic();
            let report = {
                let mut executor = executor.lock().await;
                executor.on_decision(&decision, now_wall, now_mono)
            };
            let Some(report) = report else {
                return Ok(());
            };

            bus.publish(&report.action).await?;
            bus.publish(&report.outcome).await?;

            if let Some(feedback) = &feedback {
                feedback(&report.action_type, report.succeeded);
            }

            Ok(())
        }
    });

    let approval_executor = Arc::clone(&executor);
    let approval_clock = Arc::clone(&clock);
    let (approval_sub, approval_handle) =
        bus.subscribe(ContractKind::ApprovalDecision, CONSUMER_GROUP, move |payload| {
            let executor = Arc::clone(&approval_executor);
            let clock = Arc::clone(&approval_clock);
            async move {
                let decision: ApprovalDecision = serde_json::from_value(payload).map_err(|err| BusError::ReadFailed {
                    kind: ContractKind::ApprovalDecision,
                    reason: err.to_string(),
                })?;
                let now = clock.now_utc();
                executor.lock().await.on_approval_decision(decision, now);
                Ok(())
            }
        });

    (decision_sub, decision_handle, approval_sub, approval_handle)
}
