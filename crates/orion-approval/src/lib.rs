// crates/orion-approval/src/lib.rs
// ============================================================================
// Crate: orion-approval
// Description: Tracks pending approval requests and settles admin decisions.
// Purpose: Wire the Approval Coordinator (spec.md §4.8) to the bus: ingest
//          `approval_request` messages, expose admin-facing operations that
//          publish `approval_decision`, and sweep expired requests.
// Dependencies: orion-audit, orion-bus, orion-core, tokio, tracing
// ============================================================================

//! ## Overview
//! [`ApprovalService`] owns an [`coordinator::ApprovalCoordinator`] behind a
//! mutex shared between the bus subscribe loop (which only ingests new
//! requests) and whatever external channel (CLI, a future Telegram bot)
//! calls [`ApprovalService::approve`]/[`ApprovalService::deny`]/
//! [`ApprovalService::force`]. A background sweep task escalates requests
//! that expire before any admin acts on them.

pub mod admin_identity;
pub mod coordinator;

use std::sync::Arc;
use std::time::Duration;

use orion_bus::Bus;
use orion_bus::BusError;
use orion_core::ContractKind;
use orion_core::clock::Clock;
use orion_core::contracts::ApprovalDecision;
use orion_core::contracts::ApprovalRequest;
use orion_core::identifiers::ApprovalRequestId;
use tokio::sync::Mutex;

pub use crate::admin_identity::AdminIdentity;
pub use crate::admin_identity::AdminIdentityError;
pub use crate::admin_identity::Channel;
pub use crate::coordinator::ApprovalCoordinator;
pub use crate::coordinator::ApprovalError;

/// Consumer group name the Approval Coordinator subscribes under.
pub const CONSUMER_GROUP: &str = "approval_coordinator";

/// Interval between expiry sweeps of the pending-approval map.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15);

/// Handle to a running Approval Coordinator: the shared coordinator state
/// plus the bus handle used to publish settled decisions.
#[derive(Clone)]
pub struct ApprovalService {
    coordinator: Arc<Mutex<ApprovalCoordinator>>,
    bus: Bus,
}

impl ApprovalService {
    /// Admin approves a pending request, publishing the resulting
    /// [`ApprovalDecision`] on success.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError`] if verification, lookup, or expiry checks
    /// fail, or [`BusError`] wrapped as [`ApprovalServiceError`] if
    /// publishing fails.
    pub async fn approve(
        &self,
        approval_request_id: ApprovalRequestId,
        channel: Channel,
        admin_identity: &str,
        reason: &str,
        now: time::OffsetDateTime,
    ) -> Result<ApprovalDecision, ApprovalServiceError> {
        let decision = {
            let mut coordinator = self.coordinator.lock().await;
            coordinator.approve(approval_request_id, channel, admin_identity, reason, now)?
        };
        self.bus.publish(&decision).await.map_err(ApprovalServiceError::Bus)?;
        Ok(decision)
    }

    /// Admin denies a pending request, publishing the resulting
    /// [`ApprovalDecision`] on success.
    ///
    /// # Errors
    ///
    /// See [`ApprovalService::approve`].
    pub async fn deny(
        &self,
        approval_request_id: ApprovalRequestId,
        channel: Channel,
        admin_identity: &str,
        reason: &str,
        now: time::OffsetDateTime,
    ) -> Result<ApprovalDecision, ApprovalServiceError> {
        let decision = {
            let mut coordinator = self.coordinator.lock().await;
            coordinator.deny(approval_request_id, channel, admin_identity, reason, now)?
        };
        self.bus.publish(&decision).await.map_err(ApprovalServiceError::Bus)?;
        Ok(decision)
    }

    /// Admin forces a pending request, bypassing cooldown and/or circuit
    /// breaker, publishing the resulting [`ApprovalDecision`] on success.
    ///
    /// # Errors
    ///
    /// See [`ApprovalService::approve`].
    #[allow(clippy::too_many_arguments)]
    pub async fn force(
        &self,
        approval_request_id: ApprovalRequestId,
        channel: Channel,
        admin_identity: &str,
        reason: &str,
        override_circuit_breaker: bool,
        override_cooldown: bool,
        now: time::OffsetDateTime,
    ) -> Result<ApprovalDecision, ApprovalServiceError> {
        let decision = {
            let mut coordinator = self.coordinator.lock().await;
            coordinator.force(
                approval_request_id,
                channel,
                admin_identity,
                reason,
                override_circuit_breaker,
                override_cooldown,
                now,
            )?
        };
        self.bus.publish(&decision).await.map_err(ApprovalServiceError::Bus)?;
        Ok(decision)
    }

    /// Number of requests currently pending an admin decision.
    pub async fn pending_count(&self) -> usize {
        self.coordinator.lock().await.pending_count()
    }
}

/// Errors surfaced by [`ApprovalService`]'s admin-facing operations.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalServiceError {
    /// The coordinator rejected the operation (identity, lookup, expiry,
    /// or reason validation).
    #[error(transparent)]
    Approval(#[from] ApprovalError),
    /// Publishing the settled decision to the bus failed.
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Starts the Approval Coordinator's subscribe loop and its periodic expiry
/// sweep, returning an [`ApprovalService`] handle plus both task handles so
/// callers can cancel them.
#[must_use]
pub fn spawn<C>(
    bus: &Bus,
    coordinator: ApprovalCoordinator,
    clock: C,
) -> (ApprovalService, orion_bus::Subscription, tokio::task::JoinHandle<()>, tokio::task::JoinHandle<()>)
where
    C: Clock + 'static,
{
    let coordinator = Arc::new(Mutex::new(coordinator));
    let clock = Arc::new(clock);
    let service = ApprovalService { coordinator: Arc::clone(&coordinator), bus: bus.clone() };

    let ingest_coordinator = Arc::clone(&coordinator);
    let ingest_clock = Arc::clone(&clock);
    let (subscription, subscribe_handle) = bus.subscribe(ContractKind::ApprovalRequest, CONSUMER_GROUP, move |payload| {
        let coordinator = Arc::clone(&ingest_coordinator);
        let clock = Arc::clone(&ingest_clock);
        async move {
            let request: ApprovalRequest = serde_json::from_value(payload)
                .map_err(|err| BusError::ReadFailed { kind: ContractKind::ApprovalRequest, reason: err.to_string() })?;
            let now = clock.now_utc();
            coordinator.lock().await.ingest(request, now);
            Ok(())
        }
    });

    let sweep_coordinator = Arc::clone(&coordinator);
    let sweep_clock = Arc::clone(&clock);
    let sweep_handle = tokio::spawn(async move {
        loop {
            tokio::time::sleep(DEFAULT_SWEEP_INTERVAL).await;
            let now = sweep_clock.now_utc();
            sweep_coordinator.lock().await.sweep(now);
        }
    });

    (service, subscription, subscribe_handle, sweep_handle)
}
