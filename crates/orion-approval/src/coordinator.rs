// crates/orion-approval/src/coordinator.rs
// ============================================================================
// Module: Approval Coordinator
// Description: Tracks approval lifecycle and verifies admin identity.
// Purpose: Implement spec.md §4.8's five admin-facing operations plus the
//          periodic timeout sweep.
// Dependencies: orion-audit, orion-core, time, tracing
// ============================================================================

//! ## Overview
//! The coordinator owns two maps keyed by `approval_request_id`: pending
//! requests and settled decisions (spec.md §3's entity-ownership note).
//! Expiry is enforced at two checkpoints — on ingest and on each admin
//! operation — so silence is never permission: an expired request can
//! never produce an `approval_decision`, only an ESCALATION log entry.

use std::collections::HashMap;
use std::time::Duration;

use orion_audit::AuditStore;
use orion_core::contracts::ApprovalDecision;
use orion_core::contracts::ApprovalOutcome;
use orion_core::contracts::ApprovalRequest;
use orion_core::identifiers::ActionId;
use orion_core::identifiers::ApprovalId;
use orion_core::identifiers::ApprovalRequestId;
use time::OffsetDateTime;

use crate::admin_identity::AdminIdentity;
use crate::admin_identity::Channel;

/// Default lifetime of a settled [`ApprovalDecision`] (spec.md leaves this
/// as an implementation constant; the original source uses five minutes).
pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(300);

/// Minimum `reason` length required for a `force` decision.
pub const MIN_FORCE_REASON_LEN: usize = 10;

/// Why an admin operation was rejected. Every variant corresponds to a
/// "reject, log, return nothing" path in spec.md §4.8 — none of them
/// publish a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    /// The channel-specific identity did not match the configured admin.
    IdentityMismatch,
    /// No pending request exists for this id.
    RequestNotFound,
    /// The request has already expired (escalated and purged as a result).
    Expired,
    /// `reason` was empty after trimming.
    ReasonRequired,
    /// `force`'s reason was shorter than [`MIN_FORCE_REASON_LEN`].
    ReasonTooShort,
}

/// Tracks approval-request lifecycle and verifies admin identity.
pub struct ApprovalCoordinator {
    admin: AdminIdentity,
    pending: HashMap<ApprovalRequestId, ApprovalRequest>,
    settled: HashMap<ApprovalRequestId, ApprovalDecision>,
    decision_timeout: Duration,
    audit: Option<std::sync::Arc<AuditStore>>,
}

impl ApprovalCoordinator {
    /// Builds a coordinator with no audit store attached.
    #[must_use]
    pub fn new(admin: AdminIdentity) -> Self {
        Self {
            admin,
            pending: HashMap::new(),
            settled: HashMap::new(),
            decision_timeout: DEFAULT_DECISION_TIMEOUT,
            audit: None,
        }
    }

    /// Attaches an audit store for ESCALATION logging.
    #[must_use]
    pub fn with_audit(mut self, audit: std::sync::Arc<AuditStore>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Overrides the default settled-decision lifetime.
    #[must_use]
    pub const fn with_decision_timeout(mut self, decision_timeout: Duration) -> Self {
        self.decision_timeout = decision_timeout;
        self
    }

    /// Ingests a freshly published approval request. If already expired on
    /// arrival, escalates and drops it instead of storing it.
    pub fn ingest(&mut self, request: ApprovalRequest, now: OffsetDateTime) {
        if request.is_expired(now) {
            self.escalate(&request, now);
            return;
        }
        self.pending.insert(request.approval_request_id, request);
    }

    /// Admin approves a pending request.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError`] per spec.md §4.8's validation ladder;
    /// no decision is published on any error path.
    pub fn approve(
        &mut self,
        approval_request_id: ApprovalRequestId,
        channel: Channel,
        admin_identity: &str,
        reason: &str,
        now: OffsetDateTime,
    ) -> Result<ApprovalDecision, ApprovalError> {
        self.settle(approval_request_id, channel, admin_identity, reason, now, ApprovalOutcome::Approve, false, false)
    }

    /// Admin denies a pending request. Denials never allocate an
    /// `action_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError`] per spec.md §4.8's validation ladder.
    pub fn deny(
        &mut self,
        approval_request_id: ApprovalRequestId,
        channel: Channel,
        admin_identity: &str,
        reason: &str,
        now: OffsetDateTime,
    ) -> Result<ApprovalDecision, ApprovalError> {
        self.settle(approval_request_id, channel, admin_identity, reason, now, ApprovalOutcome::Deny, false, false)
    }

    /// Admin forces a pending request, bypassing cooldown and/or the
    /// circuit breaker. Requires a reason of at least
    /// [`MIN_FORCE_REASON_LEN`] characters.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError`] per spec.md §4.8's validation ladder,
    /// including [`ApprovalError::ReasonTooShort`].
    pub fn force(
        &mut self,
        approval_request_id: ApprovalRequestId,
        channel: Channel,
        admin_identity: &str,
        reason: &str,
        override_circuit_breaker: bool,
        override_cooldown: bool,
        now: OffsetDateTime,
    ) -> Result<ApprovalDecision, ApprovalError> {
        if reason.trim().len() < MIN_FORCE_REASON_LEN {
            return Err(ApprovalError::ReasonTooShort);
        }
        let decision = self.settle(
            approval_request_id,
            channel,
            admin_identity,
            reason,
            now,
            ApprovalOutcome::Force,
            override_circuit_breaker,
            override_cooldown,
        )?;
        tracing::warn!(
            approval_id = %decision.approval_id,
            override_circuit_breaker,
            override_cooldown,
            "force approval issued, bypassing safety gates"
        );
        Ok(decision)
    }

    #[allow(clippy::too_many_arguments)]
    fn settle(
        &mut self,
        approval_request_id: ApprovalRequestId,
        channel: Channel,
        admin_identity: &str,
        reason: &str,
        now: OffsetDateTime,
        outcome: ApprovalOutcome,
        override_circuit_breaker: bool,
        override_cooldown: bool,
    ) -> Result<ApprovalDecision, ApprovalError> {
        if !self.admin.verify(channel, admin_identity) {
            tracing::error!(?channel, "admin identity mismatch; rejecting");
            return Err(ApprovalError::IdentityMismatch);
        }

        let Some(request) = self.pending.get(&approval_request_id) else {
            return Err(ApprovalError::RequestNotFound);
        };

        if now >= request.expires_at {
            let request = self.pending.remove(&approval_request_id).expect("just looked up");
            self.escalate(&request, now);
            return Err(ApprovalError::Expired);
        }

        if reason.trim().is_empty() {
            return Err(ApprovalError::ReasonRequired);
        }

        let request = self.pending.remove(&approval_request_id).expect("just looked up");
        let (override_circuit_breaker, override_cooldown) = if outcome == ApprovalOutcome::Force {
            (Some(override_circuit_breaker), Some(override_cooldown))
        } else {
            (None, None)
        };
        let action_id = matches!(outcome, ApprovalOutcome::Approve | ApprovalOutcome::Force).then(ActionId::new);

        let decision = ApprovalDecision {
            version: orion_core::CONTRACT_VERSION.to_string(),
            approval_id: ApprovalId::new(),
            timestamp: now,
            source: "approval_coordinator".to_string(),
            approval_request_id: request.approval_request_id,
            decision_id: request.decision_id,
            decision: outcome,
            admin_identity: admin_identity.to_string(),
            reason: reason.trim().to_string(),
            issued_at: now,
            expires_at: now + to_time_duration(self.decision_timeout),
            action_id,
            override_circuit_breaker,
            override_cooldown,
        };

        self.settled.insert(approval_request_id, decision.clone());
        Ok(decision)
    }

    /// Scans pending requests for expiry, escalating and removing each
    /// expired one. Intended to be called periodically.
    pub fn sweep(&mut self, now: OffsetDateTime) {
        let expired: Vec<ApprovalRequestId> = self
            .pending
            .iter()
            .filter(|(_, request)| request.is_expired(now))
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            if let Some(request) = self.pending.remove(&id) {
                self.escalate(&request, now);
            }
        }
    }

    /// Returns the number of requests currently pending (for tests and
    /// inspection).
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn escalate(&self, request: &ApprovalRequest, now: OffsetDateTime) {
        let reason = format!(
            "approval request {} for action {} expired before admin decision",
            request.approval_request_id, request.action_type
        );
        tracing::warn!(approval_request_id = %request.approval_request_id, "ESCALATION: {reason}");
        if let Some(audit) = &self.audit
            && let Err(err) = audit.escalate(reason, now)
        {
            tracing::error!(error = %err, "failed to write escalation audit record");
        }
    }
}

fn to_time_duration(duration: Duration) -> time::Duration {
    time::Duration::seconds(i64::try_from(duration.as_secs()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use orion_core::identifiers::DecisionId;
    use orion_core::identifiers::IncidentId;

    use super::*;

    fn admin() -> AdminIdentity {
        AdminIdentity::new(Some("12345".to_string()), Some("alice".to_string())).expect("valid")
    }

    fn sample_request(expires_at: OffsetDateTime, now: OffsetDateTime) -> ApprovalRequest {
        ApprovalRequest::new(
            DecisionId::new(),
            "restart_service",
            serde_json::json!({}),
            expires_at,
            IncidentId::new(),
            now,
        )
    }

    #[test]
    fn identity_mismatch_is_rejected_without_consuming_the_request() {
        let mut coordinator = ApprovalCoordinator::new(admin());
        let now = OffsetDateTime::now_utc();
        let request = sample_request(now + time::Duration::minutes(5), now);
        let id = request.approval_request_id;
        coordinator.ingest(request, now);

        let err = coordinator.approve(id, Channel::Cli, "mallory", "looks fine", now).unwrap_err();
        assert_eq!(err, ApprovalError::IdentityMismatch);
        assert_eq!(coordinator.pending_count(), 1);
    }

    #[test]
    fn approve_removes_from_pending_and_allocates_action_id() {
        let mut coordinator = ApprovalCoordinator::new(admin());
        let now = OffsetDateTime::now_utc();
        let request = sample_request(now + time::Duration::minutes(5), now);
        let id = request.approval_request_id;
        coordinator.ingest(request, now);

        let decision = coordinator.approve(id, Channel::Cli, "alice", "looks fine", now).expect("approve");
        assert_eq!(decision.decision, ApprovalOutcome::Approve);
        assert!(decision.action_id.is_some());
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn deny_allocates_no_action_id() {
        let mut coordinator = ApprovalCoordinator::new(admin());
        let now = OffsetDateTime::now_utc();
        let request = sample_request(now + time::Duration::minutes(5), now);
        let id = request.approval_request_id;
        coordinator.ingest(request, now);

        let decision = coordinator.deny(id, Channel::Cli, "alice", "too risky", now).expect("deny");
        assert_eq!(decision.decision, ApprovalOutcome::Deny);
        assert!(decision.action_id.is_none());
    }

    #[test]
    fn expired_request_never_produces_a_decision() {
        let mut coordinator = ApprovalCoordinator::new(admin());
        let now = OffsetDateTime::now_utc();
        let request = sample_request(now + time::Duration::seconds(1), now);
        let id = request.approval_request_id;
        coordinator.ingest(request, now);

        let later = now + time::Duration::seconds(2);
        let err = coordinator.approve(id, Channel::Cli, "alice", "looks fine", later).unwrap_err();
        assert_eq!(err, ApprovalError::Expired);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn force_requires_ten_character_reason() {
        let mut coordinator = ApprovalCoordinator::new(admin());
        let now = OffsetDateTime::now_utc();
        let request = sample_request(now + time::Duration::minutes(5), now);
        let id = request.approval_request_id;
        coordinator.ingest(request, now);

        let err = coordinator.force(id, Channel::Cli, "alice", "short", false, false, now).unwrap_err();
        assert_eq!(err, ApprovalError::ReasonTooShort);
        assert_eq!(coordinator.pending_count(), 1);
    }

    #[test]
    fn sweep_escalates_and_purges_expired_requests() {
        let mut coordinator = ApprovalCoordinator::new(admin());
        let now = OffsetDateTime::now_utc();
        let request = sample_request(now + time::Duration::seconds(1), now);
        coordinator.ingest(request, now);
        assert_eq!(coordinator.pending_count(), 1);

        coordinator.sweep(now + time::Duration::seconds(2));
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn already_expired_request_is_escalated_on_ingest() {
        let mut coordinator = ApprovalCoordinator::new(admin());
        let now = OffsetDateTime::now_utc();
        let request = sample_request(now - time::Duration::seconds(1), now);
        coordinator.ingest(request, now);
        assert_eq!(coordinator.pending_count(), 0);
    }
}
