// crates/orion-core/src/contracts/approval_decision.rs
// ============================================================================
// Module: Approval Decision Contract
// Description: Settled human-authorization decision published by the
//              Approval Coordinator.
// Purpose: Canonical wire shape for the `approval_decision` stream.
// Dependencies: serde, time
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::contracts::CONTRACT_VERSION;
use crate::identifiers::ActionId;
use crate::identifiers::ApprovalId;
use crate::identifiers::ApprovalRequestId;
use crate::identifiers::DecisionId;

/// The admin's verdict on an [`crate::contracts::ApprovalRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOutcome {
    /// Admin approved the action as requested.
    Approve,
    /// Admin denied the action.
    Deny,
    /// Admin approved the action and waived cooldown/circuit-breaker gates.
    Force,
}

/// Settled human-authorization decision.
///
/// # Invariants
/// - One-time use: the Approval Coordinator removes the source request from
///   `pending` before publishing this.
/// - `action_id` and the `override_*` flags are present only for
///   `Approve`/`Force`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApprovalDecision {
    /// Contract schema version, always [`CONTRACT_VERSION`].
    pub version: String,
    /// Fresh identifier minted for this settled decision.
    pub approval_id: ApprovalId,
    /// Wall-clock publication time, RFC3339 UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Always `"approval_coordinator"`.
    pub source: String,
    /// The request this decision settles.
    pub approval_request_id: ApprovalRequestId,
    /// The decision that originated the request, passed through unchanged
    /// so the Commander can correlate by the key it has on hand (see
    /// `DESIGN.md` Open Question (a)).
    pub decision_id: DecisionId,
    /// The admin's verdict.
    pub decision: ApprovalOutcome,
    /// Verified identity of the admin who issued this decision.
    pub admin_identity: String,
    /// Non-empty justification (>= 10 characters for `Force`).
    pub reason: String,
    /// When the admin issued this decision.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    /// When this settled decision itself becomes inert.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// Allocated only for `Approve`/`Force`.
    pub action_id: Option<ActionId>,
    /// Waive the circuit breaker; only set for `Force`.
    pub override_circuit_breaker: Option<bool>,
    /// Waive the cooldown tracker; only set for `Force`.
    pub override_cooldown: Option<bool>,
}

impl ApprovalDecision {
    /// Returns `true` if this settled decision has itself expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}
