// crates/orion-core/src/contracts/approval_request.rs
// ============================================================================
// Module: Approval Request Contract
// Description: Human-authorization request published alongside an N3 RISKY
//              decision.
// Purpose: Canonical wire shape for the `approval_request` stream.
// Dependencies: serde, serde_json, time
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::contracts::CONTRACT_VERSION;
use crate::identifiers::ApprovalRequestId;
use crate::identifiers::DecisionId;
use crate::identifiers::IncidentId;

/// Human-authorization request for a RISKY (or coerced-RISKY) action.
///
/// # Invariants
/// - `risk_level` is always `"RISKY"` — only RISKY/UNKNOWN decisions produce
///   an approval request.
/// - Consumed exactly once by the Approval Coordinator; discarded on expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApprovalRequest {
    /// Contract schema version, always [`CONTRACT_VERSION`].
    pub version: String,
    /// Identifier for this approval request; one-time-use lookup key.
    pub approval_request_id: ApprovalRequestId,
    /// Wall-clock publication time, RFC3339 UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Always `"brain"`.
    pub source: String,
    /// The decision this request accompanies.
    pub decision_id: DecisionId,
    /// The action type awaiting approval.
    pub action_type: String,
    /// Always `"RISKY"`.
    pub risk_level: String,
    /// The action-type-specific parameters awaiting approval.
    pub requested_action: Value,
    /// Wall-clock expiry; after this time, the request is inert.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// The incident that triggered this request.
    pub incident_id: IncidentId,
}

impl ApprovalRequest {
    /// Builds a new approval request.
    #[must_use]
    pub fn new(
        decision_id: DecisionId,
        action_type: impl Into<String>,
        requested_action: Value,
        expires_at: OffsetDateTime,
        incident_id: IncidentId,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            version: CONTRACT_VERSION.to_string(),
            approval_request_id: ApprovalRequestId::new(),
            timestamp: now,
            source: "brain".to_string(),
            decision_id,
            action_type: action_type.into(),
            risk_level: "RISKY".to_string(),
            requested_action,
            expires_at,
            incident_id,
        }
    }

    /// Returns `true` if this request has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}
