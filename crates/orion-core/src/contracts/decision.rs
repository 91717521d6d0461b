// crates/orion-core/src/contracts/decision.rs
// ============================================================================
// Module: Decision Contract
// Description: Reasoning outcome published by Brain.
// Purpose: Canonical wire shape for the `decision` stream.
// Dependencies: serde, serde_json, time
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::contracts::CONTRACT_VERSION;
use crate::identifiers::DecisionId;
use crate::identifiers::IncidentId;

/// Minimum length, in bytes, a `reasoning` string must have.
pub const MIN_REASONING_LEN: usize = 10;

/// The autonomy dial Brain is fixed to at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutonomyLevel {
    /// Observe only; every decision is `NO_ACTION`.
    #[serde(rename = "N0")]
    N0,
    /// SAFE actions execute automatically; RISKY/UNKNOWN are suppressed.
    #[serde(rename = "N2")]
    N2,
    /// SAFE actions execute automatically; RISKY/UNKNOWN require admin approval.
    #[serde(rename = "N3")]
    N3,
}

/// Discriminant for what Brain decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionType {
    /// No action is taken.
    NoAction,
    /// A SAFE action executes without approval.
    ExecuteSafeAction,
    /// A RISKY (or coerced-RISKY) action awaits human approval.
    RequestApproval,
}

/// Safety classification assigned to the (possible) action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyClassification {
    /// Declared in the SAFE policy listing.
    Safe,
    /// Declared in the RISKY policy listing, or coerced from `Unknown`.
    Risky,
    /// In neither listing; callers must treat this as `Risky` (fail-closed).
    Unknown,
}

/// The action Brain proposes to take, carried only on non-`NO_ACTION` decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposedAction {
    /// Action type, classified against the policy store.
    pub action_type: String,
    /// Action-type-specific parameters.
    pub parameters: Value,
}

/// Reasoning outcome produced by Brain for a single incident.
///
/// # Invariants
/// - `decision_type == NoAction` implies `proposed_action.is_none()`.
/// - `requires_approval == (decision_type == RequestApproval)`.
/// - `reasoning.len() >= `[`MIN_REASONING_LEN`].
/// - In `N0`, `decision_type` is always `NoAction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Decision {
    /// Contract schema version, always [`CONTRACT_VERSION`].
    pub version: String,
    /// Identifier for this decision.
    pub decision_id: DecisionId,
    /// Wall-clock publication time, RFC3339 UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Always `"brain"`.
    pub source: String,
    /// Incident this decision reasons about.
    pub incident_id: IncidentId,
    /// What Brain decided to do.
    pub decision_type: DecisionType,
    /// Safety classification of the (possible) action.
    pub safety_classification: SafetyClassification,
    /// `true` iff `decision_type == RequestApproval`.
    pub requires_approval: bool,
    /// Human-readable justification, at least [`MIN_REASONING_LEN`] bytes.
    pub reasoning: String,
    /// The autonomy level Brain was configured with.
    pub autonomy_level: AutonomyLevel,
    /// The proposed action, present iff `decision_type != NoAction`.
    pub proposed_action: Option<ProposedAction>,
}

/// Error building a [`Decision`] that violates its own invariants.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// `reasoning` was shorter than [`MIN_REASONING_LEN`].
    #[error("reasoning must be at least {MIN_REASONING_LEN} characters")]
    ReasoningTooShort,
    /// `NoAction` carried a `proposed_action`.
    #[error("NO_ACTION decisions must not carry a proposed_action")]
    NoActionWithProposedAction,
    /// A non-`NoAction` decision was missing a `proposed_action`.
    #[error("{0:?} decisions must carry a proposed_action")]
    MissingProposedAction(DecisionType),
}

impl Decision {
    /// Builds a new decision, enforcing the `NoAction`/`proposed_action` and
    /// `requires_approval` invariants structurally.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError`] if `reasoning` is too short, if `NoAction`
    /// carries a `proposed_action`, or if a non-`NoAction` decision is
    /// missing one.
    pub fn new(
        incident_id: IncidentId,
        decision_type: DecisionType,
        safety_classification: SafetyClassification,
        reasoning: impl Into<String>,
        autonomy_level: AutonomyLevel,
        proposed_action: Option<ProposedAction>,
        now: OffsetDateTime,
    ) -> Result<Self, DecisionError> {
        let reasoning = reasoning.into();
        if reasoning.len() < MIN_REASONING_LEN {
            return Err(DecisionError::ReasoningTooShort);
        }
        match (decision_type, &proposed_action) {
            (DecisionType::NoAction, Some(_)) => {
                return Err(DecisionError::NoActionWithProposedAction);
            }
            (DecisionType::NoAction, None) => {}
            (_, None) => {
                return Err(DecisionError::MissingProposedAction(decision_type));
            }
            (_, Some(_)) => {}
        }
        Ok(Self {
            version: CONTRACT_VERSION.to_string(),
            decision_id: DecisionId::new(),
            timestamp: now,
            source: "brain".to_string(),
            incident_id,
            decision_type,
            safety_classification,
            requires_approval: matches!(decision_type, DecisionType::RequestApproval),
            reasoning,
            autonomy_level,
            proposed_action,
        })
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    #[test]
    fn no_action_rejects_proposed_action() {
        let err = Decision::new(
            IncidentId::new(),
            DecisionType::NoAction,
            SafetyClassification::Safe,
            "observe only, N0",
            AutonomyLevel::N0,
            Some(ProposedAction {
                action_type: "acknowledge_incident".to_string(),
                parameters: Value::Null,
            }),
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
        assert!(matches!(err, DecisionError::NoActionWithProposedAction));
    }

    #[test]
    fn execute_safe_action_requires_proposed_action() {
        let err = Decision::new(
            IncidentId::new(),
            DecisionType::ExecuteSafeAction,
            SafetyClassification::Safe,
            "within policy, executing",
            AutonomyLevel::N2,
            None,
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
        assert!(matches!(err, DecisionError::MissingProposedAction(_)));
    }

    #[test]
    fn requires_approval_flag_follows_decision_type() {
        let decision = Decision::new(
            IncidentId::new(),
            DecisionType::RequestApproval,
            SafetyClassification::Risky,
            "risky action needs human sign-off",
            AutonomyLevel::N3,
            Some(ProposedAction {
                action_type: "restart_service".to_string(),
                parameters: Value::Null,
            }),
            OffsetDateTime::now_utc(),
        )
        .expect("valid decision");
        assert!(decision.requires_approval);
    }
}
