// crates/orion-core/src/contracts/action.rs
// ============================================================================
// Module: Action Contract
// Description: Execution order derived by Commander from a Decision plus an
//              optional Approval.
// Purpose: Canonical wire shape for the `action` stream.
// Dependencies: serde, serde_json, time
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::contracts::CONTRACT_VERSION;
use crate::contracts::decision::SafetyClassification;
use crate::identifiers::ActionId;
use crate::identifiers::ApprovalId;
use crate::identifiers::DecisionId;

/// Lifecycle state of an action as the Commander executes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    /// Constructed but not yet dispatched.
    Pending,
    /// Currently executing.
    Executing,
    /// Execution completed (see the paired `Outcome` for status).
    Completed,
}

/// Execution order constructed by Commander.
///
/// # Invariants
/// - `action_type` classification against the SAFE set must match
///   `safety_classification` at construction time.
/// - `approval_id` is present only when this action originated from a
///   `REQUEST_APPROVAL` decision with a consumed approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Action {
    /// Contract schema version, always [`CONTRACT_VERSION`].
    pub version: String,
    /// Identifier for this action.
    pub action_id: ActionId,
    /// Wall-clock construction time, RFC3339 UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Always `"commander"`.
    pub source: String,
    /// The decision this action was derived from.
    pub decision_id: DecisionId,
    /// The action type to dispatch.
    pub action_type: String,
    /// Safety classification carried through from the decision.
    pub safety_classification: SafetyClassification,
    /// Current lifecycle state.
    pub state: ActionState,
    /// Action-type-specific parameters.
    pub parameters: Value,
    /// Whether a rollback routine is registered for this action type.
    pub rollback_enabled: bool,
    /// Whether this action should simulate execution without side effects.
    pub dry_run: bool,
    /// Present only for RISKY actions executed under an admin approval.
    pub approval_id: Option<ApprovalId>,
}
