// crates/orion-commander/src/executor.rs
// ============================================================================
// Module: Executor
// Description: Dispatches SAFE and approved-RISKY actions, measures
//              execution time, and attempts rollback on failure.
// Purpose: Implement spec.md §4.9's `on_decision`/`on_approval_decision`
//          handling and action dispatch.
// Dependencies: orion-core, orion-policy, time
// ============================================================================

//! ## Overview
//! [`Executor`] holds no bus handle of its own — it is pure state plus pure
//! transitions, so its correlation logic (does this `REQUEST_APPROVAL`
//! decision have a consumable approval sitting in `pending`?) is directly
//! unit-testable without a running bus. [`crate::spawn`] wires it to the
//! bus and to Brain's circuit-breaker feedback path.

use std::collections::HashMap;
use std::time::Instant;

use orion_core::contracts::Action;
use orion_core::contracts::ActionState;
use orion_core::contracts::ApprovalDecision;
use orion_core::contracts::ApprovalOutcome;
use orion_core::contracts::Decision;
use orion_core::contracts::DecisionType;
use orion_core::contracts::Outcome;
use orion_core::contracts::OutcomeError;
use orion_core::contracts::OutcomeStatus;
use orion_core::identifiers::ActionId;
use orion_core::identifiers::ApprovalRequestId;
use orion_core::identifiers::DecisionId;
use orion_policy::PolicyStore;
use time::OffsetDateTime;

/// The only action type Commander knows how to execute. Any other
/// `action_type` reaching [`Executor::execute`] raises an execution error.
pub const ACKNOWLEDGE_INCIDENT: &str = "acknowledge_incident";

/// Paired `Action`/`Outcome` produced by a single execution, plus the raw
/// action type and success flag the bus-wiring layer needs for circuit-
/// breaker feedback without re-deriving them from the contract shapes.
pub struct ExecutionReport {
    /// The constructed execution order.
    pub action: Action,
    /// Its result.
    pub outcome: Outcome,
    /// `action.action_type`, surfaced directly for feedback callers.
    pub action_type: String,
    /// `true` iff `outcome.status == Succeeded`.
    pub succeeded: bool,
}

enum ExecutionError {
    UnknownActionType(String),
}

/// Tracks pending approvals and dispatches executions.
///
/// # Invariants
/// - `pending` and `by_decision` are kept in lockstep: every
///   `by_decision` value has a matching `pending` key, and vice versa.
pub struct Executor {
    policy: PolicyStore,
    pending: HashMap<ApprovalRequestId, ApprovalDecision>,
    by_decision: HashMap<DecisionId, ApprovalRequestId>,
}

impl Executor {
    /// Builds an executor against a read-only policy snapshot.
    #[must_use]
    pub fn new(policy: PolicyStore) -> Self {
        Self { policy, pending: HashMap::new(), by_decision: HashMap::new() }
    }

    /// Ingests a settled approval decision. Ignored unless it approves or
    /// forces the action; dropped without storing if already expired.
    pub fn on_approval_decision(&mut self, decision: ApprovalDecision, now: OffsetDateTime) {
        if !matches!(decision.decision, ApprovalOutcome::Approve | ApprovalOutcome::Force) {
            return;
        }
        if now >= decision.expires_at {
            tracing::warn!(approval_request_id = %decision.approval_request_id, "approval decision already expired on arrival; dropping");
            return;
        }
        self.by_decision.insert(decision.decision_id, decision.approval_request_id);
        self.pending.insert(decision.approval_request_id, decision);
    }

    /// Handles a freshly published decision, returning the execution report
    /// to publish, or `None` if the decision was refused or ignored.
    pub fn on_decision(&mut self, decision: &Decision, now_wall: OffsetDateTime, now_mono: Instant) -> Option<ExecutionReport> {
        match decision.decision_type {
            DecisionType::ExecuteSafeAction => self.on_execute_safe_action(decision, now_wall, now_mono),
            DecisionType::RequestApproval => self.on_request_approval(decision, now_wall, now_mono),
            DecisionType::NoAction => None,
        }
    }

    fn on_execute_safe_action(&mut self, decision: &Decision, now_wall: OffsetDateTime, now_mono: Instant) -> Option<ExecutionReport> {
        let proposed = decision.proposed_action.as_ref()?;
        if !self.policy.is_safe(&proposed.action_type) {
            tracing::warn!(action_type = %proposed.action_type, "EXECUTE_SAFE_ACTION for a non-SAFE action type; refusing");
            return None;
        }
        let action = Action {
            version: orion_core::CONTRACT_VERSION.to_string(),
            action_id: ActionId::new(),
            timestamp: now_wall,
            source: "commander".to_string(),
            decision_id: decision.decision_id,
            action_type: proposed.action_type.clone(),
            safety_classification: decision.safety_classification,
            state: ActionState::Pending,
            parameters: proposed.parameters.clone(),
            rollback_enabled: self.policy.is_reversible(&proposed.action_type),
            dry_run: false,
            approval_id: None,
        };
        Some(self.execute(action, now_wall, now_mono))
    }

    fn on_request_approval(&mut self, decision: &Decision, now_wall: OffsetDateTime, now_mono: Instant) -> Option<ExecutionReport> {
        let Some(proposed) = decision.proposed_action.as_ref() else {
            return None;
        };
        let Some(&approval_request_id) = self.by_decision.get(&decision.decision_id) else {
            tracing::warn!(decision_id = %decision.decision_id, "REQUEST_APPROVAL with no stored approval; refusing");
            return None;
        };
        let Some(approval) = self.pending.get(&approval_request_id) else {
            self.by_decision.remove(&decision.decision_id);
            return None;
        };
        if approval.expires_at <= now_wall {
            tracing::warn!(decision_id = %decision.decision_id, "stored approval expired before execution; purging and refusing");
            self.by_decision.remove(&decision.decision_id);
            self.pending.remove(&approval_request_id);
            return None;
        }

        let approval = self.pending.remove(&approval_request_id).expect("just looked up");
        self.by_decision.remove(&decision.decision_id);

        if approval.decision == ApprovalOutcome::Force {
            tracing::warn!(
                decision_id = %decision.decision_id,
                override_circuit_breaker = approval.override_circuit_breaker.unwrap_or(false),
                override_cooldown = approval.override_cooldown.unwrap_or(false),
                "executing a forced approval, bypassing safety gates"
            );
        }

        let action = Action {
            version: orion_core::CONTRACT_VERSION.to_string(),
            action_id: ActionId::new(),
            timestamp: now_wall,
            source: "commander".to_string(),
            decision_id: decision.decision_id,
            action_type: proposed.action_type.clone(),
            safety_classification: decision.safety_classification,
            state: ActionState::Pending,
            parameters: proposed.parameters.clone(),
            rollback_enabled: self.policy.is_reversible(&proposed.action_type),
            dry_run: false,
            approval_id: Some(approval.approval_id),
        };
        Some(self.execute(action, now_wall, now_mono))
    }

    fn execute(&self, mut action: Action, now_wall: OffsetDateTime, started: Instant) -> ExecutionReport {
        action.state = ActionState::Executing;
        let action_type = action.action_type.clone();
        let dispatch_result = dispatch(&action_type, &action.parameters);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let outcome = match dispatch_result {
            Ok(result) => Outcome::succeeded(action.action_id, elapsed_ms, result, now_wall),
            Err(ExecutionError::UnknownActionType(action_type)) => {
                let rollback_executed = action.rollback_enabled;
                let status = if rollback_executed { OutcomeStatus::RolledBack } else { OutcomeStatus::Failed };
                let error = OutcomeError {
                    code: "EXECUTION_FAILED".to_string(),
                    message: format!("no dispatch routine registered for action type {action_type:?}"),
                    details: serde_json::json!({ "action_type": action_type }),
                };
                Outcome::failed(action.action_id, elapsed_ms, status, error, rollback_executed, now_wall)
            }
        };

        let action_type = action.action_type.clone();
        let succeeded = outcome.status == OutcomeStatus::Succeeded;
        action.state = ActionState::Completed;
        ExecutionReport { action, outcome, action_type, succeeded }
    }
}

fn dispatch(action_type: &str, parameters: &serde_json::Value) -> Result<serde_json::Value, ExecutionError> {
    match action_type {
        ACKNOWLEDGE_INCIDENT => Ok(serde_json::json!({
            "acknowledged": true,
            "incident_id": parameters.get("incident_id").cloned().unwrap_or(serde_json::Value::Null),
        })),
        other => Err(ExecutionError::UnknownActionType(other.to_string())),
    }
}
