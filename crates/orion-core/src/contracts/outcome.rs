// crates/orion-core/src/contracts/outcome.rs
// ============================================================================
// Module: Outcome Contract
// Description: Execution result published by Commander.
// Purpose: Canonical wire shape for the `outcome` stream.
// Dependencies: serde, serde_json, time
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::contracts::CONTRACT_VERSION;
use crate::identifiers::ActionId;
use crate::identifiers::OutcomeId;

/// Terminal status of an executed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Execution completed without error.
    Succeeded,
    /// Execution failed and no rollback was available or it also failed.
    Failed,
    /// Execution failed but rollback completed successfully.
    RolledBack,
}

/// Structured error detail attached to a non-`Succeeded` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutcomeError {
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Additional structured detail.
    pub details: Value,
}

/// Execution result for a single [`crate::contracts::Action`].
///
/// # Invariants
/// - Always published, regardless of execution success.
/// - `execution_time_ms >= 0` and is measured for every outcome.
/// - `error` is present iff `status != Succeeded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Outcome {
    /// Contract schema version, always [`CONTRACT_VERSION`].
    pub version: String,
    /// Identifier for this outcome.
    pub outcome_id: OutcomeId,
    /// Wall-clock publication time, RFC3339 UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Always `"commander"`.
    pub source: String,
    /// The action this outcome reports on.
    pub action_id: ActionId,
    /// Terminal status.
    pub status: OutcomeStatus,
    /// Measured execution duration in milliseconds.
    pub execution_time_ms: u64,
    /// Present on `Succeeded`: the action's result payload.
    pub result: Option<Value>,
    /// Present on non-`Succeeded`: structured error detail.
    pub error: Option<OutcomeError>,
    /// Present when a rollback routine was invoked.
    pub rollback_executed: Option<bool>,
}

impl Outcome {
    /// Builds a successful outcome.
    #[must_use]
    pub fn succeeded(action_id: ActionId, execution_time_ms: u64, result: Value, now: OffsetDateTime) -> Self {
        Self {
            version: CONTRACT_VERSION.to_string(),
            outcome_id: OutcomeId::new(),
            timestamp: now,
            source: "commander".to_string(),
            action_id,
            status: OutcomeStatus::Succeeded,
            execution_time_ms,
            result: Some(result),
            error: None,
            rollback_executed: None,
        }
    }

    /// Builds a failed or rolled-back outcome.
    #[must_use]
    pub fn failed(
        action_id: ActionId,
        execution_time_ms: u64,
        status: OutcomeStatus,
        error: OutcomeError,
        rollback_executed: bool,
        now: OffsetDateTime,
    ) -> Self {
        debug_assert!(status != OutcomeStatus::Succeeded);
        Self {
            version: CONTRACT_VERSION.to_string(),
            outcome_id: OutcomeId::new(),
            timestamp: now,
            source: "commander".to_string(),
            action_id,
            status,
            execution_time_ms,
            result: None,
            error: Some(error),
            rollback_executed: Some(rollback_executed),
        }
    }
}
