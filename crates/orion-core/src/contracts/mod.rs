// crates/orion-core/src/contracts/mod.rs
// ============================================================================
// Module: Orion Contracts
// Description: Versioned inter-component message contracts.
// Purpose: Define the wire shapes published and consumed across the bus.
// Dependencies: serde, serde_json, time, uuid
// ============================================================================

//! ## Overview
//! Every message that crosses [`crate`]'s bus boundary is a versioned
//! contract: a shared prefix of `{version, <kind>_id, timestamp, source}`
//! plus kind-specific fields. `#[serde(deny_unknown_fields)]` on every
//! contract struct enforces the `additionalProperties: false` requirement
//! natively, per the spec's design note on tagged variants over opaque maps.

pub mod action;
pub mod approval_decision;
pub mod approval_request;
pub mod decision;
pub mod event;
pub mod incident;
pub mod outcome;

pub use action::Action;
pub use action::ActionState;
pub use approval_decision::ApprovalDecision;
pub use approval_decision::ApprovalOutcome;
pub use approval_request::ApprovalRequest;
pub use decision::Decision;
pub use decision::DecisionType;
pub use decision::ProposedAction;
pub use decision::SafetyClassification;
pub use event::Event;
pub use incident::CorrelationWindow;
pub use incident::Incident;
pub use incident::IncidentState;
pub use outcome::Outcome;
pub use outcome::OutcomeError;
pub use outcome::OutcomeStatus;

/// Contract schema version. All contracts on the bus carry this value.
pub const CONTRACT_VERSION: &str = "1.0";

/// Kinds of contracts that flow over the bus, one per stream.
///
/// # Invariants
/// - The `Display` form is the lowercase stream suffix used to build
///   `<prefix>:<kind>s` stream names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    /// Raw observation published by a watcher.
    Event,
    /// Correlated condition published by Guardian.
    Incident,
    /// Reasoning outcome published by Brain.
    Decision,
    /// Human-approval request published alongside an N3 RISKY decision.
    ApprovalRequest,
    /// Settled human-approval decision published by the Approval Coordinator.
    ApprovalDecision,
    /// Execution order derived by Commander.
    Action,
    /// Execution result published by Commander.
    Outcome,
}

impl ContractKind {
    /// Returns the lowercase stream-name suffix for this kind (e.g. `"event"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Incident => "incident",
            Self::Decision => "decision",
            Self::ApprovalRequest => "approval_request",
            Self::ApprovalDecision => "approval_decision",
            Self::Action => "action",
            Self::Outcome => "outcome",
        }
    }
}

/// Marks a type as a versioned bus contract, tying it to its [`ContractKind`].
///
/// # Invariants
/// - Implementors derive `Serialize`/`Deserialize` with
///   `#[serde(deny_unknown_fields)]`, so a failed round-trip through
///   `serde_json::Value` is itself schema rejection.
pub trait Contract: serde::Serialize + for<'de> serde::Deserialize<'de> {
    /// The stream this contract type is published and read on.
    const KIND: ContractKind;
}

impl Contract for Event {
    const KIND: ContractKind = ContractKind::Event;
}

impl Contract for Incident {
    const KIND: ContractKind = ContractKind::Incident;
}

impl Contract for Decision {
    const KIND: ContractKind = ContractKind::Decision;
}

impl Contract for ApprovalRequest {
    const KIND: ContractKind = ContractKind::ApprovalRequest;
}

impl Contract for ApprovalDecision {
    const KIND: ContractKind = ContractKind::ApprovalDecision;
}

impl Contract for Action {
    const KIND: ContractKind = ContractKind::Action;
}

impl Contract for Outcome {
    const KIND: ContractKind = ContractKind::Outcome;
}
