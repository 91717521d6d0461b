// crates/orion-bus/src/error.rs
// ============================================================================
// Module: Bus Errors
// Description: Error taxonomy for publish, subscribe, and read operations.
// Purpose: Distinguish contract-violation (fail fast, no side effect) from
//          transient read errors (logged, loop continues).
// Dependencies: thiserror
// ============================================================================

use orion_core::ContractKind;
use thiserror::Error;

/// Errors returned by [`crate::Bus`] operations.
///
/// # Invariants
/// - `SchemaRejected` is raised synchronously to the `publish` caller and has
///   no side effect: the message is never appended to the stream.
#[derive(Debug, Error)]
pub enum BusError {
    /// The message failed to round-trip through its contract's own schema
    /// (unknown field, wrong type, or a violated structural invariant).
    #[error("contract rejected for {kind:?}: {reason}")]
    SchemaRejected {
        /// The contract kind the message was rejected for.
        kind: ContractKind,
        /// Human-readable rejection reason.
        reason: String,
    },
    /// A consumer-group read failed transiently (logged by the caller; the
    /// subscribe loop continues rather than terminating).
    #[error("transient read failure on {kind:?}: {reason}")]
    ReadFailed {
        /// The contract kind being read.
        kind: ContractKind,
        /// Human-readable failure reason.
        reason: String,
    },
}
