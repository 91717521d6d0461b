// crates/orion-cli/src/error.rs
// ============================================================================
// Module: CLI Error
// Description: Top-level error type unifying every subsystem error this
//              binary surfaces to its exit code.
// Dependencies: orion-approval, orion-audit, serde_json, thiserror
// ============================================================================

/// Top-level CLI error.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A `--since` argument did not parse as RFC3339.
    #[error("invalid --since timestamp: {0}")]
    InvalidTimestamp(String),
    /// The audit store could not be opened, read, or written.
    #[error(transparent)]
    Audit(#[from] orion_audit::AuditError),
    /// An audit record failed to serialize back to JSON for printing.
    #[error("failed to serialize audit record: {0}")]
    Serialize(serde_json::Error),
    /// The admin identity document could not be loaded.
    #[error(transparent)]
    AdminIdentity(#[from] orion_approval::AdminIdentityError),
    /// A line read from stdin could not be parsed as an admin command.
    #[error("invalid admin command: {0}")]
    InvalidCommand(String),
    /// The admin operation itself was rejected (identity, lookup, expiry).
    #[error(transparent)]
    ApprovalService(#[from] orion_approval::ApprovalServiceError),
    /// Reading a line from stdin failed.
    #[error("failed to read admin input: {0}")]
    Stdin(std::io::Error),
}
