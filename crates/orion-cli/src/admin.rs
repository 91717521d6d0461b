// crates/orion-cli/src/admin.rs
// ============================================================================
// Module: Admin Loop
// Description: Parses admin commands from stdin and drives the Approval
//              Coordinator's CLI channel.
// Purpose: Implement spec.md §4.8/§6's CLI admin channel: approve, deny,
//          and force, one line at a time, until EOF or `quit`.
// Dependencies: orion-approval, orion-core, time, tokio, uuid
// ============================================================================

//! ## Overview
//! Each stdin line is one command:
//!
//! ```text
//! approve <approval_request_id> <admin_identity> <reason...>
//! deny    <approval_request_id> <admin_identity> <reason...>
//! force   <approval_request_id> <admin_identity> <override_breaker:bool> <override_cooldown:bool> <reason...>
//! quit
//! ```
//!
//! Every command is verified against the CLI channel — see
//! [`orion_approval::Channel::Cli`] — so a caller impersonating a different
//! admin identity is rejected the same way a mismatched Telegram chat ID
//! would be.

use orion_approval::ApprovalService;
use orion_approval::Channel;
use orion_core::identifiers::ApprovalRequestId;
use tokio::io::AsyncBufReadExt;

use crate::error::CliError;

/// Reads commands from `reader` until EOF or `quit`, driving `service`.
pub async fn run_loop(service: ApprovalService, mut reader: impl AsyncBufReadExt + Unpin) -> Result<(), CliError> {
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await.map_err(CliError::Stdin)?;
        if bytes_read == 0 {
            return Ok(());
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            return Ok(());
        }
        if let Err(err) = dispatch(&service, line).await {
            tracing::warn!(error = %err, command = line, "admin command rejected");
        }
    }
}

async fn dispatch(service: &ApprovalService, line: &str) -> Result<(), CliError> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().ok_or_else(|| CliError::InvalidCommand(line.to_string()))?;
    let now = time::OffsetDateTime::now_utc();
    match verb {
        "approve" | "deny" => {
            let (id, identity, reason) = parse_simple(&mut parts, line)?;
            if verb == "approve" {
                service.approve(id, Channel::Cli, &identity, &reason, now).await?;
            } else {
                service.deny(id, Channel::Cli, &identity, &reason, now).await?;
            }
            Ok(())
        }
        "force" => {
            let id = next_uuid(&mut parts, line)?;
            let identity = parts.next().ok_or_else(|| CliError::InvalidCommand(line.to_string()))?.to_string();
            let override_breaker = next_bool(&mut parts, line)?;
            let override_cooldown = next_bool(&mut parts, line)?;
            let reason = remaining(&mut parts, line)?;
            service.force(id, Channel::Cli, &identity, &reason, override_breaker, override_cooldown, now).await?;
            Ok(())
        }
        _ => Err(CliError::InvalidCommand(line.to_string())),
    }
}

fn parse_simple<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    line: &str,
) -> Result<(ApprovalRequestId, String, String), CliError> {
    let id = next_uuid(parts, line)?;
    let identity = parts.next().ok_or_else(|| CliError::InvalidCommand(line.to_string()))?.to_string();
    let reason = remaining(parts, line)?;
    Ok((id, identity, reason))
}

fn next_uuid<'a>(parts: &mut impl Iterator<Item = &'a str>, line: &str) -> Result<ApprovalRequestId, CliError> {
    let raw = parts.next().ok_or_else(|| CliError::InvalidCommand(line.to_string()))?;
    let uuid = uuid::Uuid::parse_str(raw).map_err(|_err| CliError::InvalidCommand(line.to_string()))?;
    Ok(ApprovalRequestId::from_uuid(uuid))
}

fn next_bool<'a>(parts: &mut impl Iterator<Item = &'a str>, line: &str) -> Result<bool, CliError> {
    let raw = parts.next().ok_or_else(|| CliError::InvalidCommand(line.to_string()))?;
    match raw {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(CliError::InvalidCommand(line.to_string())),
    }
}

fn remaining<'a>(parts: &mut impl Iterator<Item = &'a str>, line: &str) -> Result<String, CliError> {
    let reason = parts.collect::<Vec<_>>().join(" ");
    if reason.is_empty() {
        return Err(CliError::InvalidCommand(line.to_string()));
    }
    Ok(reason)
}
