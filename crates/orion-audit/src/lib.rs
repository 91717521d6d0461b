// crates/orion-audit/src/lib.rs
// ============================================================================
// Module: Orion Audit Store
// Description: Append-only, per-contract-kind audit log.
// Purpose: Durable, line-delimited JSON record of events, incidents,
//          decisions, outcomes, and escalations, each segregated into its
//          own file and readable with {limit, since} filters.
// Dependencies: orion-core, serde, serde_json, thiserror, time, tracing
// ============================================================================

//! ## Overview
//! Spec.md §6 specifies "three append-only files, one per contract-kind
//! triple (events, incidents, decisions)". This crate generalizes that to
//! one file per [`AuditKind`], adding `outcomes` (Open Question (b):
//! `acknowledge_incident` routes its acknowledgement record through the
//! audit store rather than mutating incident state) and `escalations`
//! (the ESCALATION entries the Approval Coordinator emits on expiry or
//! identity mismatch, spec.md §4.8, §7). Each file is opened once in
//! append mode and flushed on every write — crash-safe, never rewritten.

use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

/// Segregated audit categories, one file per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    /// Raw events, mirrored from the `event` stream.
    Event,
    /// Correlated incidents, mirrored from the `incident` stream.
    Incident,
    /// Reasoning outcomes, mirrored from the `decision` stream.
    Decision,
    /// Execution outcomes, including acknowledgement records.
    Outcome,
    /// Escalation entries: expired or mismatched approvals, never an
    /// execution.
    Escalation,
}

impl AuditKind {
    const fn file_name(self) -> &'static str {
        match self {
            Self::Event => "events.jsonl",
            Self::Incident => "incidents.jsonl",
            Self::Decision => "decisions.jsonl",
            Self::Outcome => "outcomes.jsonl",
            Self::Escalation => "escalations.jsonl",
        }
    }
}

/// Errors raised opening or writing the audit store.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The audit directory or one of its files could not be opened.
    #[error("failed to open audit file {path}: {source}")]
    Open {
        /// Path that failed to open.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A record failed to serialize or a write failed.
    #[error("failed to write audit record: {0}")]
    Write(String),
    /// A stored line failed to parse back into a record.
    #[error("failed to read audit record: {0}")]
    Read(String),
}

/// One line in an audit file: a timestamped, kind-tagged payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Wall-clock time the record was appended, RFC3339 UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
    /// Free-form record payload (typically a serialized contract, or a
    /// short escalation reason).
    pub payload: Value,
}

struct KindFile {
    handle: Mutex<File>,
}

/// Append-only audit log, one file per [`AuditKind`] under a configured
/// directory.
///
/// # Invariants
/// - Once appended, a record is never rewritten or removed.
/// - Every write flushes before returning.
pub struct AuditStore {
    dir: PathBuf,
    event: KindFile,
    incident: KindFile,
    decision: KindFile,
    outcome: KindFile,
    escalation: KindFile,
}

impl AuditStore {
    /// Opens (creating if absent) the five audit files under `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Open`] if `dir` cannot be created or any file
    /// cannot be opened in append mode.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|source| AuditError::Open { path: dir.display().to_string(), source })?;
        Ok(Self {
            event: open_kind_file(&dir, AuditKind::Event)?,
            incident: open_kind_file(&dir, AuditKind::Incident)?,
            decision: open_kind_file(&dir, AuditKind::Decision)?,
            outcome: open_kind_file(&dir, AuditKind::Outcome)?,
            escalation: open_kind_file(&dir, AuditKind::Escalation)?,
            dir,
        })
    }

    fn file_for(&self, kind: AuditKind) -> &KindFile {
        match kind {
            AuditKind::Event => &self.event,
            AuditKind::Incident => &self.incident,
            AuditKind::Decision => &self.decision,
            AuditKind::Outcome => &self.outcome,
            AuditKind::Escalation => &self.escalation,
        }
    }

    /// Appends `payload` to `kind`'s file, stamped with `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Write`] if serialization or the write fails.
    pub fn record(&self, kind: AuditKind, payload: Value, now: OffsetDateTime) -> Result<(), AuditError> {
        let record = AuditRecord { recorded_at: now, payload };
        let mut line =
            serde_json::to_string(&record).map_err(|err| AuditError::Write(err.to_string()))?;
        line.push('\n');
        let file = self.file_for(kind);
        let mut handle = file.handle.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        handle.write_all(line.as_bytes()).map_err(|err| AuditError::Write(err.to_string()))?;
        handle.flush().map_err(|err| AuditError::Write(err.to_string()))?;
        Ok(())
    }

    /// Convenience for the Approval Coordinator's ESCALATION entries
    /// (spec.md §4.8, §7): never an execution, logged and appended.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Write`] on a write failure.
    pub fn escalate(&self, reason: impl Into<String>, now: OffsetDateTime) -> Result<(), AuditError> {
        let reason = reason.into();
        tracing::warn!(reason = %reason, "ESCALATION");
        self.record(AuditKind::Escalation, serde_json::json!({"reason": reason}), now)
    }

    /// Reads up to `limit` records from `kind`'s file (all if `limit` is
    /// `None`), optionally filtered to records recorded at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Read`] if the file cannot be opened for
    /// reading or a line fails to parse.
    pub fn read(
        &self,
        kind: AuditKind,
        limit: Option<usize>,
        since: Option<OffsetDateTime>,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        let path = self.dir.join(kind.file_name());
        let file = File::open(&path)
            .map_err(|source| AuditError::Open { path: path.display().to_string(), source })?;
        let reader = BufReader::new(file);
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|err| AuditError::Read(err.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: AuditRecord =
                serde_json::from_str(&line).map_err(|err| AuditError::Read(err.to_string()))?;
            if since.is_some_and(|since| record.recorded_at < since) {
                continue;
            }
            out.push(record);
            if limit.is_some_and(|limit| out.len() >= limit) {
                break;
            }
        }
        Ok(out)
    }
}

fn open_kind_file(dir: &Path, kind: AuditKind) -> Result<KindFile, AuditError> {
    let path = dir.join(kind.file_name());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| AuditError::Open { path: path.display().to_string(), source })?;
    Ok(KindFile { handle: Mutex::new(file) })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn records_are_segregated_per_kind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AuditStore::open(dir.path()).expect("open");
        let now = OffsetDateTime::now_utc();
        store.record(AuditKind::Event, json!({"event_type": "service_down"}), now).expect("write");
        store.record(AuditKind::Incident, json!({"incident_type": "service_outage"}), now).expect("write");

        let events = store.read(AuditKind::Event, None, None).expect("read");
        let incidents = store.read(AuditKind::Incident, None, None).expect("read");
        assert_eq!(events.len(), 1);
        assert_eq!(incidents.len(), 1);
        assert_eq!(events[0].payload["event_type"], "service_down");
    }

    #[test]
    fn since_filters_out_earlier_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AuditStore::open(dir.path()).expect("open");
        let t0 = OffsetDateTime::now_utc();
        store.record(AuditKind::Decision, json!({"n": 1}), t0).expect("write");
        let t1 = t0 + time::Duration::seconds(10);
        store.record(AuditKind::Decision, json!({"n": 2}), t1).expect("write");

        let since_t1 = store.read(AuditKind::Decision, None, Some(t1)).expect("read");
        assert_eq!(since_t1.len(), 1);
        assert_eq!(since_t1[0].payload["n"], 2);
    }

    #[test]
    fn limit_bounds_the_number_of_records_returned() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AuditStore::open(dir.path()).expect("open");
        let now = OffsetDateTime::now_utc();
        for n in 0..5 {
            store.record(AuditKind::Event, json!({"n": n}), now).expect("write");
        }
        let limited = store.read(AuditKind::Event, Some(2), None).expect("read");
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn escalation_never_appears_as_an_outcome() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AuditStore::open(dir.path()).expect("open");
        store.escalate("approval expired before admin decision", OffsetDateTime::now_utc()).expect("write");
        assert_eq!(store.read(AuditKind::Escalation, None, None).expect("read").len(), 1);
        assert_eq!(store.read(AuditKind::Outcome, None, None).expect("read").len(), 0);
    }
}
