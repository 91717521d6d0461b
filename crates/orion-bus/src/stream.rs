// crates/orion-bus/src/stream.rs
// ============================================================================
// Module: Bus Stream
// Description: Bounded, approximately-trimmed message log with per-consumer-
//              group read cursors.
// Purpose: Back one `<prefix>:<kind>s` stream with in-memory storage that
//          mimics the broker interface assumed at spec.md §1.
// Dependencies: std only
// ============================================================================

//! ## Overview
//! A [`Stream`] is an append-only log of raw JSON payloads plus a monotonic
//! entry id. Consumer groups are created lazily on first read and each
//! tracks its own cursor, so every group observes every message while, within
//! a group, a message is handed to exactly one reader (single-consumer
//! groups in this in-process broker — there is no multi-reader fan-out
//! within a group).

use std::collections::HashMap;
use std::collections::VecDeque;

use serde_json::Value;

/// One published message, stamped with its position in the stream.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Monotonically increasing position within the stream.
    pub offset: u64,
    /// The raw `data` payload, already validated against its contract.
    pub payload: Value,
}

/// Bounded, append-only log for a single contract kind.
///
/// # Invariants
/// - Entries are trimmed from the front once length exceeds `cap * 11 / 10`,
///   down to `cap` — an approximate cap, per spec.md §6.
/// - Consumer group cursors never exceed the current tail offset.
pub struct Stream {
    cap: usize,
    next_offset: u64,
    entries: VecDeque<Entry>,
    groups: HashMap<String, u64>,
}

impl Stream {
    /// Creates an empty stream with the given approximate retention cap.
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self { cap, next_offset: 0, entries: VecDeque::new(), groups: HashMap::new() }
    }

    /// Appends a payload, returning its assigned offset.
    pub fn append(&mut self, payload: Value) -> u64 {
        let offset = self.next_offset;
        self.entries.push_back(Entry { offset, payload });
        self.next_offset += 1;
        self.trim();
        offset
    }

    fn trim(&mut self) {
        let threshold = self.cap.saturating_mul(11) / 10;
        if self.entries.len() > threshold.max(self.cap) {
            while self.entries.len() > self.cap {
                self.entries.pop_front();
            }
        }
    }

    /// Ensures a consumer group exists, starting its cursor at the current
    /// tail (new entries only). Idempotent: an existing group is untouched.
    pub fn ensure_group(&mut self, group: &str) {
        self.groups.entry(group.to_string()).or_insert(self.next_offset);
    }

    /// Reads up to `limit` undelivered entries for `group`, advancing its
    /// cursor past the entries returned.
    pub fn read_group(&mut self, group: &str, limit: usize) -> Vec<Entry> {
        self.ensure_group(group);
        let cursor = *self.groups.get(group).unwrap_or(&self.next_offset);
        let out: Vec<Entry> = self
            .entries
            .iter()
            .filter(|entry| entry.offset >= cursor)
            .take(limit)
            .cloned()
            .collect();
        if let Some(last) = out.last() {
            self.groups.insert(group.to_string(), last.offset + 1);
        }
        out
    }

    /// Reads entries for inspection/testing, ignoring consumer-group
    /// cursors entirely.
    pub fn read_from(&self, from: u64, limit: usize) -> Vec<Entry> {
        self.entries.iter().filter(|entry| entry.offset >= from).take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn each_group_sees_every_message() {
        let mut stream = Stream::new(100);
        stream.append(json!({"n": 1}));
        stream.append(json!({"n": 2}));
        let a = stream.read_group("group-a", 10);
        let b = stream.read_group("group-b", 10);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn group_cursor_advances_past_delivered_entries() {
        let mut stream = Stream::new(100);
        stream.append(json!({"n": 1}));
        stream.append(json!({"n": 2}));
        let first = stream.read_group("group-a", 1);
        assert_eq!(first.len(), 1);
        let second = stream.read_group("group-a", 10);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].offset, 1);
    }

    #[test]
    fn preexisting_group_is_not_an_error_on_ensure() {
        let mut stream = Stream::new(100);
        stream.ensure_group("group-a");
        stream.ensure_group("group-a");
        stream.append(json!({"n": 1}));
        assert_eq!(stream.read_group("group-a", 10).len(), 1);
    }

    #[test]
    fn trims_approximately_to_cap() {
        let mut stream = Stream::new(10);
        for n in 0..30 {
            stream.append(json!({"n": n}));
        }
        assert!(stream.entries.len() <= 11);
    }
}
