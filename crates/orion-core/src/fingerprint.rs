// crates/orion-core/src/fingerprint.rs
// ============================================================================
// Module: Event Fingerprint
// Description: Deduplication fingerprint for correlation-candidate events.
// Purpose: Produce the 16-hex fingerprint Guardian uses to suppress
//          duplicate incidents.
// Dependencies: serde_json, sha2
// ============================================================================

//! ## Overview
//! The fingerprint is a stable digest over a fixed, narrow subset of an
//! event's identifying fields — not the whole event — so that two
//! observations of "the same condition" collapse to one incident even if
//! their free-form `data` payloads differ.

use std::collections::BTreeMap;

use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;

use crate::contracts::Event;

/// Number of leading hex characters kept from the full SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 16;

/// Computes the deduplication fingerprint for an event.
///
/// The fingerprint covers `{event_type, source, severity, service_name?,
/// resource_type?}`. Because the field set is serialized through a
/// `BTreeMap`, key order never affects the digest.
#[must_use]
pub fn fingerprint(event: &Event) -> String {
    let mut fields: BTreeMap<&'static str, Value> = BTreeMap::new();
    fields.insert("event_type", Value::String(event.event_type.clone()));
    fields.insert("source", Value::String(event.source.clone()));
    fields.insert(
        "severity",
        serde_json::to_value(event.severity).unwrap_or(Value::Null),
    );
    if let Some(service_name) = event.service_name() {
        fields.insert("service_name", Value::String(service_name.to_string()));
    }
    if let Some(resource_type) = event.resource_type() {
        fields.insert("resource_type", Value::String(resource_type.to_string()));
    }

    // `BTreeMap` iteration is already key-sorted, so `serde_json`'s default
    // (insertion-order-preserving-from-iterator) output is canonical here.
    let canonical =
        serde_json::to_vec(&fields).unwrap_or_else(|_| event.event_type.clone().into_bytes());

    let digest = Sha256::digest(&canonical);
    let full_hex = format!("{digest:x}");
    full_hex[..FINGERPRINT_LEN].to_string()
}
