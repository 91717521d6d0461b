// crates/orion-bus/src/lib.rs
// ============================================================================
// Module: Orion Bus Library
// Description: In-process stream broker standing in for the external bus
//              assumed by the system's interface boundary, plus the
//              contract validator that fails publishes closed.
// Purpose: Typed pub/sub with per-consumer-group acknowledged delivery and
//          bounded, approximate retention.
// Dependencies: orion-core, serde_json, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! `orion-bus` is a minimal, in-process realization of the stream broker
//! spec.md §1 assumes as external: "a stream broker offering per-consumer-
//! group acknowledged delivery with bounded retention." Each [`ContractKind`]
//! maps to one stream named `<prefix>:<kind>s`. Publishing validates the
//! message against its own `serde` shape (round-tripping through
//! `serde_json::Value` rejects unknown fields, enforcing
//! `additionalProperties: false` natively) before it is appended.
//!
//! This is not a production broker: there is no persistence across process
//! restarts and no network transport. It exists so the pipeline components
//! can be exercised end-to-end in-process and in tests.

pub mod bus;
pub mod error;
pub mod stream;

pub use bus::Bus;
pub use bus::BusConfig;
pub use bus::Subscription;
pub use error::BusError;
