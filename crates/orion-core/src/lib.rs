// crates/orion-core/src/lib.rs
// ============================================================================
// Module: Orion Core Library
// Description: Shared contracts, identifiers, clock, and severity ordering.
// Purpose: Single source of truth for the types every other Orion crate
//          builds on, so Brain and Commander can never diverge on what a
//          SAFE action or a valid Decision looks like.
// Dependencies: serde, serde_json, sha2, thiserror, time, uuid
// ============================================================================

//! ## Overview
//! `orion-core` has no dependency on any other Orion crate. It defines:
//! - the seven versioned message [`contracts`] that flow over the bus,
//! - the UUID [`identifiers`] that address them,
//! - the [`clock`] capability every time-bounded component is built against,
//! - and the [`severity`] orderings Guardian and Brain reason with.

pub mod clock;
pub mod contracts;
pub mod fingerprint;
pub mod identifiers;
pub mod severity;

pub use contracts::ContractKind;
pub use contracts::CONTRACT_VERSION;
