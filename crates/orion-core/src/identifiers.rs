// crates/orion-core/src/identifiers.rs
// ============================================================================
// Module: Orion Identifiers
// Description: Canonical opaque identifiers for Orion contracts.
// Purpose: Provide strongly typed, serializable UUID identifiers with stable
//          wire forms, one newtype per contract kind.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Every contract in Orion is addressed by a UUID-backed identifier. Newtypes
//! prevent an `IncidentId` from being passed where a `DecisionId` is expected
//! even though both are, on the wire, plain UUID strings.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Defines a UUID-backed identifier newtype with the standard constructors.
macro_rules! uuid_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID value.
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(EventId, "Identifier for an [`crate::contracts::Event`].");
uuid_id!(IncidentId, "Identifier for an [`crate::contracts::Incident`].");
uuid_id!(DecisionId, "Identifier for a [`crate::contracts::Decision`].");
uuid_id!(
    ApprovalRequestId,
    "Identifier for an [`crate::contracts::ApprovalRequest`], one-time-use by the Approval Coordinator."
);
uuid_id!(
    ApprovalId,
    "Identifier for a settled [`crate::contracts::ApprovalDecision`]."
);
uuid_id!(ActionId, "Identifier for an [`crate::contracts::Action`].");
uuid_id!(OutcomeId, "Identifier for an [`crate::contracts::Outcome`].");
