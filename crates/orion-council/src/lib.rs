// crates/orion-council/src/lib.rs
// ============================================================================
// Crate: orion-council
// Description: Independent reasoning jury with safety veto.
// Purpose: Entry point re-exporting the local validator, external validator,
//          aggregator, and the staged `Council` orchestrator (spec.md §4.7).
// Dependencies: async-trait, futures, orion-core, reqwest, tokio, tracing
// ============================================================================

//! Council validates decisions Brain has already produced, independently of
//! the reasoning that produced them. It never mutates a decision — it
//! returns a verdict, and Brain applies it.

pub mod aggregator;
pub mod council;
pub mod external;
pub mod local;

pub use aggregator::Aggregator;
pub use aggregator::CouncilVerdict;
pub use aggregator::ValidationOutcome;
pub use council::Council;
pub use external::CloudValidator;
pub use external::ExternalValidator;
pub use local::LocalModel;
pub use local::LocalValidator;
pub use local::NullLocalModel;
pub use local::ResourceMonitor;
pub use local::SysinfoResourceMonitor;
