// crates/orion-council/src/council.rs
// ============================================================================
// Module: Council
// Description: Staged validation combining the local validator, the
//              external validator, and the consensus aggregator.
// Purpose: Implement spec.md §4.7's `validate_decision` five-step pipeline.
// Dependencies: orion-core
// ============================================================================

//! ## Overview
//! [`Council::validate_decision`] is the orchestration spec.md §4.7
//! describes: call the local validator, escalate to external validators
//! only if warranted, union every result under the safety veto and
//! weighted aggregation, and apply the RISKY auto-approve floor. Brain
//! (spec.md §4.6) treats any failure surfaced out of this call as `BLOCKED`
//! — this crate never panics and never returns a bare error, so that
//! fail-closed behavior is structural rather than something the caller must
//! remember to implement.

use orion_core::contracts::Decision;
use orion_core::contracts::Incident;

use crate::aggregator::Aggregator;
use crate::aggregator::ValidationOutcome;
use crate::aggregator::should_escalate;
use crate::external::ExternalValidator;
use crate::local::LocalModel;
use crate::local::LocalValidator;
use crate::local::ResourceMonitor;

/// The full jury: local validator, external validator, and aggregator.
pub struct Council<M, R> {
    local: LocalValidator<M, R>,
    external: ExternalValidator,
    aggregator: Aggregator,
}

impl<M: LocalModel, R: ResourceMonitor> Council<M, R> {
    /// Builds a council from its three parts.
    #[must_use]
    pub fn new(local: LocalValidator<M, R>, external: ExternalValidator, aggregator: Aggregator) -> Self {
        Self { local, external, aggregator }
    }

    /// Runs the staged validation pipeline for one decision.
    pub async fn validate_decision(&self, decision: &Decision, incident: &Incident) -> ValidationOutcome {
        let local_result = self.local.validate(decision, incident).await;
        let mut results = vec![local_result.clone()];

        if should_escalate(local_result.0, decision.safety_classification, self.aggregator.confidence_threshold) {
            let external_results = self.external.validate_parallel(decision).await;
            results.extend(external_results);
        }

        self.aggregator.finalize(&results, decision.safety_classification)
    }
}

#[cfg(test)]
mod tests {
    use orion_core::contracts::AutonomyLevel;
    use orion_core::contracts::CorrelationWindow;
    use orion_core::contracts::DecisionType;
    use orion_core::contracts::SafetyClassification;
    use orion_core::identifiers::EventId;
    use orion_core::identifiers::IncidentId;
    use orion_core::severity::IncidentSeverity;
    use time::OffsetDateTime;

    use super::*;
    use crate::aggregator::CouncilVerdict;
    use crate::external::ExternalValidator;
    use crate::local::FakeLocalModel;
    use crate::local::FakeResourceMonitor;

    fn sample_incident() -> Incident {
        let now = OffsetDateTime::now_utc();
        Incident::new(
            "service_outage",
            IncidentSeverity::High,
            std::iter::once(EventId::new()).collect(),
            CorrelationWindow { start: now, end: now },
            "test",
            now,
        )
        .expect("incident")
    }

    fn decision_with(classification: SafetyClassification) -> Decision {
        Decision::new(
            IncidentId::new(),
            DecisionType::NoAction,
            classification,
            "observe only, N0 autonomy",
            AutonomyLevel::N0,
            None,
            OffsetDateTime::now_utc(),
        )
        .expect("decision")
    }

    #[tokio::test]
    async fn high_local_confidence_on_safe_decision_skips_external() {
        let council = Council::new(
            LocalValidator::new(
                FakeLocalModel::responding("CONFIDENCE: 0.95\nCRITIQUE: approved, safe"),
                FakeResourceMonitor::default(),
            ),
            ExternalValidator::new(vec![]),
            Aggregator::default(),
        );
        let outcome = council.validate_decision(&decision_with(SafetyClassification::Safe), &sample_incident()).await;
        assert_eq!(outcome.verdict, CouncilVerdict::Approved);
    }

    #[tokio::test]
    async fn risky_classification_always_escalates_to_external() {
        let council = Council::new(
            LocalValidator::new(
                FakeLocalModel::responding("CONFIDENCE: 0.95\nCRITIQUE: approved, safe"),
                FakeResourceMonitor::default(),
            ),
            ExternalValidator::new(vec![]),
            Aggregator::default(),
        );
        let outcome = council.validate_decision(&decision_with(SafetyClassification::Risky), &sample_incident()).await;
        // No external providers configured -> a zero-confidence error vote joins
        // the local approval, but the local vote alone still clears the
        // confidence threshold since the external error vote is dropped.
        assert_eq!(outcome.verdict, CouncilVerdict::EscalateToAdmin);
    }

    #[tokio::test]
    async fn local_safety_veto_blocks_regardless_of_classification() {
        let council = Council::new(
            LocalValidator::new(
                FakeLocalModel::responding("CONFIDENCE: 0.9\nCRITIQUE: this is dangerous and unsafe"),
                FakeResourceMonitor::default(),
            ),
            ExternalValidator::new(vec![]),
            Aggregator::default(),
        );
        let outcome = council.validate_decision(&decision_with(SafetyClassification::Safe), &sample_incident()).await;
        assert_eq!(outcome.verdict, CouncilVerdict::Blocked);
    }
}
