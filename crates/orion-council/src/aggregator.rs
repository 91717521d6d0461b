// crates/orion-council/src/aggregator.rs
// ============================================================================
// Module: Consensus Aggregator
// Description: Pure vote parsing, weighted aggregation, and safety veto.
// Purpose: Implement spec.md §4.7's aggregation algorithm with no I/O.
// Dependencies: orion-core
// ============================================================================

//! ## Overview
//! The aggregator performs no I/O beyond what the validators it is handed
//! already performed (spec.md §4.7's closing line). Every method here is a
//! pure function over `(confidence, critique)` pairs, which keeps the
//! escalation-rule and safety-veto edge cases unit-testable without a
//! network or a model in the loop.

use orion_core::contracts::SafetyClassification;

/// Default minimum weighted-average confidence to approve.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Default confidence floor for the unconditional safety veto.
pub const DEFAULT_SAFETY_VETO_THRESHOLD: f64 = 0.8;

/// Confidence floor for auto-approving a RISKY decision without escalating
/// to a human (spec.md §4.7 step 5).
pub const RISKY_AUTO_APPROVE_FLOOR: f64 = 0.9;

const BLOCKER_KEYWORDS: &[&str] =
    &["block", "blocked", "unsafe", "risky", "concern", "reject", "invalid", "dangerous", "error"];
const APPROVE_KEYWORDS: &[&str] = &["approve", "approved", "safe", "correct", "valid", "agree", "confident"];
const VETO_KEYWORDS: &[&str] = &["unsafe", "risky", "concern", "dangerous", "violation", "hazard"];

/// The aggregator's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouncilVerdict {
    /// Approve the decision unchanged.
    Approved,
    /// Block the decision; Brain mutates it to `NO_ACTION`.
    Blocked,
    /// Escalate to a human admin; Brain publishes the decision unchanged
    /// but logs the escalation.
    EscalateToAdmin,
}

/// A validation result, carrying the verdict, aggregated confidence, and a
/// human-readable critique (the safety-veto reason, or every joined
/// critique on a normal aggregation).
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// The verdict.
    pub verdict: CouncilVerdict,
    /// Aggregated confidence in `[0, 1]`.
    pub confidence: f64,
    /// Joined critique text.
    pub critique: String,
}

/// Consensus aggregator configuration.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    /// Minimum weighted-average confidence required to approve.
    pub confidence_threshold: f64,
    /// Confidence floor for the unconditional safety veto.
    pub safety_veto_threshold: f64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            safety_veto_threshold: DEFAULT_SAFETY_VETO_THRESHOLD,
        }
    }
}

/// Parses a single critique into a binary vote: `0` for a blocker, `1` for
/// an approval, `0` as the conservative default when neither keyword set
/// matches.
#[must_use]
pub fn parse_vote(critique: &str) -> u8 {
    let lower = critique.to_ascii_lowercase();
    if BLOCKER_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
        return 0;
    }
    if APPROVE_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
        return 1;
    }
    0
}

/// Whether `should_escalate` (spec.md §4.7): a low local confidence or a
/// RISKY classification both trigger fanning out to external validators.
#[must_use]
pub fn should_escalate(local_confidence: f64, classification: SafetyClassification, threshold: f64) -> bool {
    local_confidence < threshold || classification == SafetyClassification::Risky
}

impl Aggregator {
    /// Checks the unconditional safety veto: any result with
    /// `confidence >= safety_veto_threshold` whose critique names a safety
    /// concern blocks outright, dominating every other signal.
    #[must_use]
    pub fn safety_veto(&self, results: &[(f64, String)]) -> Option<ValidationOutcome> {
        for (confidence, critique) in results {
            if *confidence >= self.safety_veto_threshold {
                let lower = critique.to_ascii_lowercase();
                if VETO_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
                    return Some(ValidationOutcome {
                        verdict: CouncilVerdict::Blocked,
                        confidence: 0.0,
                        critique: format!("safety veto: {critique}"),
                    });
                }
            }
        }
        None
    }

    /// Weighted vote aggregation (spec.md §4.7): drops zero-confidence
    /// results, weights the rest by their own confidence, and approves iff
    /// the weighted-average vote clears `confidence_threshold`.
    #[must_use]
    pub fn aggregate(&self, results: &[(f64, String)]) -> ValidationOutcome {
        let weighted: Vec<(f64, u8, &str)> = results
            .iter()
            .filter(|(confidence, _)| *confidence > 0.0)
            .map(|(confidence, critique)| (*confidence, parse_vote(critique), critique.as_str()))
            .collect();

        let joined = results.iter().map(|(_, critique)| critique.as_str()).collect::<Vec<_>>().join("; ");

        if weighted.is_empty() {
            return ValidationOutcome { verdict: CouncilVerdict::Blocked, confidence: 0.0, critique: joined };
        }

        let total_weight: f64 = weighted.iter().map(|(confidence, _, _)| confidence).sum();
        let weighted_sum: f64 =
            weighted.iter().map(|(confidence, vote, _)| confidence * f64::from(*vote)).sum();
        let average = weighted_sum / total_weight;

        let verdict =
            if average >= self.confidence_threshold { CouncilVerdict::Approved } else { CouncilVerdict::Blocked };
        ValidationOutcome { verdict, confidence: average, critique: joined }
    }

    /// Runs the full staged aggregation: veto check, then weighted
    /// aggregation, then the RISKY auto-approve escalation override (step
    /// 5 of spec.md §4.7's `validate_decision`).
    #[must_use]
    pub fn finalize(&self, results: &[(f64, String)], classification: SafetyClassification) -> ValidationOutcome {
        if let Some(veto) = self.safety_veto(results) {
            return veto;
        }
        let outcome = self.aggregate(results);
        if outcome.verdict == CouncilVerdict::Approved
            && classification == SafetyClassification::Risky
            && outcome.confidence < RISKY_AUTO_APPROVE_FLOOR
        {
            return ValidationOutcome { verdict: CouncilVerdict::EscalateToAdmin, ..outcome };
        }
        outcome
    }
}
