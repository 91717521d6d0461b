// crates/orion-brain/src/brain.rs
// ============================================================================
// Module: Brain
// Description: Turns incidents into decisions, gated by a fixed autonomy
//              level.
// Purpose: Implement spec.md §4.6's decision algorithm and Council
//          integration.
// Dependencies: orion-core, orion-council, orion-policy
// ============================================================================

//! ## Overview
//! [`Brain::decide`] is the entire decision algorithm spec.md §4.6 lays
//! out: a pure action choice, an autonomy-gated classification/cooldown/
//! breaker ladder, and an optional Council validation pass that can demote
//! a decision to `NO_ACTION` or flag it for escalation. Cooldown is
//! recorded before Council runs — deliberately, so a Council block does
//! not refund rate budget.

use std::time::Duration;
use std::time::Instant;

use orion_core::contracts::AutonomyLevel;
use orion_core::contracts::Decision;
use orion_core::contracts::DecisionType;
use orion_core::contracts::Incident;
use orion_core::contracts::ProposedAction;
use orion_core::contracts::SafetyClassification;
use orion_core::severity::IncidentSeverity;
use orion_council::Council;
use orion_council::CouncilVerdict;
use orion_council::LocalModel;
use orion_council::ResourceMonitor;
use orion_policy::PolicyStore;
use time::OffsetDateTime;

use crate::breaker::CircuitBreaker;
use crate::cooldown::CooldownTracker;

/// Default lifetime of a published `approval_request` (spec.md §6 leaves
/// this as an implementation constant).
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(900);

/// The single action Brain ever considers proposing.
const CANDIDATE_ACTION: &str = "acknowledge_incident";

/// The result of one `decide` call: the decision to publish, and — only
/// for N3 RISKY/UNKNOWN decisions — a sibling approval request.
pub struct DecisionOutput {
    /// The decision to publish on the bus.
    pub decision: Decision,
    /// Present iff `decision.decision_type == RequestApproval`.
    pub approval_request: Option<ApprovalRequestDraft>,
}

/// Everything needed to construct an `ApprovalRequest`, deferred to the
/// caller so it can mint `expires_at` from its own wall clock.
pub struct ApprovalRequestDraft {
    /// The action type awaiting approval.
    pub action_type: String,
    /// The action-type-specific parameters awaiting approval.
    pub requested_action: serde_json::Value,
}

/// Chooses the candidate action for an incident, purely as a function of
/// severity (spec.md §4.6): `medium`/`high`/`critical` -> acknowledge the
/// incident; `low` -> nothing.
#[must_use]
pub fn choose_action(incident: &Incident) -> Option<&'static str> {
    match incident.severity {
        IncidentSeverity::Low => None,
        IncidentSeverity::Medium | IncidentSeverity::High | IncidentSeverity::Critical => Some(CANDIDATE_ACTION),
    }
}

fn no_action(
    reasoning: String,
    safety_classification: SafetyClassification,
    autonomy_level: AutonomyLevel,
    now: OffsetDateTime,
    incident_id: orion_core::identifiers::IncidentId,
) -> Decision {
    #[allow(clippy::expect_used, reason = "reasoning strings here are always well over the minimum length")]
    Decision::new(incident_id, DecisionType::NoAction, safety_classification, reasoning, autonomy_level, None, now)
        .expect("no-action reasoning always satisfies the minimum length")
}

/// Turns incidents into decisions under a fixed autonomy level.
pub struct Brain<M, R> {
    autonomy_level: AutonomyLevel,
    policy: PolicyStore,
    cooldowns: CooldownTracker,
    breaker: CircuitBreaker,
    council: Option<Council<M, R>>,
    approval_timeout: Duration,
}

impl<M: LocalModel, R: ResourceMonitor> Brain<M, R> {
    /// Builds a Brain at a fixed autonomy level with no Council configured.
    #[must_use]
    pub fn new(autonomy_level: AutonomyLevel, policy: PolicyStore) -> Self {
        Self {
            autonomy_level,
            policy,
            cooldowns: CooldownTracker::new(),
            breaker: CircuitBreaker::default(),
            council: None,
            approval_timeout: DEFAULT_APPROVAL_TIMEOUT,
        }
    }

    /// Attaches a Council for post-decision validation.
    #[must_use]
    pub fn with_council(mut self, council: Council<M, R>) -> Self {
        self.council = Some(council);
        self
    }

    /// Overrides the default approval-request lifetime.
    #[must_use]
    pub const fn with_approval_timeout(mut self, approval_timeout: Duration) -> Self {
        self.approval_timeout = approval_timeout;
        self
    }

    /// Returns the configured approval-request lifetime.
    #[must_use]
    pub const fn approval_timeout(&self) -> Duration {
        self.approval_timeout
    }

    /// Records an execution failure against the circuit breaker for
    /// `action_type` — called by Commander's feedback path, not by Brain
    /// itself.
    pub fn record_failure(&mut self, action_type: &str, now: Instant) {
        self.breaker.record_failure(action_type, now);
    }

    /// Records an execution success, clearing accumulated failures.
    pub fn record_success(&mut self, action_type: &str) {
        self.breaker.record_success(action_type);
    }

    /// Runs the full decision algorithm for one incident.
    pub async fn decide(&mut self, incident: &Incident, now_wall: OffsetDateTime, now_mono: Instant) -> DecisionOutput {
        let decision = match self.autonomy_level {
            AutonomyLevel::N0 => self.decide_n0(incident, now_wall),
            AutonomyLevel::N2 => self.decide_n2(incident, now_wall, now_mono),
            AutonomyLevel::N3 => self.decide_n3(incident, now_wall, now_mono),
        };

        let decision = self.validate_with_council(decision, incident, now_wall).await;

        let approval_request = if decision.decision_type == DecisionType::RequestApproval {
            decision.proposed_action.as_ref().map(|proposed| ApprovalRequestDraft {
                action_type: proposed.action_type.clone(),
                requested_action: proposed.parameters.clone(),
            })
        } else {
            None
        };

        DecisionOutput { decision, approval_request }
    }

    fn decide_n0(&self, incident: &Incident, now: OffsetDateTime) -> Decision {
        no_action(
            "N0 autonomy: observe only, no action taken".to_string(),
            SafetyClassification::Safe,
            AutonomyLevel::N0,
            now,
            incident.incident_id,
        )
    }

    fn decide_n2(&mut self, incident: &Incident, now_wall: OffsetDateTime, now_mono: Instant) -> Decision {
        let Some(action_type) = choose_action(incident) else {
            return no_action(
                "no action chosen for this severity".to_string(),
                SafetyClassification::Safe,
                AutonomyLevel::N2,
                now_wall,
                incident.incident_id,
            );
        };
        self.decide_safe_or_suppress(action_type, incident, AutonomyLevel::N2, now_wall, now_mono)
    }

    fn decide_n3(&mut self, incident: &Incident, now_wall: OffsetDateTime, now_mono: Instant) -> Decision {
        let Some(action_type) = choose_action(incident) else {
            return no_action(
                "no action chosen for this severity".to_string(),
                SafetyClassification::Safe,
                AutonomyLevel::N3,
                now_wall,
                incident.incident_id,
            );
        };
        let classification = self.policy.classify(action_type);
        if matches!(classification, SafetyClassification::Risky | SafetyClassification::Unknown) {
            #[allow(clippy::expect_used, reason = "reasoning string is well over the minimum length")]
            return Decision::new(
                incident.incident_id,
                DecisionType::RequestApproval,
                SafetyClassification::Risky,
                format!("{action_type} is classified {classification:?}; requesting admin approval"),
                AutonomyLevel::N3,
                Some(ProposedAction { action_type: action_type.to_string(), parameters: serde_json::json!({}) }),
                now_wall,
            )
            .expect("reasoning satisfies minimum length");
        }
        self.decide_safe_or_suppress(action_type, incident, AutonomyLevel::N3, now_wall, now_mono)
    }

    fn decide_safe_or_suppress(
        &mut self,
        action_type: &str,
        incident: &Incident,
        autonomy_level: AutonomyLevel,
        now_wall: OffsetDateTime,
        now_mono: Instant,
    ) -> Decision {
        let classification = self.policy.classify(action_type);
        if !matches!(classification, SafetyClassification::Safe) {
            return no_action(
                format!("{action_type} is classified {classification:?}; suppressing under {autonomy_level:?}"),
                classification,
                autonomy_level,
                now_wall,
                incident.incident_id,
            );
        }

        let cooldown = self.policy.cooldown_for(action_type);
        if !self.cooldowns.check(action_type, cooldown, None, now_mono) {
            let remaining = self.cooldowns.remaining(action_type, cooldown, None, now_mono);
            return no_action(
                format!("{action_type} is on cooldown, {remaining}s remaining"),
                SafetyClassification::Safe,
                autonomy_level,
                now_wall,
                incident.incident_id,
            );
        }

        if self.policy.circuit_breaker_enabled() && self.breaker.is_open(action_type, now_mono) {
            return no_action(
                format!("circuit breaker is OPEN for {action_type}; suppressing execution"),
                SafetyClassification::Safe,
                autonomy_level,
                now_wall,
                incident.incident_id,
            );
        }

        self.cooldowns.record(action_type, None, now_mono);

        #[allow(clippy::expect_used, reason = "reasoning string is well over the minimum length")]
        Decision::new(
            incident.incident_id,
            DecisionType::ExecuteSafeAction,
            SafetyClassification::Safe,
            format!("{action_type} is SAFE and within policy; executing"),
            autonomy_level,
            Some(ProposedAction { action_type: action_type.to_string(), parameters: serde_json::json!({}) }),
            now_wall,
        )
        .expect("reasoning satisfies minimum length")
    }

    async fn validate_with_council(&self, decision: Decision, incident: &Incident, now: OffsetDateTime) -> Decision {
        if decision.decision_type == DecisionType::NoAction {
            return decision;
        }
        let Some(council) = &self.council else {
            return decision;
        };
        let outcome = council.validate_decision(&decision, incident).await;
        match outcome.verdict {
            CouncilVerdict::Approved => decision,
            CouncilVerdict::Blocked => {
                let reasoning = format!("BLOCKED BY COUNCIL: {}. Original reasoning: {}", outcome.critique, decision.reasoning);
                #[allow(clippy::expect_used, reason = "reasoning string is well over the minimum length")]
                Decision::new(
                    decision.incident_id,
                    DecisionType::NoAction,
                    decision.safety_classification,
                    reasoning,
                    decision.autonomy_level,
                    None,
                    now,
                )
                .expect("reasoning satisfies minimum length")
            }
            CouncilVerdict::EscalateToAdmin => {
                tracing::warn!(decision_id = %decision.decision_id, critique = %outcome.critique, "council escalated decision to admin");
                decision
            }
        }
    }
}
