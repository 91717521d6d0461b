// system-tests/tests/scenarios.rs
// ============================================================================
// Module: Pipeline Scenarios
// Description: The six literal seed scenarios from the Orion decision
//              algorithm's testable-properties section, exercised against a
//              fully wired Guardian -> Brain -> Council -> Approval ->
//              Commander pipeline.
// Dependencies: orion-approval, orion-brain, orion-bus, orion-core,
//               orion-council, orion-guardian, orion-policy, tokio
// ============================================================================

mod support;

use std::io::Write as _;
use std::time::Duration;

use orion_approval::ApprovalServiceError;
use orion_approval::ApprovalError;
use orion_core::ContractKind;
use orion_core::clock::Clock;
use orion_core::clock::FakeClock;
use orion_core::contracts::AutonomyLevel;
use orion_core::severity::EventSeverity;
use orion_council::Aggregator;
use orion_council::Council;
use orion_council::ExternalValidator;
use orion_council::LocalValidator;
use orion_council::local::FakeLocalModel;
use orion_council::local::FakeResourceMonitor;
use orion_policy::PolicyStore;

fn policy_declaring(action_type: &str, safe: bool) -> PolicyStore {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    let contents = if safe {
        format!(
            r#"
            [[safe_actions]]
            action_type = "{action_type}"
            description = "test fixture"
            reversible = true
            external_side_effects = false
            justification = "low risk"
            "#
        )
    } else {
        format!(
            r#"
            [[risky_actions]]
            action_type = "{action_type}"
            description = "test fixture"
            reversible = true
            external_side_effects = false
            blast_radius = "single incident"
            justification = "test fixture"
            requires_approval = true
            "#
        )
    };
    file.write_all(contents.as_bytes()).expect("write policy");
    PolicyStore::try_load(file.path()).expect("load policy")
}

#[tokio::test]
async fn n0_absorbs_critical() {
    let audit_dir = tempfile::tempdir().expect("tempdir");
    let harness = support::boot::<FakeLocalModel, FakeResourceMonitor>(
        AutonomyLevel::N0,
        PolicyStore::empty(),
        None,
        None,
        audit_dir.path(),
    );

    support::publish_event(&harness.bus, "service_down", EventSeverity::Critical).await;

    let incident = support::wait_for(&harness.bus, ContractKind::Incident, |v| v["severity"] == "critical").await;
    let incident_id = incident["incident_id"].clone();

    let decision =
        support::wait_for(&harness.bus, ContractKind::Decision, |v| v["incident_id"] == incident_id).await;
    assert_eq!(decision["decision_type"], "NO_ACTION");
    assert_eq!(decision["safety_classification"], "SAFE");
    let reasoning = decision["reasoning"].as_str().expect("reasoning is a string");
    assert!(reasoning.contains("N0"));
    assert!(reasoning.to_lowercase().contains("observe only"));
    assert!(decision["proposed_action"].is_null());

    support::assert_never(&harness.bus, ContractKind::ApprovalRequest, Duration::from_millis(200), |v| {
        v["incident_id"] == incident_id
    })
    .await;
}

#[tokio::test]
async fn n2_safe_autodispatch() {
    let audit_dir = tempfile::tempdir().expect("tempdir");
    let policy = policy_declaring("acknowledge_incident", true);
    let harness = support::boot::<FakeLocalModel, FakeResourceMonitor>(
        AutonomyLevel::N2,
        policy,
        None,
        None,
        audit_dir.path(),
    );

    support::publish_event(&harness.bus, "metric_threshold_exceeded", EventSeverity::Warning).await;

    let decision =
        support::wait_for(&harness.bus, ContractKind::Decision, |v| v["decision_type"] == "EXECUTE_SAFE_ACTION").await;
    assert_eq!(decision["proposed_action"]["action_type"], "acknowledge_incident");
    let decision_id = decision["decision_id"].clone();

    let action = support::wait_for(&harness.bus, ContractKind::Action, |v| v["decision_id"] == decision_id).await;
    let action_id = action["action_id"].clone();

    let outcome = support::wait_for(&harness.bus, ContractKind::Outcome, |v| v["action_id"] == action_id).await;
    assert_eq!(outcome["status"], "succeeded");
    assert!(outcome["execution_time_ms"].as_u64().is_some());

    support::assert_never(&harness.bus, ContractKind::ApprovalRequest, Duration::from_millis(200), |_| true).await;
}

#[tokio::test]
async fn n2_risky_suppression() {
    let audit_dir = tempfile::tempdir().expect("tempdir");
    let policy = policy_declaring("acknowledge_incident", false);
    let harness = support::boot::<FakeLocalModel, FakeResourceMonitor>(
        AutonomyLevel::N2,
        policy,
        None,
        None,
        audit_dir.path(),
    );

    support::publish_event(&harness.bus, "metric_threshold_exceeded", EventSeverity::Warning).await;

    let decision =
        support::wait_for(&harness.bus, ContractKind::Decision, |v| v["decision_type"] == "NO_ACTION").await;
    assert_eq!(decision["safety_classification"], "RISKY");

    support::assert_never(&harness.bus, ContractKind::ApprovalRequest, Duration::from_millis(200), |_| true).await;
}

#[tokio::test]
async fn n3_approval_expiry_produces_no_decision_and_escalates() {
    let audit_dir = tempfile::tempdir().expect("tempdir");
    let harness = support::boot::<FakeLocalModel, FakeResourceMonitor>(
        AutonomyLevel::N3,
        PolicyStore::empty(),
        None,
        Some(Duration::from_secs(1)),
        audit_dir.path(),
    );

    support::publish_event(&harness.bus, "metric_threshold_exceeded", EventSeverity::Error).await;

    let request = support::wait_for(&harness.bus, ContractKind::ApprovalRequest, |_| true).await;
    let approval_request_id: orion_core::identifiers::ApprovalRequestId =
        serde_json::from_value(request["approval_request_id"].clone()).expect("approval_request_id");

    tokio::time::sleep(Duration::from_millis(1200)).await;
    let now = time::OffsetDateTime::now_utc();

    let err = harness
        .approval
        .approve(approval_request_id, support::ADMIN_CHANNEL, support::ADMIN_IDENTITY, "approved too late", now)
        .await
        .expect_err("expired request must not produce a decision");
    assert!(matches!(err, ApprovalServiceError::Approval(ApprovalError::Expired)));

    support::assert_never(&harness.bus, ContractKind::ApprovalDecision, Duration::from_millis(200), |_| true).await;

    let escalations = harness.audit.read(orion_audit::AuditKind::Escalation, None, None).expect("read escalations");
    assert!(!escalations.is_empty(), "expired approval must leave an escalation record");
}

#[tokio::test]
async fn council_safety_veto_blocks_an_otherwise_safe_action() {
    let audit_dir = tempfile::tempdir().expect("tempdir");
    let policy = policy_declaring("acknowledge_incident", true);
    let council = Council::new(
        LocalValidator::new(
            FakeLocalModel::responding("CONFIDENCE: 0.9\nCRITIQUE: this is dangerous and unsafe"),
            FakeResourceMonitor::default(),
        ),
        ExternalValidator::new(vec![]),
        Aggregator::default(),
    );
    let harness = support::boot(AutonomyLevel::N2, policy, Some(council), None, audit_dir.path());

    support::publish_event(&harness.bus, "metric_threshold_exceeded", EventSeverity::Warning).await;

    let decision =
        support::wait_for(&harness.bus, ContractKind::Decision, |v| v["decision_type"] == "NO_ACTION").await;
    let reasoning = decision["reasoning"].as_str().expect("reasoning is a string");
    assert!(reasoning.starts_with("BLOCKED BY COUNCIL:"));
    assert!(decision["proposed_action"].is_null());

    support::assert_never(&harness.bus, ContractKind::Outcome, Duration::from_millis(200), |_| true).await;
}

#[tokio::test]
async fn circuit_breaker_trips_then_recovers_after_the_open_duration() {
    let audit_dir = tempfile::tempdir().expect("tempdir");
    let policy = policy_declaring("acknowledge_incident", true);
    let clock = FakeClock::new(time::OffsetDateTime::now_utc());
    let harness = support::boot_with_clock::<FakeLocalModel, FakeResourceMonitor, FakeClock>(
        AutonomyLevel::N2,
        policy,
        None,
        None,
        audit_dir.path(),
        clock.clone(),
    );

    {
        let mut brain = harness.brain.lock().await;
        let now_mono = clock.monotonic();
        for _ in 0..3 {
            brain.record_failure("acknowledge_incident", now_mono);
        }
    }

    support::publish_event(&harness.bus, "metric_threshold_exceeded", EventSeverity::Warning).await;
    let tripped =
        support::wait_for(&harness.bus, ContractKind::Decision, |v| v["decision_type"] == "NO_ACTION").await;
    let reasoning = tripped["reasoning"].as_str().expect("reasoning is a string").to_lowercase();
    assert!(reasoning.contains("circuit breaker"));
    assert!(reasoning.contains("open"));

    clock.advance(Duration::from_secs(601));

    support::publish_event(&harness.bus, "edge_device_offline", EventSeverity::Warning).await;
    let recovered =
        support::wait_for(&harness.bus, ContractKind::Decision, |v| v["decision_type"] == "EXECUTE_SAFE_ACTION").await;
    assert_eq!(recovered["proposed_action"]["action_type"], "acknowledge_incident");
}
