// system-tests/tests/support/mod.rs
// ============================================================================
// Module: Pipeline Harness
// Description: Boots Guardian, Brain, the Approval Coordinator, and
//              Commander against one in-process Bus, mirroring
//              orion-cli::pipeline::run, for cross-component scenario tests.
// Dependencies: orion-approval, orion-audit, orion-brain, orion-bus,
//               orion-commander, orion-core, orion-council, orion-guardian,
//               orion-policy, tokio
// ============================================================================

#![allow(dead_code, reason = "not every test file exercises every helper")]

use std::sync::Arc;
use std::time::Duration;

use orion_approval::AdminIdentity;
use orion_approval::ApprovalCoordinator;
use orion_approval::ApprovalService;
use orion_approval::Channel;
use orion_audit::AuditStore;
use orion_brain::brain::Brain;
use orion_bus::Bus;
use orion_bus::BusConfig;
use orion_bus::Subscription;
use orion_commander::executor::Executor;
use orion_core::ContractKind;
use orion_core::clock::Clock;
use orion_core::clock::SystemClock;
use orion_core::contracts::AutonomyLevel;
use orion_core::contracts::Event;
use orion_core::severity::EventSeverity;
use orion_council::Council;
use orion_council::LocalModel;
use orion_council::ResourceMonitor;
use orion_guardian::correlator::Correlator;
use orion_policy::PolicyStore;
use serde_json::Value;
use tokio::task::JoinHandle;

/// Poll interval the test bus uses; short so tests don't pay the production
/// 50ms default on every hop of a multi-stage pipeline.
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How long `wait_for` polls before giving up.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// A fully wired pipeline: Guardian -> Brain -> (Council) -> Approval ->
/// Commander, sharing one bus. Dropping this harness cancels every
/// subscription and aborts every background task.
pub struct Harness<M, R>
where
    M: LocalModel + 'static,
    R: ResourceMonitor + 'static,
{
    pub bus: Bus,
    pub audit: Arc<AuditStore>,
    pub approval: ApprovalService,
    pub brain: Arc<tokio::sync::Mutex<Brain<M, R>>>,
    subs: Vec<Subscription>,
    tasks: Vec<JoinHandle<()>>,
}

impl<M, R> Drop for Harness<M, R>
where
    M: LocalModel,
    R: ResourceMonitor,
{
    fn drop(&mut self) {
        for sub in &self.subs {
            sub.cancel();
        }
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Builds a [`Harness`] with every component wired against a fresh bus and a
/// fresh audit directory, the way `orion-cli run` does, using the system
/// clock. Use [`boot_with_clock`] when a scenario needs to fast-forward
/// monotonic time (e.g. past a circuit breaker's open duration) without a
/// real sleep.
pub fn boot<M, R>(
    autonomy: AutonomyLevel,
    policy: PolicyStore,
    council: Option<Council<M, R>>,
    approval_timeout: Option<Duration>,
    audit_dir: &std::path::Path,
) -> Harness<M, R>
where
    M: LocalModel + 'static,
    R: ResourceMonitor + 'static,
{
    boot_with_clock(autonomy, policy, council, approval_timeout, audit_dir, SystemClock)
}

/// As [`boot`], but with an explicit, injectable [`Clock`].
pub fn boot_with_clock<M, R, C>(
    autonomy: AutonomyLevel,
    policy: PolicyStore,
    council: Option<Council<M, R>>,
    approval_timeout: Option<Duration>,
    audit_dir: &std::path::Path,
    clock: C,
) -> Harness<M, R>
where
    M: LocalModel + 'static,
    R: ResourceMonitor + 'static,
    C: Clock + Clone + 'static,
{
    let bus = Bus::new(BusConfig { poll_interval: TEST_POLL_INTERVAL, ..BusConfig::default() });
    let audit = Arc::new(AuditStore::open(audit_dir).expect("open audit store"));

    let correlator = Correlator::new(orion_guardian::correlator::DEFAULT_BUFFER_SIZE, orion_guardian::correlator::DEFAULT_WINDOW_SECONDS);
    let (guardian_sub, guardian_task) = orion_guardian::spawn(&bus, correlator);

    let mut brain = Brain::new(autonomy, policy.clone());
    if let Some(timeout) = approval_timeout {
        brain = brain.with_approval_timeout(timeout);
    }
    if let Some(council) = council {
        brain = brain.with_council(council);
    }
    let (brain_handle, brain_sub, brain_task) = orion_brain::spawn(&bus, brain, clock.clone());

    let admin_identity = AdminIdentity::new(Some("test-chat-id".to_string()), Some("test-admin".to_string())).expect("admin identity");
    let coordinator = ApprovalCoordinator::new(admin_identity).with_audit(Arc::clone(&audit));
    let (approval, approval_sub, approval_subscribe_task, approval_sweep_task) = orion_approval::spawn(&bus, coordinator, clock.clone());

    let executor = Executor::new(policy);
    let (commander_decision_sub, commander_decision_task, commander_approval_sub, commander_approval_task) =
        orion_commander::spawn(&bus, executor, clock, None);

    Harness {
        bus,
        audit,
        approval,
        brain: brain_handle,
        subs: vec![guardian_sub, brain_sub, approval_sub, commander_decision_sub, commander_approval_sub],
        tasks: vec![guardian_task, brain_task, approval_subscribe_task, approval_sweep_task, commander_decision_task, commander_approval_task],
    }
}

/// The CLI channel admin identity [`boot`] configures.
pub const ADMIN_IDENTITY: &str = "test-admin";
/// The channel [`boot`]'s admin identity answers to.
pub const ADMIN_CHANNEL: Channel = Channel::Cli;

/// Publishes a single event with the given severity and type.
pub async fn publish_event(bus: &Bus, event_type: &str, severity: EventSeverity) -> Event {
    let event = Event::new("test-watcher", event_type, severity, serde_json::json!({}), time::OffsetDateTime::now_utc());
    bus.publish(&event).await.expect("publish event");
    event
}

/// Polls `kind`'s stream from offset 0 until at least one entry satisfies
/// `pred`, returning the first match, or panics after [`DEFAULT_WAIT_TIMEOUT`].
pub async fn wait_for(bus: &Bus, kind: ContractKind, pred: impl Fn(&Value) -> bool) -> Value {
    wait_for_timeout(bus, kind, DEFAULT_WAIT_TIMEOUT, pred).await.unwrap_or_else(|| {
        panic!("timed out waiting for a matching {kind:?} message")
    })
}

/// As [`wait_for`], but returns `None` on timeout instead of panicking.
pub async fn wait_for_timeout(bus: &Bus, kind: ContractKind, timeout: Duration, pred: impl Fn(&Value) -> bool) -> Option<Value> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let entries = bus.read(kind, 0, 1024).await;
        if let Some(found) = entries.iter().find(|entry| pred(entry)) {
            return Some(found.clone());
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(TEST_POLL_INTERVAL).await;
    }
}

/// Asserts that no message on `kind`'s stream satisfies `pred` after waiting
/// out a short grace period — used for negative assertions ("no
/// approval_request was published").
pub async fn assert_never(bus: &Bus, kind: ContractKind, grace: Duration, pred: impl Fn(&Value) -> bool) {
    tokio::time::sleep(grace).await;
    let entries = bus.read(kind, 0, 1024).await;
    assert!(!entries.iter().any(pred), "expected no matching {kind:?} message, but one was found");
}
