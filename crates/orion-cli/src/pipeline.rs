// crates/orion-cli/src/pipeline.rs
// ============================================================================
// Module: Pipeline Wiring
// Description: Boots every pipeline component against one Bus and runs the
//              admin loop until stdin closes.
// Purpose: Implement spec.md §5-§6's process wiring.
// Dependencies: orion-approval, orion-audit, orion-brain, orion-bus,
//               orion-commander, orion-council, orion-core, orion-guardian,
//               orion-policy, tokio, tracing
// ============================================================================

use std::sync::Arc;

use orion_approval::ApprovalCoordinator;
use orion_approval::AdminIdentity;
use orion_brain::brain::Brain;
use orion_bus::Bus;
use orion_bus::BusConfig;
use orion_commander::executor::Executor;
use orion_core::clock::SystemClock;
use orion_core::contracts::AutonomyLevel;
use orion_council::Aggregator;
use orion_council::Council;
use orion_council::ExternalValidator;
use orion_council::LocalValidator;
use orion_council::NullLocalModel;
use orion_council::SysinfoResourceMonitor;
use orion_guardian::correlator::Correlator;
use orion_policy::PolicyStore;

use crate::RunArgs;
use crate::admin;
use crate::audit_mirror;
use crate::error::CliError;

/// Boots the full pipeline and drives the admin loop against stdin until
/// EOF, then shuts every subscription down.
pub async fn run(args: RunArgs) -> Result<(), CliError> {
    let autonomy: AutonomyLevel = args.autonomy.into();
    let policy = args.policy.as_deref().map_or_else(PolicyStore::empty, PolicyStore::load);
    let admin_identity = AdminIdentity::load(&args.admin_identity)?;
    let audit = Arc::new(orion_audit::AuditStore::open(&args.audit_dir)?);

    let bus = Bus::new(BusConfig::default());
    let clock = SystemClock;

    let correlator = Correlator::new(
        orion_guardian::correlator::DEFAULT_BUFFER_SIZE,
        orion_guardian::correlator::DEFAULT_WINDOW_SECONDS,
    );
    let (guardian_sub, guardian_task) = orion_guardian::spawn(&bus, correlator);

    let mut brain: Brain<NullLocalModel, SysinfoResourceMonitor> = Brain::new(autonomy, policy.clone());
    if args.enable_council {
        let local = LocalValidator::new(NullLocalModel, SysinfoResourceMonitor::new());
        let council = Council::new(local, ExternalValidator::from_env(), Aggregator::default());
        brain = brain.with_council(council);
    }
    let (brain_handle, brain_sub, brain_task) = orion_brain::spawn(&bus, brain, clock);

    let coordinator = ApprovalCoordinator::new(admin_identity).with_audit(Arc::clone(&audit));
    let (service, approval_sub, approval_subscribe_task, approval_sweep_task) =
        orion_approval::spawn(&bus, coordinator, clock);

    let feedback_handle = Arc::clone(&brain_handle);
    let (feedback_tx, mut feedback_rx) = tokio::sync::mpsc::unbounded_channel::<(String, bool)>();
    let feedback_task = tokio::spawn(async move {
        while let Some((action_type, succeeded)) = feedback_rx.recv().await {
            let mut brain = feedback_handle.lock().await;
            if succeeded {
                brain.record_success(&action_type);
            } else {
                brain.record_failure(&action_type, std::time::Instant::now());
            }
        }
    });
    let feedback: orion_commander::BreakerFeedback = Arc::new(move |action_type: &str, succeeded: bool| {
        let _ = feedback_tx.send((action_type.to_string(), succeeded));
    });

    let executor = Executor::new(policy);
    let (commander_decision_sub, commander_decision_task, commander_approval_sub, commander_approval_task) =
        orion_commander::spawn(&bus, executor, clock, Some(feedback));

    let mirror_subs = audit_mirror::spawn(&bus, Arc::clone(&audit), &clock);

    tracing::info!(autonomy = ?autonomy, "orion pipeline running; reading admin commands from stdin");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let result = admin::run_loop(service, stdin).await;

    guardian_sub.cancel();
    brain_sub.cancel();
    approval_sub.cancel();
    commander_decision_sub.cancel();
    commander_approval_sub.cancel();
    for (sub, _) in &mirror_subs {
        sub.cancel();
    }
    for task in [
        guardian_task,
        brain_task,
        approval_subscribe_task,
        approval_sweep_task,
        commander_decision_task,
        commander_approval_task,
        feedback_task,
    ] {
        task.abort();
    }
    for (_, task) in mirror_subs {
        task.abort();
    }

    result
}
