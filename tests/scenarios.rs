//! End-to-end scenarios driven through the public `Simulation` API.

use one_more_task::game::incidents::{template, Incident};
use one_more_task::game::tasks::{self, Task};
use one_more_task::game::upgrades::UpgradeId;
use one_more_task::protocol::{
    IncidentKind, Intent, ResolveMethod, TaskStatus, TaskTypeKind, WorkerRef, WorkerStatus,
    WorldSnapshot,
};
use one_more_task::{IntentError, SimConfig, Simulation};

fn config() -> SimConfig {
    SimConfig {
        seed: 42,
        ..SimConfig::default()
    }
}

/// Builds a simulation from a tweaked fresh snapshot.
fn sim_with(edit: impl FnOnce(&mut WorldSnapshot)) -> Simulation {
    let mut snapshot = Simulation::new(config()).unwrap().snapshot();
    edit(&mut snapshot);
    Simulation::restore(snapshot, config()).unwrap()
}

fn plain_task(id: u64, work: f64, pay: f64, rep: f64) -> Task {
    Task {
        id,
        kind: TaskTypeKind::Email,
        client: "Greg".into(),
        work_required: work,
        work_done: 0.0,
        pay,
        reputation_reward: rep,
        status: TaskStatus::Available,
        created_at: 0.0,
        assigned: None,
        remove_at: None,
    }
}

#[test]
fn manual_task_pays_out_and_leaves_after_grace() {
    let mut sim = sim_with(|s| s.state.tasks.push(plain_task(500, 10.0, 5.0, 2.0)));
    let cash = sim.state().ledger.cash;
    let rep = sim.state().ledger.reputation;

    sim.apply(Intent::ClaimTask { task: 500 }).unwrap();
    assert_eq!(
        sim.apply(Intent::ClaimTask { task: 500 }),
        Err(IntentError::TaskNotAvailable(500))
    );

    let mut seen_done = false;
    for _ in 0..60 {
        sim.advance(0.1);
        if let Some(task) = tasks::find(sim.state(), 500) {
            if task.status == TaskStatus::Done {
                seen_done = true;
                assert_eq!(task.work_done, task.work_required);
            }
        }
    }

    assert!(seen_done);
    assert!(tasks::find(sim.state(), 500).is_none());
    assert!((sim.state().ledger.cash - cash - 5.0).abs() < 1e-9);
    assert_eq!(sim.state().ledger.reputation - rep, 2.0);
    assert_eq!(sim.state().ledger.total_tasks_done, 1);
}

#[test]
fn dry_solo_worker_does_nothing_and_complains_once() {
    let mut sim = sim_with(|s| {
        s.state.phase = 3;
        s.state.ledger.tokens = 0.0;
        s.state.solo.unlocked = true;
        s.state.solo.core.tank.level = 0.0;
        s.state.tasks.push(plain_task(500, 10.0, 5.0, 2.0));
    });

    for _ in 0..50 {
        sim.advance(0.1);
    }

    let task = tasks::find(sim.state(), 500).unwrap();
    assert_eq!(task.work_done, 0.0);
    assert_eq!(task.status, TaskStatus::Available);
    assert_eq!(sim.state().solo.core.status, WorkerStatus::Stalled);
    assert_eq!(sim.state().log.count_matching("stalled"), 1);

    // Topping up with no tokens is refused without touching the tank.
    assert!(matches!(
        sim.apply(Intent::TopUpWorker { worker: WorkerRef::Solo }),
        Err(IntentError::InsufficientTokens { .. })
    ));
    assert_eq!(sim.state().solo.core.tank.level, 0.0);
}

#[test]
fn upgrade_with_unmet_prerequisites_changes_nothing() {
    let mut sim = sim_with(|s| s.state.ledger.cash = 1_000.0);
    let modifiers = sim.state().modifiers.clone();

    let result = sim.apply(Intent::BuyUpgrade {
        upgrade: UpgradeId::PostItNotes,
    });
    assert!(matches!(result, Err(IntentError::PrerequisiteUnmet(_))));
    assert_eq!(sim.state().ledger.cash, 1_000.0);
    assert!(!sim.state().upgrades.has(UpgradeId::PostItNotes));
    assert_eq!(sim.state().modifiers, modifiers);
}

#[test]
fn paid_resolution_costs_double_and_clears_after_grace() {
    let mut sim = sim_with(|s| {
        s.state.ledger.cash = 100.0;
        s.state
            .incidents
            .push(Incident::from_template(900, template(IncidentKind::Outage), 0.0));
    });
    assert_eq!(sim.state().incidents[0].cash_cost, 20.0);

    sim.apply(Intent::ResolveIncident {
        incident: 900,
        method: ResolveMethod::Cash,
    })
    .unwrap();
    assert_eq!(sim.state().ledger.cash, 60.0);
    assert!(sim.state().incidents[0].resolved);
    assert_eq!(sim.state().open_incidents(), 0);

    assert_eq!(
        sim.apply(Intent::ResolveIncident {
            incident: 900,
            method: ResolveMethod::Cash,
        }),
        Err(IntentError::AlreadyResolved(900))
    );

    sim.advance(0.2);
    assert_eq!(sim.state().incidents.len(), 1);
    sim.advance(0.5);
    assert!(sim.state().incidents.is_empty());
    assert_eq!(sim.state().ledger.cash, 60.0);
}

#[test]
fn zero_tick_config_is_refused_instead_of_spinning() {
    let config = SimConfig {
        tick_seconds: 0.0,
        ..config()
    };
    assert!(Simulation::new(config).is_err());
}

#[test]
fn snapshot_survives_a_msgpack_round_trip() {
    let mut sim = sim_with(|s| s.state.tasks.push(plain_task(500, 10.0, 5.0, 2.0)));
    sim.apply(Intent::ClaimTask { task: 500 }).unwrap();
    sim.advance(1.0);

    let bytes = rmp_serde::to_vec_named(&sim.snapshot()).unwrap();
    let snapshot: WorldSnapshot = rmp_serde::from_slice(&bytes).unwrap();
    let mut restored = Simulation::restore(snapshot, config()).unwrap();

    let task = tasks::find(restored.state(), 500).unwrap();
    assert_eq!(task.status, TaskStatus::Active);
    assert!(task.work_done > 0.0);
    restored.advance(5.0);
    assert_eq!(restored.state().ledger.total_tasks_done, 1);
}
