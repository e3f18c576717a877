//! Invariants that must hold for any sequence of intents and ticks.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use one_more_task::game::agents::agent_ids;
use one_more_task::game::tokens::{failure_chance, TokenTank};
use one_more_task::game::upgrades::offered;
use one_more_task::protocol::{Intent, ResolveMethod, RoleKind, TaskStatus, WorkerRef};
use one_more_task::{SimConfig, Simulation};

#[derive(Debug, Clone)]
enum Op {
    Advance(f64),
    Claim(usize),
    AiAssist(usize),
    Hire(usize),
    Fire(usize),
    Assign(usize, usize),
    TopUp(usize),
    Shutdown(usize),
    Buy(usize),
    Resolve(usize, bool),
    AddSchedule,
}

const ROLES: [RoleKind; 6] = [
    RoleKind::Writer,
    RoleKind::Researcher,
    RoleKind::Coder,
    RoleKind::Manager,
    RoleKind::TokenManager,
    RoleKind::IncidentResponder,
];

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0.0f64..3.0).prop_map(Op::Advance),
        2 => any::<usize>().prop_map(Op::Claim),
        2 => any::<usize>().prop_map(Op::AiAssist),
        1 => any::<usize>().prop_map(Op::Hire),
        1 => any::<usize>().prop_map(Op::Fire),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(a, t)| Op::Assign(a, t)),
        1 => any::<usize>().prop_map(Op::TopUp),
        1 => any::<usize>().prop_map(Op::Shutdown),
        1 => any::<usize>().prop_map(Op::Buy),
        1 => (any::<usize>(), any::<bool>()).prop_map(|(i, c)| Op::Resolve(i, c)),
        1 => Just(Op::AddSchedule),
    ]
}

/// A mid-game world with money, tokens and an unlocked AI worker.
fn mid_game(seed: u64) -> Simulation {
    let config = SimConfig {
        seed,
        ..SimConfig::default()
    };
    let mut snapshot = Simulation::new(config.clone()).unwrap().snapshot();
    let state = &mut snapshot.state;
    state.phase = 7;
    state.ledger.cash = 20_000.0;
    state.ledger.tokens = 2_000.0;
    state.ledger.total_tasks_done = 100;
    state.solo.unlocked = true;
    state.flags.manager_unlocked = true;
    let mut sim = Simulation::restore(snapshot, config).unwrap();
    sim.advance(1.0);
    sim
}

fn pick<T: Copy>(items: &[T], i: usize) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[i % items.len()])
    }
}

fn intent_for(sim: &Simulation, op: &Op) -> Option<Intent> {
    let state = sim.state();
    let task_ids: Vec<u64> = state.tasks.iter().map(|t| t.id).collect();
    let agents = agent_ids(sim.world());
    let mut workers: Vec<WorkerRef> = agents.iter().map(|&a| WorkerRef::Agent(a)).collect();
    workers.push(WorkerRef::Solo);

    Some(match *op {
        Op::Advance(_) => return None,
        Op::Claim(i) => Intent::ClaimTask { task: pick(&task_ids, i)? },
        Op::AiAssist(i) => Intent::AiAssist { task: pick(&task_ids, i)? },
        Op::Hire(i) => Intent::HireAgent { role: ROLES[i % ROLES.len()] },
        Op::Fire(i) => Intent::FireAgent { agent: pick(&agents, i)? },
        Op::Assign(a, t) => Intent::AssignAgent {
            agent: pick(&agents, a)?,
            task: pick(&task_ids, t)?,
        },
        Op::TopUp(i) => Intent::TopUpWorker { worker: pick(&workers, i)? },
        Op::Shutdown(i) => Intent::ShutdownWorker { worker: pick(&workers, i)? },
        Op::Buy(i) => Intent::BuyUpgrade { upgrade: pick(&offered(state), i)? },
        Op::Resolve(i, cash) => {
            let ids: Vec<u64> = state.incidents.iter().map(|x| x.id).collect();
            Intent::ResolveIncident {
                incident: pick(&ids, i)?,
                method: if cash { ResolveMethod::Cash } else { ResolveMethod::Manual },
            }
        }
        Op::AddSchedule => Intent::AddSchedule,
    })
}

fn check_invariants(sim: &Simulation) -> Result<(), TestCaseError> {
    let state = sim.state();
    let l = &state.ledger;
    for (name, v) in [
        ("cash", l.cash),
        ("tokens", l.tokens),
        ("reputation", l.reputation),
        ("tech_debt", l.tech_debt),
        ("stress", l.stress),
    ] {
        prop_assert!(v >= 0.0 && v.is_finite(), "{} = {}", name, v);
    }
    prop_assert!(l.stress <= 100.0);

    for task in &state.tasks {
        prop_assert!(task.work_done >= 0.0);
        prop_assert!(task.work_done <= task.work_required);
        prop_assert_eq!(
            task.work_done == task.work_required,
            task.status == TaskStatus::Done,
            "task {} at {}/{} is {:?}",
            task.id,
            task.work_done,
            task.work_required,
            task.status
        );
    }

    // Both sides of every assignment agree.
    let snapshot = sim.snapshot();
    let mut holders: Vec<(WorkerRef, Option<u64>)> = snapshot
        .agents
        .iter()
        .map(|a| (WorkerRef::Agent(a.id), a.current_task))
        .collect();
    holders.push((WorkerRef::Solo, state.solo.core.current_task));
    for (worker, held) in &holders {
        if let Some(task_id) = held {
            let task = state.tasks.iter().find(|t| t.id == *task_id);
            prop_assert!(task.is_some(), "{:?} holds missing task {}", worker, task_id);
            prop_assert_eq!(task.and_then(|t| t.assigned), Some(*worker));
        }
    }
    for task in &state.tasks {
        match task.assigned {
            None | Some(WorkerRef::Manual) => {}
            Some(worker) => {
                let held = holders.iter().find(|(w, _)| *w == worker).and_then(|(_, h)| *h);
                prop_assert_eq!(held, Some(task.id), "task {} not mirrored", task.id);
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn invariants_hold_under_any_intent_sequence(
        seed in 0u64..1_000,
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let mut sim = mid_game(seed);
        check_invariants(&sim)?;
        for op in &ops {
            if let Op::Advance(dt) = op {
                sim.advance(*dt);
            } else if let Some(intent) = intent_for(&sim, op) {
                let _ = sim.apply(intent);
            }
            check_invariants(&sim)?;
        }
    }

    #[test]
    fn rejected_intents_leave_the_ledger_alone(
        seed in 0u64..1_000,
        task in 10_000u64..20_000,
    ) {
        let mut sim = mid_game(seed);
        let before = sim.state().ledger.clone();
        let claimed = sim.apply(Intent::ClaimTask { task });
        prop_assert!(claimed.is_err());
        let fired = sim.apply(Intent::FireAgent { agent: task });
        prop_assert!(fired.is_err());
        prop_assert_eq!(&sim.state().ledger, &before);
    }

    #[test]
    fn drain_is_time_proportional(
        level in 0.0f64..100.0,
        rate in 0.01f64..10.0,
        dt in 0.001f64..5.0,
    ) {
        let mut tank = TokenTank { level, capacity: 100.0 };
        let sustained = tank.drain(rate, dt);
        let expected = level.min(rate * dt);
        prop_assert!((level - tank.level - expected).abs() < 1e-9);
        prop_assert!((sustained - expected / (rate * dt)).abs() < 1e-9);
        prop_assert!(tank.level >= 0.0);
    }

    #[test]
    fn failure_chance_composes_over_split_intervals(
        rate in 0.0f64..1.0,
        dt in 0.01f64..10.0,
        parts in 1u32..20,
    ) {
        let whole = failure_chance(rate, dt);
        let survive_parts = (0..parts)
            .map(|_| 1.0 - failure_chance(rate, dt / parts as f64))
            .product::<f64>();
        prop_assert!((whole - (1.0 - survive_parts)).abs() < 1e-9);
        prop_assert!((0.0..=1.0).contains(&whole));
    }
}

/// Empirical failure frequency when rolling every small sub-step matches
/// the closed form for the whole interval.
#[test]
fn failure_odds_converge_under_monte_carlo() {
    let mut rng = StdRng::seed_from_u64(2024);
    let trials = 20_000;
    for &(rate, dt) in &[(0.18, 0.1), (0.18, 5.0), (0.5, 3.0)] {
        let steps = 50;
        let step_chance = failure_chance(rate, dt / steps as f64);
        let failures = (0..trials)
            .filter(|_| (0..steps).any(|_| rng.gen::<f64>() < step_chance))
            .count();
        let observed = failures as f64 / trials as f64;
        let expected = failure_chance(rate, dt);
        assert!(
            (observed - expected).abs() < 0.015,
            "rate {} dt {}: observed {} expected {}",
            rate,
            dt,
            observed,
            expected
        );
    }
    // rate * dt would exceed 1 here; the closed form stays a probability.
    assert!(failure_chance(0.5, 3.0) < 1.0);
}
