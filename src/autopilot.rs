//! A very small bot that plays the headless runner: keeps a task in
//! hand, fixes incidents, feeds the AI worker and buys what it can afford.

use one_more_task::game::agents::{agent_count, has_role, hire_cost, role_gate};
use one_more_task::game::economy::late_cost_multiplier;
use one_more_task::game::prestige::retire_blockers;
use one_more_task::game::tasks::oldest_available;
use one_more_task::game::upgrades::{get_upgrade, offered, upgrade_cost, Currency};
use one_more_task::protocol::{Intent, ResolveMethod, RoleKind, TaskStatus, UiReveal, WorkerRef};
use one_more_task::Simulation;

const HIRE_ORDER: [RoleKind; 7] = [
    RoleKind::Writer,
    RoleKind::Researcher,
    RoleKind::Coder,
    RoleKind::Manager,
    RoleKind::TokenManager,
    RoleKind::IncidentResponder,
    RoleKind::Analyst,
];

/// Picks at most one intent per call, in priority order.
pub fn next_intent(sim: &Simulation) -> Option<Intent> {
    let state = sim.state();

    if !state.flags.retired && retire_blockers(sim.world(), state).is_empty() {
        return Some(Intent::Retire);
    }

    if let Some(incident) = state.incidents.iter().find(|i| !i.resolved) {
        let method = if state.ledger.cash >= incident.paid_resolution_cost() {
            ResolveMethod::Cash
        } else {
            ResolveMethod::Manual
        };
        return Some(Intent::ResolveIncident {
            incident: incident.id,
            method,
        });
    }

    let solo = &state.solo;
    if solo.unlocked && solo.core.tank.ratio() < 0.3 && state.ledger.tokens >= 1.0 {
        return Some(Intent::TopUpWorker {
            worker: WorkerRef::Solo,
        });
    }

    if !state.tasks.iter().any(|t| t.status == TaskStatus::Active) {
        if !state.is_revealed(UiReveal::TaskQueue) {
            return Some(Intent::DoEarlyTask);
        }
        if let Some(task) = oldest_available(state) {
            return Some(Intent::ClaimTask { task });
        }
    }

    for id in offered(state) {
        let Some(def) = get_upgrade(id) else {
            continue;
        };
        let cost = upgrade_cost(def, state);
        let affordable = match def.currency {
            Currency::Cash => state.ledger.cash >= cost,
            Currency::Tokens => state.ledger.tokens >= cost,
        };
        if affordable {
            return Some(Intent::BuyUpgrade { upgrade: id });
        }
    }

    if state.phase >= 4 && agent_count(sim.world()) < state.modifiers.agent_slots as usize {
        let cost = hire_cost(agent_count(sim.world()), late_cost_multiplier(state));
        if state.ledger.cash >= cost * 2.0 {
            let role = HIRE_ORDER
                .iter()
                .copied()
                .find(|&r| role_gate(state, r).is_ok() && !has_role(sim.world(), r));
            if let Some(role) = role {
                return Some(Intent::HireAgent { role });
            }
        }
    }

    None
}
