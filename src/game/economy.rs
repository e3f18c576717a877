use hecs::World;
use serde::{Deserialize, Serialize};

use crate::ecs::components::{AgentStats, GameState, WorkerCore};
use crate::protocol::{EconomySnapshot, WorkerStatus};

use super::agents::{agent_count, AGENT_WORK_MULT};
use super::upgrades::UpgradeId;

// ── Lifestyle tiers ─────────────────────────────────────────────────

pub struct ExpenseTier {
    pub phase: u32,
    pub name: &'static str,
    pub rate: f64,
}

pub const EXPENSE_TIERS: [ExpenseTier; 12] = [
    ExpenseTier { phase: 1, name: "Living in car", rate: 1.0 },
    ExpenseTier { phase: 2, name: "Shared coworking desk", rate: 1.5 },
    ExpenseTier { phase: 3, name: "Pro AI subscription", rate: 2.0 },
    ExpenseTier { phase: 4, name: "Home office", rate: 5.0 },
    ExpenseTier { phase: 5, name: "Small office + tools", rate: 10.0 },
    ExpenseTier { phase: 6, name: "Server costs", rate: 10.0 },
    ExpenseTier { phase: 7, name: "Team management overhead", rate: 18.0 },
    ExpenseTier { phase: 8, name: "Dev infrastructure", rate: 30.0 },
    ExpenseTier { phase: 9, name: "Hosting & deployment", rate: 50.0 },
    ExpenseTier { phase: 10, name: "Swarm compute cluster", rate: 85.0 },
    ExpenseTier { phase: 11, name: "Enterprise operations", rate: 150.0 },
    ExpenseTier { phase: 12, name: "Global AI empire", rate: 250.0 },
];

/// Highest lifestyle tier reached at `phase`.
pub fn expense_tier(phase: u32) -> &'static ExpenseTier {
    EXPENSE_TIERS
        .iter()
        .rev()
        .find(|t| t.phase <= phase)
        .unwrap_or(&EXPENSE_TIERS[0])
}

// ── Services ────────────────────────────────────────────────────────

/// A deployed passive-income service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: u64,
    pub name: String,
    pub income_rate: f64,
    pub active: bool,
}

/// Share of nominal service income actually delivered.
pub fn service_uptime(state: &GameState) -> f64 {
    (1.0 - state.ledger.tech_debt * 0.005 - state.open_incidents() as f64 * 0.05).max(0.5)
}

pub fn service_income_rate(state: &GameState) -> f64 {
    if state.phase < 9 {
        return 0.0;
    }
    let nominal: f64 = state
        .services
        .iter()
        .filter(|s| s.active)
        .map(|s| s.income_rate)
        .sum();
    nominal * service_uptime(state)
}

// ── Rates ───────────────────────────────────────────────────────────

/// Price multiplier for late upgrades, hires and schedules.
pub fn late_cost_multiplier(state: &GameState) -> f64 {
    if state.phase < 5 {
        return 1.0;
    }
    let mut mult = 1.0 + (state.phase - 4) as f64 * 0.12;
    if state.upgrades.has(UpgradeId::GrowthMarketing) {
        mult += 0.1;
    }
    mult
}

pub fn agent_revenue_rate(world: &World, state: &GameState) -> f64 {
    if state.phase < 4 {
        return 0.0;
    }
    let mut per_agent = 1.4 + state.phase as f64 * 0.4;
    if state.upgrades.has(UpgradeId::GrowthMarketing) {
        per_agent *= 1.65;
    }
    agent_count(world) as f64 * per_agent
}

pub fn marketing_revenue_rate(state: &GameState) -> f64 {
    if !state.upgrades.has(UpgradeId::GrowthMarketing) {
        return 0.0;
    }
    4.0 + state.phase as f64 * 1.5
}

/// Cash drained per second. Zero until expenses are revealed.
pub fn expense_rate(world: &World, state: &GameState) -> f64 {
    if !state.flags.expenses_revealed {
        return 0.0;
    }
    expense_tier(state.phase).rate
        + agent_count(world) as f64 * (0.8 + state.phase as f64 * 0.2)
        + state.schedules.len() as f64 * 0.2
        + state.services.len() as f64 * 2.0
}

/// Passive income per second (agents, marketing, services).
pub fn passive_income_rate(world: &World, state: &GameState) -> f64 {
    agent_revenue_rate(world, state) + marketing_revenue_rate(state) + service_income_rate(state)
}

/// Display estimate: passive income plus what working agents will earn
/// at their current pace.
pub fn income_rate(world: &World, state: &GameState) -> f64 {
    let mut rate = passive_income_rate(world, state);
    for (_entity, (stats, core)) in world.query::<(&AgentStats, &WorkerCore)>().iter() {
        if core.status != WorkerStatus::Working {
            continue;
        }
        let Some(task) = core
            .current_task
            .and_then(|id| state.tasks.iter().find(|t| t.id == id))
        else {
            continue;
        };
        let speed = stats.speed * AGENT_WORK_MULT * state.modifiers.agent_speed_mult;
        if speed <= 0.0 {
            continue;
        }
        let seconds = task.remaining() / speed;
        if seconds > 0.0 {
            rate += task.pay * stats.quality * state.modifiers.pay_mult / seconds;
        }
    }
    rate
}

pub fn economy_snapshot(world: &World, state: &GameState) -> EconomySnapshot {
    EconomySnapshot {
        cash: state.ledger.cash,
        tokens: state.ledger.tokens,
        income_per_sec: income_rate(world, state),
        expenditure_per_sec: expense_rate(world, state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::systems::fixture::Fixture;
    use crate::game::agents::hire_agent;
    use crate::protocol::RoleKind;

    #[test]
    fn late_multiplier_kicks_in_at_phase_five() {
        let mut fx = Fixture::at_phase(4);
        assert_eq!(late_cost_multiplier(&fx.state), 1.0);
        fx.state.phase = 7;
        assert!((late_cost_multiplier(&fx.state) - 1.36).abs() < 1e-12);
        fx.state.upgrades.purchased.insert(UpgradeId::GrowthMarketing);
        assert!((late_cost_multiplier(&fx.state) - 1.46).abs() < 1e-12);
    }

    #[test]
    fn expenses_stay_hidden_until_revealed() {
        let mut fx = Fixture::at_phase(4);
        assert_eq!(expense_rate(&fx.world, &fx.state), 0.0);
        fx.state.flags.expenses_revealed = true;
        assert_eq!(expense_rate(&fx.world, &fx.state), 5.0);

        fx.state.ledger.cash = 1000.0;
        hire_agent(&mut fx.ctx(), RoleKind::Writer).unwrap();
        // 5 + 1 * (0.8 + 4 * 0.2)
        assert!((expense_rate(&fx.world, &fx.state) - 6.6).abs() < 1e-12);
    }

    #[test]
    fn uptime_floors_at_half() {
        let mut fx = Fixture::at_phase(9);
        fx.state.ledger.tech_debt = 500.0;
        assert_eq!(service_uptime(&fx.state), 0.5);
        fx.state.ledger.tech_debt = 20.0;
        assert!((service_uptime(&fx.state) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn agent_revenue_starts_at_phase_four() {
        let mut fx = Fixture::at_phase(4);
        fx.state.ledger.cash = 1000.0;
        hire_agent(&mut fx.ctx(), RoleKind::Writer).unwrap();
        assert!((agent_revenue_rate(&fx.world, &fx.state) - 3.0).abs() < 1e-12);
        fx.state.phase = 3;
        assert_eq!(agent_revenue_rate(&fx.world, &fx.state), 0.0);
    }
}
