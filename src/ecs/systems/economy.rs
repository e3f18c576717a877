use crate::ecs::components::WorkerCore;
use crate::ecs::systems::TickContext;
use crate::game::economy::{expense_rate, passive_income_rate};
use crate::protocol::WorkerStatus;

pub const DEBT_MIN_PHASE: u32 = 8;
pub const DEBT_PER_WORKING_AGENT: f64 = 0.05;
pub const STRESS_DECAY_PER_SEC: f64 = 0.5;

/// Agent revenue, marketing and service income for `dt` seconds.
pub fn income_system(ctx: &mut TickContext<'_>, dt: f64) {
    let income = passive_income_rate(ctx.world, ctx.state) * dt;
    ctx.state.ledger.earn(income);
}

/// Living costs and upkeep. Cash floors at zero.
pub fn expense_system(ctx: &mut TickContext<'_>, dt: f64) {
    let cost = expense_rate(ctx.world, ctx.state) * dt;
    if cost > 0.0 {
        ctx.state.ledger.drain_cash(cost);
    }
}

/// Tech debt grows with every working agent from phase 8.
pub fn debt_system(ctx: &mut TickContext<'_>, dt: f64) {
    if ctx.state.phase < DEBT_MIN_PHASE {
        return;
    }
    let working = ctx
        .world
        .query::<&WorkerCore>()
        .iter()
        .filter(|(_, core)| core.status == WorkerStatus::Working)
        .count() as f64;
    let growth =
        working * DEBT_PER_WORKING_AGENT * dt * (1.0 - ctx.state.modifiers.debt_reduction);
    ctx.state.ledger.add_debt(growth);
}

pub fn stress_system(ctx: &mut TickContext<'_>, dt: f64) {
    ctx.state.ledger.add_stress(-STRESS_DECAY_PER_SEC * dt);
}
