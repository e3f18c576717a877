use hecs::World;
use serde::{Deserialize, Serialize};

use crate::ecs::components::GameState;
use crate::ecs::systems::TickContext;
use crate::error::IntentError;
use crate::protocol::{LogCategory, LogEntry, UiReveal};

use super::economy::{expense_rate, income_rate};
use super::milestones::{all_milestones, Trigger};
use super::tasks;

pub const PRESTIGE_PHASE: u32 = 12;
pub const RETIRE_MIN_REP: f64 = 200.0;
pub const RETIRE_MAX_DEBT: f64 = 10.0;

/// Bonuses that survive a prestige reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrestigeState {
    pub count: u32,
    pub bonus_click: f64,
    pub bonus_tokens: f64,
    pub bonus_slot: bool,
}

const ONBOARDING_REVEALS: [UiReveal; 10] = [
    UiReveal::TopBar,
    UiReveal::Cash,
    UiReveal::TaskQueue,
    UiReveal::Reputation,
    UiReveal::Stress,
    UiReveal::Upgrades,
    UiReveal::Log,
    UiReveal::Expenses,
    UiReveal::ExpenseCard,
    UiReveal::Income,
];

/// Resets the run, keeping the accumulated prestige bonuses. The log,
/// the sim clock and the id counter carry over.
pub fn prestige(ctx: &mut TickContext<'_>) -> Result<LogEntry, IntentError> {
    if ctx.state.phase < PRESTIGE_PHASE {
        return Err(IntentError::PhaseLocked {
            need: PRESTIGE_PHASE,
        });
    }

    let old = &ctx.state.prestige;
    let carried = PrestigeState {
        count: old.count + 1,
        bonus_click: old.bonus_click + 1.0,
        bonus_tokens: old.bonus_tokens + 50.0 + old.count as f64 * 25.0,
        bonus_slot: true,
    };

    let mut fresh = GameState::new(ctx.config.log_capacity);
    fresh.tick = ctx.state.tick;
    fresh.clock = ctx.state.clock;
    fresh.id_counter = ctx.state.id_counter;
    std::mem::swap(&mut fresh.log, &mut ctx.state.log);

    fresh.modifiers.click_power = 1.0 + carried.bonus_click;
    fresh.ledger.tokens = carried.bonus_tokens;
    fresh.modifiers.agent_slots = if carried.bonus_slot { 3 } else { 2 };
    for reveal in ONBOARDING_REVEALS {
        fresh.reveal(reveal);
    }
    fresh.flags.expenses_revealed = true;
    fresh.flags.task_expiry_enabled = true;
    fresh.flags.incidents_explained = true;
    for def in all_milestones() {
        if matches!(def.trigger, Trigger::TasksDone(_)) {
            fresh.milestones.reached.insert(def.id);
        }
    }
    fresh.prestige = carried;

    *ctx.state = fresh;
    ctx.world.clear();

    tracing::info!(count = ctx.state.prestige.count, "prestige reset");
    let entry = ctx.state.log(
        LogCategory::Progression,
        format!(
            "PRESTIGE #{}! New cycle begins with bonuses.",
            ctx.state.prestige.count
        ),
    );
    for _ in 0..3 {
        tasks::spawn_task(ctx.state, ctx.rng);
    }
    Ok(entry)
}

/// Unmet conditions for the true ending, empty when retiring is allowed.
pub fn retire_blockers(world: &World, state: &GameState) -> Vec<String> {
    let mut blockers = Vec::new();
    if state.phase < PRESTIGE_PHASE {
        blockers.push(format!("reach phase {}", PRESTIGE_PHASE));
    }
    if state.ledger.reputation < RETIRE_MIN_REP {
        blockers.push(format!("reputation {:.0}/{}", state.ledger.reputation, RETIRE_MIN_REP));
    }
    if state.ledger.tech_debt >= RETIRE_MAX_DEBT {
        blockers.push(format!("tech debt {:.0}/{}", state.ledger.tech_debt, RETIRE_MAX_DEBT));
    }
    if state.open_incidents() > 0 {
        blockers.push("open incidents".into());
    }
    if income_rate(world, state) <= expense_rate(world, state) * 2.0 {
        blockers.push("income must exceed twice expenses".into());
    }
    blockers
}

/// The true ending. Freezes nothing; the runner decides what to do with
/// a retired run.
pub fn retire(ctx: &mut TickContext<'_>) -> Result<LogEntry, IntentError> {
    if ctx.state.flags.retired {
        return Err(IntentError::NothingToDo("already retired".into()));
    }
    let blockers = retire_blockers(ctx.world, ctx.state);
    if !blockers.is_empty() {
        return Err(IntentError::PrerequisiteUnmet(blockers.join(", ")));
    }
    ctx.state.flags.retired = true;
    tracing::info!(
        earned = ctx.state.ledger.total_cash_earned,
        tasks = ctx.state.ledger.total_tasks_done,
        "retired"
    );
    ctx.state.notify(
        "You Walked Away",
        format!(
            "Your empire runs itself. {} tasks, ${:.0} earned.",
            ctx.state.ledger.total_tasks_done, ctx.state.ledger.total_cash_earned
        ),
    );
    Ok(ctx
        .state
        .log(LogCategory::Progression, "Retired. The work goes on without you."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::systems::fixture::Fixture;
    use crate::game::agents::{agent_count, hire_agent};
    use crate::game::milestones::MilestoneId;
    use crate::protocol::RoleKind;

    #[test]
    fn prestige_requires_final_phase() {
        let mut fx = Fixture::at_phase(11);
        assert_eq!(
            prestige(&mut fx.ctx()),
            Err(IntentError::PhaseLocked { need: 12 })
        );
    }

    #[test]
    fn prestige_resets_and_carries_bonuses() {
        let mut fx = Fixture::at_phase(12);
        fx.state.ledger.cash = 50_000.0;
        fx.state.ledger.total_tasks_done = 900;
        hire_agent(&mut fx.ctx(), RoleKind::Writer).unwrap();
        fx.state.clock = 1234.0;

        prestige(&mut fx.ctx()).unwrap();
        assert_eq!(fx.state.phase, 1);
        assert_eq!(fx.state.ledger.cash, 0.0);
        assert_eq!(fx.state.ledger.tokens, 50.0);
        assert_eq!(fx.state.modifiers.click_power, 2.0);
        assert_eq!(fx.state.modifiers.agent_slots, 3);
        assert_eq!(fx.state.clock, 1234.0);
        assert_eq!(agent_count(&fx.world), 0);
        assert_eq!(fx.state.tasks.len(), 3);
        assert!(fx.state.milestones.has(MilestoneId::ExpensesUnlock));
        assert!(!fx.state.milestones.has(MilestoneId::TokensUnlock));
        assert!(fx.state.flags.incidents_explained);

        fx.state.phase = 12;
        prestige(&mut fx.ctx()).unwrap();
        assert_eq!(fx.state.prestige.count, 2);
        assert_eq!(fx.state.ledger.tokens, 125.0);
        assert_eq!(fx.state.modifiers.click_power, 3.0);
    }

    #[test]
    fn retire_checks_every_condition() {
        let mut fx = Fixture::at_phase(12);
        fx.state.ledger.reputation = 500.0;
        assert!(matches!(
            retire(&mut fx.ctx()),
            Err(IntentError::PrerequisiteUnmet(_))
        ));
        assert!(!fx.state.flags.retired);

        fx.state.services.push(crate::game::economy::Service {
            id: 99,
            name: "Content Engine v1".into(),
            income_rate: 5.0,
            active: true,
        });
        retire(&mut fx.ctx()).unwrap();
        assert!(fx.state.flags.retired);
    }
}
