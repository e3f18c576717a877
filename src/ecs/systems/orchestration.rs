use crate::ecs::systems::coordinator::{pick_task_for, ready_workers};
use crate::ecs::systems::TickContext;
use crate::game::assignment;
use crate::game::schedules::schedule_system;
use crate::protocol::{LogCategory, WorkerRef};

/// Autonomous orchestration: recurring schedules, then the AI CEO.
pub fn orchestration_system(ctx: &mut TickContext<'_>) {
    schedule_system(ctx);
    ai_ceo_system(ctx);
}

/// Once bought, the AI CEO puts every idle agent to work, preferring
/// specialty matches. It ignores the per-agent auto-assign switch.
pub fn ai_ceo_system(ctx: &mut TickContext<'_>) {
    if !ctx.state.flags.ai_ceo {
        return;
    }
    let mut assigned = 0;
    for (agent, role, _) in ready_workers(ctx.world) {
        let Some(task) = pick_task_for(ctx.state, role, true) else {
            break;
        };
        if assignment::bind(ctx.world, ctx.state, task, WorkerRef::Agent(agent)).is_ok() {
            assigned += 1;
        }
    }
    if assigned > 0 {
        tracing::debug!(assigned, "ai ceo assignments");
        ctx.state.log_limited(
            "ceo:assign",
            ctx.config.warning_cooldown,
            LogCategory::Agent,
            format!("AI CEO assigned {} agent(s).", assigned),
        );
    }
}
