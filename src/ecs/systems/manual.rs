use crate::ecs::systems::{TickContext, WorkerModel};
use crate::game::tasks::complete_task;
use crate::protocol::{TaskId, TaskStatus};

/// Seconds of effort per unit of work at click power 1.
pub const MANUAL_SECONDS_PER_UNIT: f64 = 0.5;
/// Stress per second per concurrently active manual task.
pub const MANUAL_STRESS_PER_SEC: f64 = 0.6;

/// The player's own hands. Works every `Active` task at once.
pub struct ManualWorker;

impl WorkerModel for ManualWorker {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn step_tick(&self, ctx: &mut TickContext<'_>, dt: f64) {
        let rate = ctx.state.modifiers.click_power / MANUAL_SECONDS_PER_UNIT;
        let mut active = 0usize;
        let mut finished: Vec<TaskId> = Vec::new();

        for task in ctx
            .state
            .tasks
            .iter_mut()
            .filter(|t| t.status == TaskStatus::Active)
        {
            active += 1;
            if task.add_work(rate * dt) {
                finished.push(task.id);
            }
        }
        if active == 0 {
            return;
        }

        ctx.state
            .ledger
            .add_stress(MANUAL_STRESS_PER_SEC * dt * active as f64);
        for id in finished {
            complete_task(ctx, id);
        }
    }
}
