use crate::ecs::systems::TickContext;
use crate::game::tasks;

/// Runs the spawn system for a single tick.
///
/// Adds one task whenever the spawn interval for the current progress
/// has elapsed since the last spawn, as long as the queue is below its
/// cap. Before the task queue is revealed nothing spawns on its own.
pub fn spawn_system(ctx: &mut TickContext<'_>) {
    let Some(interval) = tasks::spawn_interval(ctx.state) else {
        return;
    };

    let now = ctx.state.clock;
    let due = ctx
        .state
        .timers
        .last_task_spawn
        .map_or(true, |last| now - last >= interval);
    if !due {
        return;
    }

    ctx.state.timers.last_task_spawn = Some(now);
    if let Some(id) = tasks::spawn_task(ctx.state, ctx.rng) {
        tracing::trace!(task = id, "spawned task");
    }
}
