use crate::ecs::systems::TickContext;
use crate::game::assignment;
use crate::protocol::{TaskId, TaskStatus, WorkerStatus};

/// Purges finished tasks and resolved incidents whose grace delay has
/// passed, and expires stale available tasks.
pub fn prune_system(ctx: &mut TickContext<'_>) {
    let now = ctx.state.clock;

    // ── Expiry ───────────────────────────────────────────────────────
    if ctx.state.flags.task_expiry_enabled {
        let max_age = ctx.config.task_expiry_seconds;
        let expired: Vec<TaskId> = ctx
            .state
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Available && now - t.created_at >= max_age)
            .map(|t| t.id)
            .collect();
        for id in &expired {
            assignment::release(ctx.world, ctx.state, *id, WorkerStatus::Idle);
        }
        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "tasks expired");
            ctx.state.tasks.retain(|t| !expired.contains(&t.id));
        }
    }

    // ── Grace removals ───────────────────────────────────────────────
    ctx.state
        .tasks
        .retain(|t| t.remove_at.map_or(true, |at| now < at));
    ctx.state
        .incidents
        .retain(|i| i.remove_at.map_or(true, |at| now < at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::systems::fixture::Fixture;
    use crate::game::tasks::{complete_task, find, generate_task_of};
    use crate::protocol::{TaskTypeKind, WorkerRef};

    fn push_task(fx: &mut Fixture) -> TaskId {
        let task = generate_task_of(&mut fx.state, &mut fx.rng, TaskTypeKind::Email);
        let id = task.id;
        fx.state.tasks.push(task);
        id
    }

    #[test]
    fn expiry_only_touches_available_tasks() {
        let mut fx = Fixture::new();
        fx.state.flags.task_expiry_enabled = true;
        let stale = push_task(&mut fx);
        let worked = push_task(&mut fx);
        assignment::bind(&mut fx.world, &mut fx.state, worked, WorkerRef::Manual).unwrap();

        fx.state.clock = 29.0;
        prune_system(&mut fx.ctx());
        assert!(find(&fx.state, stale).is_some());

        fx.state.clock = 30.0;
        prune_system(&mut fx.ctx());
        assert!(find(&fx.state, stale).is_none());
        assert!(find(&fx.state, worked).is_some());
    }

    #[test]
    fn no_expiry_until_enabled() {
        let mut fx = Fixture::new();
        let id = push_task(&mut fx);
        fx.state.clock = 500.0;
        prune_system(&mut fx.ctx());
        assert!(find(&fx.state, id).is_some());
    }

    #[test]
    fn done_tasks_leave_after_grace() {
        let mut fx = Fixture::new();
        let id = push_task(&mut fx);
        assignment::bind(&mut fx.world, &mut fx.state, id, WorkerRef::Manual).unwrap();
        complete_task(&mut fx.ctx(), id);

        prune_system(&mut fx.ctx());
        assert!(find(&fx.state, id).is_some());
        fx.state.clock = 0.3;
        prune_system(&mut fx.ctx());
        assert!(find(&fx.state, id).is_none());
    }
}
