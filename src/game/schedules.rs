use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ecs::components::{AgentName, AgentRole, WorkerCore};
use crate::ecs::systems::TickContext;
use crate::error::IntentError;
use crate::protocol::{AgentId, LogCategory, LogEntry, ScheduleId, TaskTypeKind, WorkerRef, WorkerStatus};

use super::agents::{agent_ids, find_agent};
use super::assignment;
use super::economy::late_cost_multiplier;
use super::tasks::{self, task_type};

pub const SCHEDULE_INTERVAL: f64 = 30.0;
pub const SCHEDULE_MIN_PHASE: u32 = 6;

/// A recurring job: every interval, a task of a fixed type is created and
/// handed to a fixed agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub name: String,
    pub task_kind: TaskTypeKind,
    pub agent: AgentId,
    pub agent_name: String,
    pub interval: f64,
    pub last_run: Option<f64>,
    pub enabled: bool,
}

pub fn schedule_cost(existing: usize, late_mult: f64) -> f64 {
    ((100.0 + existing as f64 * 150.0) * late_mult).ceil()
}

fn first_idle_worker(ctx: &TickContext<'_>) -> Option<(AgentId, String)> {
    agent_ids(ctx.world).into_iter().find_map(|id| {
        let entity = find_agent(ctx.world, id)?;
        let role = ctx.world.get::<&AgentRole>(entity).ok()?.role;
        let core = ctx.world.get::<&WorkerCore>(entity).ok()?;
        if role.is_coordinator() || !core.is_idle() {
            return None;
        }
        let name = ctx.world.get::<&AgentName>(entity).ok()?.name.clone();
        Some((id, name))
    })
}

/// Adds a schedule bound to the first idle agent.
pub fn add_schedule(ctx: &mut TickContext<'_>) -> Result<LogEntry, IntentError> {
    if ctx.state.phase < SCHEDULE_MIN_PHASE {
        return Err(IntentError::PhaseLocked {
            need: SCHEDULE_MIN_PHASE,
        });
    }
    let (agent, agent_name) = first_idle_worker(ctx)
        .ok_or_else(|| IntentError::NothingToDo("no idle agents for a schedule".into()))?;
    let cost = schedule_cost(ctx.state.schedules.len(), late_cost_multiplier(ctx.state));
    if !ctx.state.ledger.try_spend_cash(cost) {
        return Err(IntentError::InsufficientCash {
            need: cost,
            have: ctx.state.ledger.cash,
        });
    }

    let types = tasks::unlocked_types(ctx.state.phase);
    let task_kind = types[ctx.rng.gen_range(0..types.len())];
    let name = format!("Daily {}", task_type(task_kind).name);
    let id = ctx.state.next_id();
    ctx.state.schedules.push(Schedule {
        id,
        name: name.clone(),
        task_kind,
        agent,
        agent_name: agent_name.clone(),
        interval: SCHEDULE_INTERVAL,
        last_run: None,
        enabled: true,
    });
    Ok(ctx.state.log(
        LogCategory::Economy,
        format!("Added schedule: {} -> {}", name, agent_name),
    ))
}

pub fn toggle_schedule(ctx: &mut TickContext<'_>, id: ScheduleId) -> Result<LogEntry, IntentError> {
    let schedule = ctx
        .state
        .schedules
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or(IntentError::UnknownSchedule(id))?;
    schedule.enabled = !schedule.enabled;
    let text = format!(
        "Schedule {} {}.",
        schedule.name,
        if schedule.enabled { "resumed" } else { "paused" }
    );
    Ok(ctx.state.log(LogCategory::Economy, text))
}

pub fn remove_schedule(ctx: &mut TickContext<'_>, id: ScheduleId) -> Result<LogEntry, IntentError> {
    let idx = ctx
        .state
        .schedules
        .iter()
        .position(|s| s.id == id)
        .ok_or(IntentError::UnknownSchedule(id))?;
    let schedule = ctx.state.schedules.remove(idx);
    Ok(ctx.state.log(
        LogCategory::Economy,
        format!("Removed schedule {}.", schedule.name),
    ))
}

/// Agents currently working, which is what compute slots limit.
fn compute_used(ctx: &TickContext<'_>) -> u32 {
    ctx.world
        .query::<&WorkerCore>()
        .iter()
        .filter(|(_, core)| core.status == WorkerStatus::Working)
        .count() as u32
}

/// Fires due schedules. Each run creates a task and binds it to the
/// schedule's agent if that agent is idle and compute allows.
pub fn schedule_system(ctx: &mut TickContext<'_>) {
    if ctx.state.phase < SCHEDULE_MIN_PHASE {
        return;
    }
    let now = ctx.state.clock;
    let due: Vec<usize> = ctx
        .state
        .schedules
        .iter()
        .enumerate()
        .filter(|(_, s)| s.enabled && s.last_run.map_or(true, |t| now - t >= s.interval))
        .map(|(i, _)| i)
        .collect();

    for idx in due {
        ctx.state.schedules[idx].last_run = Some(now);
        let (agent, kind) = {
            let s = &ctx.state.schedules[idx];
            (s.agent, s.task_kind)
        };

        let ready = find_agent(ctx.world, agent)
            .and_then(|e| ctx.world.get::<&WorkerCore>(e).ok().map(|c| c.ready_for_work()))
            .unwrap_or(false);
        if !ready {
            continue;
        }
        let compute_max = ctx.state.modifiers.compute_max;
        if compute_max > 0 && compute_used(ctx) >= compute_max {
            continue;
        }

        let task = tasks::generate_task_of(ctx.state, ctx.rng, kind);
        let task_id = task.id;
        ctx.state.tasks.push(task);
        if assignment::bind(ctx.world, ctx.state, task_id, WorkerRef::Agent(agent)).is_ok() {
            let name = ctx.state.schedules[idx].name.clone();
            ctx.state.log(LogCategory::Task, format!("Schedule ran: {}.", name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::systems::fixture::Fixture;
    use crate::game::agents::hire_agent;
    use crate::protocol::{RoleKind, TaskStatus};

    fn scheduling_fixture() -> (Fixture, AgentId) {
        let mut fx = Fixture::at_phase(6);
        fx.state.ledger.cash = 10_000.0;
        hire_agent(&mut fx.ctx(), RoleKind::Writer).unwrap();
        let agent = agent_ids(&fx.world)[0];
        (fx, agent)
    }

    #[test]
    fn add_requires_phase_six() {
        let mut fx = Fixture::at_phase(5);
        assert_eq!(
            add_schedule(&mut fx.ctx()),
            Err(IntentError::PhaseLocked { need: 6 })
        );
    }

    #[test]
    fn add_charges_growing_cost() {
        let (mut fx, _) = scheduling_fixture();
        let before = fx.state.ledger.cash;
        add_schedule(&mut fx.ctx()).unwrap();
        // phase 6 => late multiplier 1.24
        assert_eq!(before - fx.state.ledger.cash, 124.0);
        assert_eq!(schedule_cost(1, 1.24), 310.0);
    }

    #[test]
    fn due_schedule_creates_and_assigns_task() {
        let (mut fx, agent) = scheduling_fixture();
        add_schedule(&mut fx.ctx()).unwrap();
        schedule_system(&mut fx.ctx());
        let task = fx
            .state
            .tasks
            .iter()
            .find(|t| t.assigned == Some(WorkerRef::Agent(agent)))
            .expect("scheduled task");
        assert_eq!(task.status, TaskStatus::Agent);

        // Not due again until the interval passes.
        let count = fx.state.tasks.len();
        fx.state.clock += 10.0;
        schedule_system(&mut fx.ctx());
        assert_eq!(fx.state.tasks.len(), count);
    }

    #[test]
    fn toggle_and_remove() {
        let (mut fx, _) = scheduling_fixture();
        add_schedule(&mut fx.ctx()).unwrap();
        let id = fx.state.schedules[0].id;
        toggle_schedule(&mut fx.ctx(), id).unwrap();
        assert!(!fx.state.schedules[0].enabled);
        remove_schedule(&mut fx.ctx(), id).unwrap();
        assert!(fx.state.schedules.is_empty());
        assert_eq!(
            remove_schedule(&mut fx.ctx(), id),
            Err(IntentError::UnknownSchedule(id))
        );
    }
}
