use hecs::Entity;
use rand::Rng;

use crate::ecs::components::{Agent, AgentKey, AgentName, AgentRole, AgentStats, WorkerCore};
use crate::ecs::systems::{TickContext, WorkerModel};
use crate::game::agents::{
    has_specialty, AGENT_DRAIN_PER_SEC, AGENT_ERROR_COOLDOWN, AGENT_FAIL_PER_SEC,
    AGENT_INCIDENT_CHANCE, AGENT_WORK_MULT, SPECIALTY_BONUS,
};
use crate::game::assignment;
use crate::game::incidents::maybe_raise;
use crate::game::tasks::{self, complete_task, is_code_task, is_research_task};
use crate::game::tokens::failure_chance;
use crate::protocol::{AgentId, LogCategory, RoleKind, TaskId, TaskStatus, WorkerRef, WorkerStatus};

/// Per-second failure rate for an agent of `reliability` at `tech_debt`.
pub fn agent_failure_rate(reliability: f64, tech_debt: f64) -> f64 {
    AGENT_FAIL_PER_SEC * (1.0 - reliability * 0.8) * (1.0 + tech_debt * 0.01)
}

struct Busy {
    entity: Entity,
    id: AgentId,
    name: String,
    role: RoleKind,
    stats: AgentStats,
    task: TaskId,
}

/// The hired agent pool.
pub struct AgentPool;

impl WorkerModel for AgentPool {
    fn name(&self) -> &'static str {
        "agents"
    }

    fn step_tick(&self, ctx: &mut TickContext<'_>, dt: f64) {
        let now = ctx.state.clock;

        // Phase 1: Recover errored agents, collect working ones
        let mut busy: Vec<Busy> = Vec::new();
        for (entity, (key, name, role, stats, core)) in ctx
            .world
            .query_mut::<hecs::With<
                (&AgentKey, &AgentName, &AgentRole, &AgentStats, &mut WorkerCore),
                &Agent,
            >>()
        {
            match core.status {
                WorkerStatus::Error => {
                    let since = *core.error_since.get_or_insert(now);
                    if now - since >= AGENT_ERROR_COOLDOWN {
                        core.status = WorkerStatus::Idle;
                        core.error_since = None;
                    }
                }
                WorkerStatus::Working if core.enabled => {
                    if let Some(task) = core.current_task {
                        busy.push(Busy {
                            entity,
                            id: key.id,
                            name: name.name.clone(),
                            role: role.role,
                            stats: stats.clone(),
                            task,
                        });
                    }
                }
                _ => {}
            }
        }
        busy.sort_by_key(|b| b.id);

        // Phase 2: Advance each working agent
        for agent in busy {
            step_agent(ctx, agent, dt);
        }
    }
}

fn step_agent(ctx: &mut TickContext<'_>, agent: Busy, dt: f64) {
    let worker = WorkerRef::Agent(agent.id);
    let Some((kind, in_flight)) = tasks::find(ctx.state, agent.task)
        .map(|t| (t.kind, t.status == TaskStatus::Agent && t.assigned == Some(worker)))
    else {
        assignment::release_worker(ctx.world, ctx.state, worker, WorkerStatus::Idle);
        return;
    };
    if !in_flight {
        assignment::release_worker(ctx.world, ctx.state, worker, WorkerStatus::Idle);
        return;
    }

    // ── Tank ─────────────────────────────────────────────────────────
    let rate = AGENT_DRAIN_PER_SEC * agent.stats.token_cost * ctx.state.modifiers.token_efficiency;
    let (sustained, empty) = match ctx.world.get::<&mut WorkerCore>(agent.entity) {
        Ok(mut core) => {
            let sustained = core.tank.drain(rate, dt);
            (sustained, core.tank.is_empty())
        }
        Err(_) => return,
    };
    let worked = dt * sustained;

    // ── Reliability ──────────────────────────────────────────────────
    let per_sec = agent_failure_rate(agent.stats.reliability, ctx.state.ledger.tech_debt);
    if ctx.rng.gen::<f64>() < failure_chance(per_sec, worked) {
        let task_name = tasks::find(ctx.state, agent.task).map_or("task", |t| t.name());
        assignment::release(ctx.world, ctx.state, agent.task, WorkerStatus::Error);
        ctx.state.log(
            LogCategory::Agent,
            format!("{} failed on \"{}\". Agent needs reset.", agent.name, task_name),
        );
        maybe_raise(ctx, AGENT_INCIDENT_CHANCE, Some(&agent.name));
        return;
    }

    // ── Work ─────────────────────────────────────────────────────────
    let m = &ctx.state.modifiers;
    let mut amount = agent.stats.speed * AGENT_WORK_MULT * m.agent_speed_mult * worked;
    if has_specialty(agent.role, kind) {
        amount *= SPECIALTY_BONUS;
    }
    if is_research_task(kind) {
        amount *= 1.0 + m.tool_bonus;
    }
    if is_code_task(kind) {
        amount *= m.code_speed_mult;
    }

    let full = tasks::find_mut(ctx.state, agent.task)
        .map(|t| t.add_work(amount))
        .unwrap_or(false);
    if full {
        complete_task(ctx, agent.task);
    } else if empty {
        assignment::release(ctx.world, ctx.state, agent.task, WorkerStatus::Stalled);
        let cooldown = ctx.config.stall_log_cooldown;
        ctx.state.log_limited(
            &format!("stall:{}", agent.id),
            cooldown,
            LogCategory::Agent,
            format!("{} stalled: out of tokens.", agent.name),
        );
    }
}
