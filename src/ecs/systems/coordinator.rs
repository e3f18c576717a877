//! Coordinator roles: agents that never take tasks themselves but keep the
//! rest of the pool fed, busy and out of trouble.

use hecs::{Entity, World};

use crate::ecs::components::{AgentKey, AgentRecord, AgentRole, GameState, WorkerCore};
use crate::ecs::systems::{TickContext, WorkerModel};
use crate::game::agents::{has_specialty, idle_with_role};
use crate::game::assignment;
use crate::game::incidents::resolve_by_responder;
use crate::game::tokens::top_up;
use crate::game::upgrades::{get_upgrade, upgrade_cost, UpgradeId};
use crate::protocol::{AgentId, LogCategory, RoleKind, TaskId, TaskStatus, WorkerRef, WorkerStatus};

pub const MANAGER_INTERVAL: f64 = 1.0;
pub const MANAGER_ASSIGN_BUDGET: usize = 3;
/// Agents below this fill ratio get topped up by the manager.
pub const MANAGER_REFILL_BELOW: f64 = 0.5;
/// The manager tops itself up from global tokens below this ratio.
pub const MANAGER_SELF_REFILL_BELOW: f64 = 0.25;

pub const TOKEN_MANAGER_THRESHOLD: f64 = 100.0;
pub const TOKEN_MANAGER_INTERVAL: f64 = 2.0;

pub const RESPONDER_FIX_PER_SEC: f64 = 8.0;

// ── Shared helpers ──────────────────────────────────────────────────

/// Non-coordinator agents ready to take a task, ordered by id, with
/// their role and auto-assign switch.
pub fn ready_workers(world: &World) -> Vec<(AgentId, RoleKind, bool)> {
    let mut out: Vec<(AgentId, RoleKind, bool)> = world
        .query::<(&AgentKey, &AgentRole, &AgentRecord, &WorkerCore)>()
        .iter()
        .filter(|(_, (_, role, _, core))| !role.role.is_coordinator() && core.ready_for_work())
        .map(|(_, (key, role, record, _))| (key.id, role.role, record.auto_assign))
        .collect();
    out.sort_by_key(|(id, _, _)| *id);
    out
}

/// Oldest available task matching `role`'s specialty, or simply the
/// oldest available one when `any` is set and nothing matches.
pub fn pick_task_for(state: &GameState, role: RoleKind, any: bool) -> Option<TaskId> {
    let mut available: Vec<(f64, TaskId, bool)> = state
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Available)
        .map(|t| (t.created_at, t.id, has_specialty(role, t.kind)))
        .collect();
    available.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    available
        .iter()
        .find(|(_, _, matches)| *matches)
        .or_else(|| if any { available.first() } else { None })
        .map(|(_, id, _)| *id)
}

fn log_assignment(ctx: &mut TickContext<'_>, agent: AgentId, task: TaskId) {
    tracing::debug!(agent, task, "assigned");
    ctx.state.log_limited(
        &format!("assign:{}", agent),
        ctx.config.warning_cooldown,
        LogCategory::Agent,
        format!("Agent #{} picked up task #{}.", agent, task),
    );
}

fn first_with_role(world: &World, role: RoleKind) -> Option<Entity> {
    let mut found: Vec<(AgentId, Entity)> = world
        .query::<(&AgentKey, &AgentRole)>()
        .iter()
        .filter(|(_, (_, r))| r.role == role)
        .map(|(e, (k, _))| (k.id, e))
        .collect();
    found.sort_by_key(|(id, _)| *id);
    found.first().map(|(_, e)| *e)
}

// ── Manager ─────────────────────────────────────────────────────────

/// Refills low agents from its own large tank and routes idle agents to
/// work.
pub struct Manager;

impl WorkerModel for Manager {
    fn name(&self) -> &'static str {
        "manager"
    }

    fn step_tick(&self, ctx: &mut TickContext<'_>, _dt: f64) {
        if idle_with_role(ctx.world, RoleKind::Manager) == 0 {
            return;
        }
        let Some(manager) = first_with_role(ctx.world, RoleKind::Manager) else {
            return;
        };

        let now = ctx.state.clock;
        let due = ctx
            .state
            .timers
            .last_manager_run
            .map_or(true, |last| now - last >= MANAGER_INTERVAL);
        if due {
            ctx.state.timers.last_manager_run = Some(now);
            refill_pool(ctx, manager);
        }

        let smart = ctx.state.flags.smart_routing;
        let mut budget = MANAGER_ASSIGN_BUDGET;
        for (agent, role, _) in ready_workers(ctx.world) {
            if budget == 0 {
                break;
            }
            let Some(task) = pick_task_for(ctx.state, role, smart) else {
                continue;
            };
            if assignment::bind(ctx.world, ctx.state, task, WorkerRef::Agent(agent)).is_ok() {
                budget -= 1;
                log_assignment(ctx, agent, task);
            }
        }
    }
}

fn refill_pool(ctx: &mut TickContext<'_>, manager: Entity) {
    // Self top-up first so the pool refill below has something to give.
    if let Ok(mut core) = ctx.world.get::<&mut WorkerCore>(manager) {
        if core.tank.ratio() < MANAGER_SELF_REFILL_BELOW {
            if let Ok(filled) = top_up(&mut core.tank, &mut ctx.state.ledger) {
                tracing::debug!(tokens = filled.tokens_spent, "manager self-refill");
            }
        }
    }

    let low: Vec<Entity> = ctx
        .world
        .query::<(&AgentRole, &WorkerCore)>()
        .iter()
        .filter(|(_, (role, core))| {
            !role.role.is_coordinator()
                && core.enabled
                && core.tank.capacity > 0.0
                && core.tank.ratio() < MANAGER_REFILL_BELOW
        })
        .map(|(e, _)| e)
        .collect();

    let mut refilled = 0;
    for entity in low {
        let wanted = ctx
            .world
            .get::<&WorkerCore>(entity)
            .map(|c| c.tank.space())
            .unwrap_or(0.0);
        let given = ctx
            .world
            .get::<&mut WorkerCore>(manager)
            .map(|mut c| c.tank.take(wanted))
            .unwrap_or(0.0);
        if given <= 0.0 {
            break;
        }
        if let Ok(mut core) = ctx.world.get::<&mut WorkerCore>(entity) {
            core.tank.fill(given);
            if core.status == WorkerStatus::Stalled {
                core.status = WorkerStatus::Idle;
            }
        }
        refilled += 1;
    }
    if refilled > 0 {
        ctx.state.log_limited(
            "manager:refill",
            ctx.config.warning_cooldown,
            LogCategory::Agent,
            format!("Manager refilled {} agent tank(s).", refilled),
        );
    }
}

// ── Auto-assign ─────────────────────────────────────────────────────

/// Idle agents with auto-assign on pick up a specialty task by
/// themselves.
pub fn auto_assign_system(ctx: &mut TickContext<'_>) {
    for (agent, role, auto) in ready_workers(ctx.world) {
        if !auto {
            continue;
        }
        let Some(task) = pick_task_for(ctx.state, role, false) else {
            continue;
        };
        if assignment::bind(ctx.world, ctx.state, task, WorkerRef::Agent(agent)).is_ok() {
            log_assignment(ctx, agent, task);
        }
    }
}

// ── Token manager ───────────────────────────────────────────────────

/// Buys token packs when the global balance runs low.
pub struct TokenManager;

impl WorkerModel for TokenManager {
    fn name(&self) -> &'static str {
        "token_manager"
    }

    fn step_tick(&self, ctx: &mut TickContext<'_>, _dt: f64) {
        if idle_with_role(ctx.world, RoleKind::TokenManager) == 0 {
            return;
        }
        if ctx.state.ledger.tokens > TOKEN_MANAGER_THRESHOLD {
            return;
        }
        let now = ctx.state.clock;
        if let Some(last) = ctx.state.timers.last_token_buy {
            if now - last < TOKEN_MANAGER_INTERVAL {
                return;
            }
        }

        let packs = [(UpgradeId::TokenPack2, 500.0), (UpgradeId::TokenPack1, 200.0)];
        for (id, tokens) in packs {
            let Some(def) = get_upgrade(id) else {
                continue;
            };
            let cost = upgrade_cost(def, ctx.state);
            if ctx.state.ledger.try_spend_cash(cost) {
                ctx.state.ledger.grant_tokens(tokens);
                ctx.state.timers.last_token_buy = Some(now);
                ctx.state.log(
                    LogCategory::Economy,
                    format!("Token Manager auto-purchased {} tokens.", tokens),
                );
                return;
            }
        }
    }
}

// ── Incident responder ──────────────────────────────────────────────

/// Works open incidents down; each idle responder adds fix progress.
pub struct IncidentResponder;

impl WorkerModel for IncidentResponder {
    fn name(&self) -> &'static str {
        "incident_responder"
    }

    fn step_tick(&self, ctx: &mut TickContext<'_>, dt: f64) {
        let responders = idle_with_role(ctx.world, RoleKind::IncidentResponder);
        if responders == 0 {
            return;
        }
        let gain = RESPONDER_FIX_PER_SEC * responders as f64 * dt;

        let mut fixed = Vec::new();
        for (idx, incident) in ctx.state.incidents.iter_mut().enumerate() {
            if incident.resolved {
                continue;
            }
            incident.fix_progress = (incident.fix_progress + gain).min(100.0);
            if incident.fix_progress >= 100.0 {
                fixed.push(idx);
            }
        }
        for idx in fixed {
            resolve_by_responder(ctx, idx);
        }
    }
}
