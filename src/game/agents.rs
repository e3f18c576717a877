use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::Rng;

use crate::ecs::components::{
    Agent, AgentKey, AgentName, AgentRecord, AgentRole, AgentStats, AgentTrait, GameState,
    WorkerCore,
};
use crate::ecs::systems::TickContext;
use crate::error::IntentError;
use crate::protocol::{
    AgentId, AgentSnapshot, LogCategory, LogEntry, RoleKind, TaskTypeKind, TraitKind,
};

use super::assignment;
use super::economy::late_cost_multiplier;
use super::tokens::TokenTank;

// ── Worker tuning ───────────────────────────────────────────────────

pub const SOLO_TANK: f64 = 100.0;
pub const SOLO_DRAIN_PER_SEC: f64 = 1.5;
pub const SOLO_WORK_PER_SEC: f64 = 3.0;
pub const SOLO_FAIL_PER_SEC: f64 = 0.02;
/// Share of progress lost when the solo worker fails.
pub const SOLO_REVERT: f64 = 0.5;

pub const AGENT_TANK: f64 = 60.0;
pub const AGENT_DRAIN_PER_SEC: f64 = 0.5;
pub const AGENT_WORK_MULT: f64 = 25.0;
pub const SPECIALTY_BONUS: f64 = 1.4;
pub const AGENT_FAIL_PER_SEC: f64 = 0.18;
pub const AGENT_INCIDENT_CHANCE: f64 = 0.4;
pub const AGENT_ERROR_COOLDOWN: f64 = 5.0;

pub const MANAGER_TANK: f64 = 300.0;

const BASE_HIRE_COST: f64 = 250.0;
const HIRE_COST_GROWTH: f64 = 1.8;
const FIRE_REFUND: f64 = 0.3;

// ── Roles ───────────────────────────────────────────────────────────

pub struct RoleDef {
    pub role: RoleKind,
    pub name: &'static str,
    pub specialty: &'static [TaskTypeKind],
    pub speed_bias: f64,
    pub quality_bias: f64,
    pub reliability_bias: f64,
}

/// Returns the full catalogue of hireable roles.
pub fn all_roles() -> &'static [RoleDef] {
    use TaskTypeKind::*;

    static ROLES: &[RoleDef] = &[
        RoleDef { role: RoleKind::Writer, name: "Writer", specialty: &[Email, Social, Copy, Article], speed_bias: 1.2, quality_bias: 1.0, reliability_bias: 0.9 },
        RoleDef { role: RoleKind::Researcher, name: "Researcher", specialty: &[Research, Report], speed_bias: 0.8, quality_bias: 1.3, reliability_bias: 1.1 },
        RoleDef { role: RoleKind::Coder, name: "Coder", specialty: &[Code, Integration, WebApp, Saas, Spreadsheet], speed_bias: 1.0, quality_bias: 1.1, reliability_bias: 0.85 },
        RoleDef { role: RoleKind::Analyst, name: "Analyst", specialty: &[Spreadsheet, Report, Research], speed_bias: 0.9, quality_bias: 1.2, reliability_bias: 1.0 },
        RoleDef { role: RoleKind::Support, name: "Support", specialty: &[Email, Social], speed_bias: 1.3, quality_bias: 0.9, reliability_bias: 1.0 },
        RoleDef { role: RoleKind::Sales, name: "Sales", specialty: &[Email, Social, Copy], speed_bias: 1.1, quality_bias: 0.8, reliability_bias: 1.0 },
        RoleDef { role: RoleKind::DevOps, name: "DevOps", specialty: &[Code, Integration, WebApp], speed_bias: 0.9, quality_bias: 1.0, reliability_bias: 1.3 },
        RoleDef { role: RoleKind::Manager, name: "Manager", specialty: &[], speed_bias: 0.7, quality_bias: 1.0, reliability_bias: 1.2 },
        RoleDef { role: RoleKind::TokenManager, name: "Token Mgr", specialty: &[], speed_bias: 1.0, quality_bias: 1.0, reliability_bias: 1.0 },
        RoleDef { role: RoleKind::IncidentResponder, name: "Responder", specialty: &[], speed_bias: 1.0, quality_bias: 1.0, reliability_bias: 1.0 },
    ];

    ROLES
}

pub fn role_def(role: RoleKind) -> &'static RoleDef {
    // One row per variant.
    all_roles()
        .iter()
        .find(|r| r.role == role)
        .unwrap_or(&all_roles()[0])
}

pub fn has_specialty(role: RoleKind, kind: TaskTypeKind) -> bool {
    role_def(role).specialty.contains(&kind)
}

/// Checks the unlock gate for `role`.
pub fn role_gate(state: &GameState, role: RoleKind) -> Result<(), IntentError> {
    let need = match role {
        RoleKind::Manager => {
            if !state.flags.manager_unlocked {
                return Err(IntentError::RoleLocked(role));
            }
            return Ok(());
        }
        RoleKind::Sales => 7,
        RoleKind::DevOps => 8,
        RoleKind::TokenManager => 5,
        RoleKind::IncidentResponder => 6,
        _ => return Ok(()),
    };
    if state.phase < need {
        Err(IntentError::RoleLocked(role))
    } else {
        Ok(())
    }
}

// ── Traits ──────────────────────────────────────────────────────────

const ALL_TRAITS: [TraitKind; 8] = [
    TraitKind::Overconfident,
    TraitKind::Pedantic,
    TraitKind::Sloppy,
    TraitKind::ToolObsessed,
    TraitKind::Frugal,
    TraitKind::Hallucinator,
    TraitKind::Perfectionist,
    TraitKind::Chaotic,
];

pub fn trait_name(kind: TraitKind) -> &'static str {
    match kind {
        TraitKind::Overconfident => "Overconfident",
        TraitKind::Pedantic => "Pedantic",
        TraitKind::Sloppy => "Sloppy but Fast",
        TraitKind::ToolObsessed => "Tool-Obsessed",
        TraitKind::Frugal => "Frugal",
        TraitKind::Hallucinator => "Hallucinator",
        TraitKind::Perfectionist => "Perfectionist",
        TraitKind::Chaotic => "Chaotic Energy",
    }
}

/// Applied exactly once, at creation.
pub fn apply_trait(kind: TraitKind, stats: &mut AgentStats) {
    match kind {
        TraitKind::Overconfident => {
            stats.speed *= 1.2;
            stats.reliability *= 0.85;
        }
        TraitKind::Pedantic => {
            stats.quality *= 1.2;
            stats.speed *= 0.85;
        }
        TraitKind::Sloppy => {
            stats.speed *= 1.3;
            stats.quality *= 0.75;
        }
        TraitKind::ToolObsessed => {
            stats.quality *= 1.15;
            stats.token_cost *= 1.1;
        }
        TraitKind::Frugal => {
            stats.token_cost *= 0.8;
            stats.speed *= 0.9;
        }
        TraitKind::Hallucinator => {
            stats.speed *= 1.25;
            stats.reliability *= 0.8;
        }
        TraitKind::Perfectionist => {
            stats.quality *= 1.25;
            stats.speed *= 0.8;
        }
        TraitKind::Chaotic => {}
    }
}

// ── Generation ──────────────────────────────────────────────────────

const NAME_FIRST: [&str; 20] = [
    "Alpha", "Beta", "Gamma", "Delta", "Echo", "Nova", "Pixel", "Logic", "Byte", "Flux", "Quark",
    "Neon", "Synth", "Proto", "Cipher", "Vector", "Pulse", "Drift", "Glitch", "Spark",
];

const NAME_LAST: [&str; 18] = [
    "3000", "Prime", "Max", "Ultra", "Lite", "Zero", "One", "X", "Pro", "Mini", "Turbo", "Core",
    "Net", "Hub", "Bot", "AI", "GPT", "LLM",
];

fn pick_name(rng: &mut StdRng) -> String {
    format!(
        "{}-{}",
        NAME_FIRST[rng.gen_range(0..NAME_FIRST.len())],
        NAME_LAST[rng.gen_range(0..NAME_LAST.len())]
    )
}

/// Rolls base stats with the role's bias, before the trait.
fn generate_stats(role: RoleKind, rng: &mut StdRng) -> AgentStats {
    let def = role_def(role);
    AgentStats {
        speed: rng.gen_range(0.8..1.2) * def.speed_bias,
        quality: rng.gen_range(0.8..1.2) * def.quality_bias,
        reliability: rng.gen_range(0.75..1.1) * def.reliability_bias,
        token_cost: rng.gen_range(0.8..1.2),
    }
}

fn starting_tank(role: RoleKind) -> TokenTank {
    match role {
        RoleKind::Manager => TokenTank::full(MANAGER_TANK),
        RoleKind::TokenManager | RoleKind::IncidentResponder => TokenTank::full(0.0),
        _ => TokenTank::full(AGENT_TANK),
    }
}

pub fn hire_cost(agent_count: usize, late_mult: f64) -> f64 {
    (BASE_HIRE_COST * HIRE_COST_GROWTH.powi(agent_count as i32) * late_mult).ceil()
}

// ── Lookup ──────────────────────────────────────────────────────────

pub fn find_agent(world: &World, id: AgentId) -> Option<Entity> {
    world
        .query::<&AgentKey>()
        .iter()
        .find(|(_, key)| key.id == id)
        .map(|(entity, _)| entity)
}

pub fn agent_count(world: &World) -> usize {
    world.query::<&Agent>().iter().count()
}

pub fn has_role(world: &World, role: RoleKind) -> bool {
    world
        .query::<&AgentRole>()
        .iter()
        .any(|(_, r)| r.role == role)
}

/// Agent ids sorted ascending, so iteration order is deterministic.
pub fn agent_ids(world: &World) -> Vec<AgentId> {
    let mut ids: Vec<AgentId> = world.query::<&AgentKey>().iter().map(|(_, k)| k.id).collect();
    ids.sort_unstable();
    ids
}

/// Enabled, idle coordinators of `role`.
pub fn idle_with_role(world: &World, role: RoleKind) -> usize {
    world
        .query::<(&AgentRole, &WorkerCore)>()
        .iter()
        .filter(|(_, (r, core))| r.role == role && core.is_idle())
        .count()
}

// ── Spawning ────────────────────────────────────────────────────────

/// Spawns an agent entity from a full description. Used by hiring and
/// by snapshot restore.
pub fn spawn_agent(world: &mut World, snap: &AgentSnapshot) -> Entity {
    let mut core = WorkerCore::new(TokenTank {
        level: snap.tank_level.clamp(0.0, snap.tank_capacity.max(0.0)),
        capacity: snap.tank_capacity.max(0.0),
    });
    core.status = snap.status;
    core.current_task = snap.current_task;
    core.error_since = snap.error_since;
    core.enabled = snap.enabled;

    world.spawn((
        Agent,
        AgentKey { id: snap.id },
        AgentName {
            name: snap.name.clone(),
        },
        AgentRole { role: snap.role },
        AgentTrait {
            kind: snap.trait_kind,
        },
        AgentStats {
            speed: snap.speed,
            quality: snap.quality,
            reliability: snap.reliability,
            token_cost: snap.token_cost,
        },
        AgentRecord {
            auto_assign: snap.auto_assign,
            tasks_completed: snap.tasks_completed,
            hired_at: snap.hired_at,
        },
        core,
    ))
}

/// Rolls a brand-new agent of `role` and spawns it.
pub fn create_agent(
    world: &mut World,
    state: &mut GameState,
    rng: &mut StdRng,
    role: RoleKind,
) -> AgentSnapshot {
    let trait_kind = ALL_TRAITS[rng.gen_range(0..ALL_TRAITS.len())];
    let mut stats = generate_stats(role, rng);
    apply_trait(trait_kind, &mut stats);
    let tank = starting_tank(role);

    let snap = AgentSnapshot {
        id: state.next_id(),
        name: pick_name(rng),
        role,
        trait_kind,
        speed: stats.speed,
        quality: stats.quality,
        reliability: stats.reliability,
        token_cost: stats.token_cost,
        status: crate::protocol::WorkerStatus::Idle,
        current_task: None,
        tank_level: tank.level,
        tank_capacity: tank.capacity,
        error_since: None,
        enabled: true,
        auto_assign: !role.is_coordinator(),
        tasks_completed: 0,
        hired_at: state.clock,
    };
    spawn_agent(world, &snap);
    snap
}

/// Reads every agent back into plain snapshots, ordered by id.
pub fn snapshot_agents(world: &World) -> Vec<AgentSnapshot> {
    let mut out: Vec<AgentSnapshot> = world
        .query::<(
            &AgentKey,
            &AgentName,
            &AgentRole,
            &AgentTrait,
            &AgentStats,
            &AgentRecord,
            &WorkerCore,
        )>()
        .iter()
        .map(|(_, (key, name, role, tr, stats, record, core))| AgentSnapshot {
            id: key.id,
            name: name.name.clone(),
            role: role.role,
            trait_kind: tr.kind,
            speed: stats.speed,
            quality: stats.quality,
            reliability: stats.reliability,
            token_cost: stats.token_cost,
            status: core.status,
            current_task: core.current_task,
            tank_level: core.tank.level,
            tank_capacity: core.tank.capacity,
            error_since: core.error_since,
            enabled: core.enabled,
            auto_assign: record.auto_assign,
            tasks_completed: record.tasks_completed,
            hired_at: record.hired_at,
        })
        .collect();
    out.sort_by_key(|a| a.id);
    out
}

// ── Hire / fire ─────────────────────────────────────────────────────

/// Hire one agent of `role`.
///
/// # Errors
///
/// Rejects locked or duplicate roles, a full roster and a short wallet.
pub fn hire_agent(ctx: &mut TickContext<'_>, role: RoleKind) -> Result<LogEntry, IntentError> {
    if ctx.state.phase < 4 {
        return Err(IntentError::PhaseLocked { need: 4 });
    }
    role_gate(ctx.state, role)?;
    if has_role(ctx.world, role) {
        return Err(IntentError::RoleAlreadyHired(role));
    }
    let count = agent_count(ctx.world);
    if count >= ctx.state.modifiers.agent_slots as usize {
        return Err(IntentError::NoFreeSlot);
    }
    let cost = hire_cost(count, late_cost_multiplier(ctx.state));
    if !ctx.state.ledger.try_spend_cash(cost) {
        return Err(IntentError::InsufficientCash {
            need: cost,
            have: ctx.state.ledger.cash,
        });
    }

    let snap = create_agent(ctx.world, ctx.state, ctx.rng, role);
    tracing::info!(agent = snap.id, ?role, cost, "hired agent");
    Ok(ctx.state.log(
        LogCategory::Agent,
        format!(
            "Hired {} ({}, {})!",
            snap.name,
            role_def(role).name,
            trait_name(snap.trait_kind)
        ),
    ))
}

/// Fire an agent, refunding 30% of the next-lower hire cost. Its task,
/// if any, goes back to the pool.
pub fn fire_agent(ctx: &mut TickContext<'_>, id: AgentId) -> Result<LogEntry, IntentError> {
    let entity = find_agent(ctx.world, id).ok_or(IntentError::UnknownAgent(id))?;
    let name = ctx
        .world
        .get::<&AgentName>(entity)
        .map(|n| n.name.clone())
        .unwrap_or_default();

    assignment::release_worker(
        ctx.world,
        ctx.state,
        crate::protocol::WorkerRef::Agent(id),
        crate::protocol::WorkerStatus::Idle,
    );

    let count = agent_count(ctx.world);
    let refund = (hire_cost(count.saturating_sub(1), late_cost_multiplier(ctx.state))
        * FIRE_REFUND)
        .ceil();
    ctx.state.ledger.earn(refund);
    if ctx.world.despawn(entity).is_err() {
        tracing::warn!(agent = id, "fired agent was already despawned");
    }

    tracing::info!(agent = id, refund, "fired agent");
    Ok(ctx.state.log(
        LogCategory::Agent,
        format!("Fired {}. Recovered ${:.2}.", name, refund),
    ))
}

/// Flip an agent's auto-assign switch.
pub fn toggle_auto_assign(ctx: &mut TickContext<'_>, id: AgentId) -> Result<LogEntry, IntentError> {
    let entity = find_agent(ctx.world, id).ok_or(IntentError::UnknownAgent(id))?;
    let (name, now_on) = {
        let mut record = ctx
            .world
            .get::<&mut AgentRecord>(entity)
            .map_err(|_| IntentError::UnknownAgent(id))?;
        record.auto_assign = !record.auto_assign;
        let name = ctx
            .world
            .get::<&AgentName>(entity)
            .map(|n| n.name.clone())
            .unwrap_or_default();
        (name, record.auto_assign)
    };
    Ok(ctx.state.log(
        LogCategory::Agent,
        format!(
            "{} auto-assign {}.",
            name,
            if now_on { "on" } else { "off" }
        ),
    ))
}
