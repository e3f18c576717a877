//! The world aggregate: owns the ECS world, the game state, the seeded
//! RNG and the config, and exposes the tick driver and the intent API.

use hecs::World;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ConfigError, SimConfig};
use crate::ecs::components::{AgentName, GameState, WorkerCore};
use crate::ecs::systems::{run_tick, TickContext};
use crate::ecs::world::create_world;
use crate::error::IntentError;
use crate::game::agents::{self, agent_ids, find_agent, snapshot_agents, spawn_agent};
use crate::game::assignment;
use crate::game::economy::{
    agent_revenue_rate, economy_snapshot, expense_rate, marketing_revenue_rate, service_income_rate,
};
use crate::game::incidents::{resolve_incident, tutorial_incident};
use crate::game::prestige::{prestige, retire};
use crate::game::schedules::{add_schedule, remove_schedule, toggle_schedule, SCHEDULE_INTERVAL};
use crate::game::tasks::{self, complete_task, generate_early_task};
use crate::game::tokens::{top_up, TopUpRefusal, TANK_UNITS_PER_TOKEN};
use crate::game::upgrades::buy_upgrade;
use crate::protocol::{
    AgentId, EconomySnapshot, Intent, LogCategory, LogEntry, Notice, OfflineReport, TaskId,
    TaskStatus, WorkerRef, WorkerStatus, WorldSnapshot,
};

// ── AI assist tuning ────────────────────────────────────────────────

pub const AI_ASSIST_MIN_PHASE: u32 = 2;
pub const AI_ASSIST_POWER: f64 = 2.5;
pub const AI_ASSIST_BASE_FAIL: f64 = 0.25;
/// Share of failed assists that wipe the task's progress entirely.
pub const AI_ASSIST_RESET_SHARE: f64 = 0.3;
/// Assist count at which the scripted first incident fires.
pub const AI_ASSIST_TUTORIAL_AT: u32 = 25;

/// Per-run payout of a scheduled job in the offline estimate, per phase.
const OFFLINE_SCHEDULE_PAY_PER_PHASE: f64 = 3.0;

/// Single-player simulation. All mutation goes through `advance` or
/// `apply`; both run to completion before the next call.
pub struct Simulation {
    world: World,
    state: GameState,
    rng: StdRng,
    config: SimConfig,
    /// Elapsed time not yet consumed by a whole tick.
    pending: f64,
}

impl Simulation {
    /// Starts a fresh run.
    ///
    /// # Errors
    ///
    /// Rejects a config that fails `SimConfig::validate`, e.g. a
    /// non-positive tick.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (world, state) = create_world(&config);
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            world,
            state,
            rng,
            config,
            pending: 0.0,
        })
    }

    fn ctx(&mut self) -> TickContext<'_> {
        TickContext {
            world: &mut self.world,
            state: &mut self.state,
            rng: &mut self.rng,
            config: &self.config,
        }
    }

    // ── Time ────────────────────────────────────────────────────────

    /// Feeds wall-clock time into the fixed-step loop. Non-finite or
    /// non-positive input is ignored, and a single call never simulates
    /// more than `max_catch_up_seconds`. Returns the number of ticks run.
    pub fn advance(&mut self, elapsed: f64) -> u32 {
        if !elapsed.is_finite() || elapsed <= 0.0 {
            return 0;
        }
        let step = self.config.tick_seconds;
        self.pending = (self.pending + elapsed).min(self.config.max_catch_up_seconds);

        let mut ticks = 0;
        // Tolerance absorbs float drift from repeated subtraction.
        while self.pending + 1e-9 >= step {
            self.pending = (self.pending - step).max(0.0);
            run_tick(&mut self.ctx(), step);
            ticks += 1;
        }
        ticks
    }

    // ── Intents ─────────────────────────────────────────────────────

    /// Validates and applies a user intent.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason; state is left untouched and a
    /// rate-limited warning is written to the game log.
    pub fn apply(&mut self, intent: Intent) -> Result<LogEntry, IntentError> {
        let result = {
            let ctx = &mut self.ctx();
            match intent.clone() {
                Intent::DoEarlyTask => do_early_task(ctx),
                Intent::ClaimTask { task } => claim_task(ctx, task),
                Intent::AiAssist { task } => ai_assist(ctx, task),
                Intent::TopUpWorker { worker } => top_up_worker(ctx, worker),
                Intent::ShutdownWorker { worker } => shutdown_worker(ctx, worker),
                Intent::HireAgent { role } => agents::hire_agent(ctx, role),
                Intent::FireAgent { agent } => agents::fire_agent(ctx, agent),
                Intent::AssignAgent { agent, task } => assign_agent(ctx, agent, task),
                Intent::ToggleAutoAssign { agent } => agents::toggle_auto_assign(ctx, agent),
                Intent::BuyUpgrade { upgrade } => buy_upgrade(ctx, upgrade),
                Intent::ResolveIncident { incident, method } => {
                    resolve_incident(ctx, incident, method)
                }
                Intent::AddSchedule => add_schedule(ctx),
                Intent::ToggleSchedule { schedule } => toggle_schedule(ctx, schedule),
                Intent::RemoveSchedule { schedule } => remove_schedule(ctx, schedule),
                Intent::Prestige => prestige(ctx),
                Intent::Retire => retire(ctx),
            }
        };

        if let Err(err) = &result {
            tracing::warn!(?intent, %err, "intent rejected");
            let cooldown = self.config.warning_cooldown;
            self.state.log_limited(
                err.cooldown_key(),
                cooldown,
                LogCategory::System,
                format!("Can't do that: {}.", err),
            );
        }
        result
    }

    // ── Snapshot ────────────────────────────────────────────────────

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            state: self.state.clone(),
            agents: snapshot_agents(&self.world),
        }
    }

    /// Rebuilds a simulation from a snapshot. The task/worker index is
    /// re-derived, the id counter is moved past every stored id and the
    /// RNG is reseeded from the config seed and the restored tick.
    ///
    /// # Errors
    ///
    /// Rejects a config that fails `SimConfig::validate`.
    pub fn restore(snapshot: WorldSnapshot, config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut world = World::new();
        for agent in &snapshot.agents {
            spawn_agent(&mut world, agent);
        }
        let mut state = snapshot.state;

        let repairs = assignment::repair(&mut world, &mut state);
        if repairs > 0 {
            tracing::warn!(repairs, "restored snapshot had dangling task/worker links");
        }

        let max_id = state
            .tasks
            .iter()
            .map(|t| t.id)
            .chain(state.incidents.iter().map(|i| i.id))
            .chain(state.schedules.iter().map(|s| s.id))
            .chain(state.services.iter().map(|s| s.id))
            .chain(agent_ids(&world))
            .max()
            .unwrap_or(0);
        state.id_counter = state.id_counter.max(max_id + 1);

        let rng = StdRng::seed_from_u64(config.seed ^ state.tick);
        tracing::info!(tick = state.tick, phase = state.phase, "restored snapshot");
        Ok(Self {
            world,
            state,
            rng,
            config,
            pending: 0.0,
        })
    }

    // ── Offline progress ────────────────────────────────────────────

    /// Read-only "welcome back" estimate for `elapsed` seconds away.
    /// Short absences yield `None`; long ones are capped.
    pub fn project_offline_progress(&self, elapsed: f64) -> Option<OfflineReport> {
        if !elapsed.is_finite() || elapsed < self.config.offline_min_seconds {
            return None;
        }
        let seconds = elapsed.min(self.config.offline_cap_seconds);
        let efficiency = self.config.offline_efficiency;
        let state = &self.state;

        let passive = agent_revenue_rate(&self.world, state)
            + marketing_revenue_rate(state)
            + service_income_rate(state);
        let enabled = state.schedules.iter().filter(|s| s.enabled).count() as u64;
        let scheduled_runs = (seconds / SCHEDULE_INTERVAL).floor() as u64 * enabled;

        let earned = passive * seconds * efficiency
            + scheduled_runs as f64
                * state.phase as f64
                * OFFLINE_SCHEDULE_PAY_PER_PHASE
                * efficiency;
        let expenses = expense_rate(&self.world, state) * seconds;

        Some(OfflineReport {
            seconds,
            earned,
            expenses,
            net: (earned - expenses).max(0.0),
            scheduled_runs,
        })
    }

    /// Credits a previously projected report and logs the welcome back.
    pub fn credit_offline(&mut self, report: &OfflineReport) -> LogEntry {
        self.state.ledger.earn(report.net);
        tracing::info!(seconds = report.seconds, net = report.net, "offline progress credited");
        self.state.log(
            LogCategory::Economy,
            format!(
                "Welcome back! {:.0}s away: +${:.2} earned, -${:.2} expenses.",
                report.seconds, report.earned, report.expenses
            ),
        )
    }

    // ── Read access ─────────────────────────────────────────────────

    pub fn economy(&self) -> EconomySnapshot {
        economy_snapshot(&self.world, &self.state)
    }

    /// Hands queued popups to the display collaborator.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.state.notices)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

// ── Intent handlers ─────────────────────────────────────────────────

/// Creates an easy task and starts working it by hand. Only one early
/// task may be in progress at a time.
fn do_early_task(ctx: &mut TickContext<'_>) -> Result<LogEntry, IntentError> {
    if ctx.state.tasks.iter().any(|t| t.status == TaskStatus::Active) {
        return Err(IntentError::NothingToDo("already working on a task".into()));
    }
    let task = generate_early_task(ctx.state, ctx.rng);
    let (id, name, client) = (task.id, task.name(), task.client.clone());
    ctx.state.tasks.push(task);
    assignment::bind(ctx.world, ctx.state, id, WorkerRef::Manual)?;
    ctx.state.ledger.total_clicks += 1;
    Ok(ctx.state.log(
        LogCategory::Task,
        format!("Started \"{}\" for {}.", name, client),
    ))
}

fn claim_task(ctx: &mut TickContext<'_>, task: TaskId) -> Result<LogEntry, IntentError> {
    assignment::bind(ctx.world, ctx.state, task, WorkerRef::Manual)?;
    let name = tasks::find(ctx.state, task).map_or("task", |t| t.name());
    Ok(ctx
        .state
        .log(LogCategory::Task, format!("Working on \"{}\".", name)))
}

/// One burst of AI help on a manual task. Unlike the continuous workers
/// the failure odds are per action, not per second.
fn ai_assist(ctx: &mut TickContext<'_>, task_id: TaskId) -> Result<LogEntry, IntentError> {
    if ctx.state.phase < AI_ASSIST_MIN_PHASE {
        return Err(IntentError::PhaseLocked {
            need: AI_ASSIST_MIN_PHASE,
        });
    }
    let task = tasks::find(ctx.state, task_id).ok_or(IntentError::UnknownTask(task_id))?;
    let claimable = task.status == TaskStatus::Available;
    if !claimable && task.assigned != Some(WorkerRef::Manual) {
        return Err(IntentError::TaskNotAvailable(task_id));
    }

    let m = &ctx.state.modifiers;
    if ctx.state.phase >= 3 {
        let cost = (3.0 * (1.0 + 0.2 * ctx.state.phase as f64) * m.token_efficiency).ceil();
        if !ctx.state.ledger.try_spend_tokens(cost) {
            return Err(IntentError::InsufficientTokens {
                need: cost,
                have: ctx.state.ledger.tokens,
            });
        }
    }
    if claimable {
        assignment::bind(ctx.world, ctx.state, task_id, WorkerRef::Manual)?;
    }

    let m = &ctx.state.modifiers;
    let power = (m.click_power * AI_ASSIST_POWER * m.ai_power_mult).ceil();
    let threshold =
        AI_ASSIST_BASE_FAIL * m.ai_fail_mult * (1.0 + 0.005 * ctx.state.ledger.tech_debt);
    ctx.state.ai_assist_count += 1;
    ctx.state.ledger.total_clicks += 1;
    let roll: f64 = ctx.rng.gen();

    let entry = if roll < threshold * AI_ASSIST_RESET_SHARE {
        let name = match tasks::find_mut(ctx.state, task_id) {
            Some(task) => {
                task.work_done = 0.0;
                task.name()
            }
            None => "task",
        };
        ctx.state.ledger.add_stress(5.0);
        ctx.state.log(
            LogCategory::Task,
            format!("AI hallucinated badly on \"{}\". Progress reset!", name),
        )
    } else if roll < threshold {
        let name = match tasks::find_mut(ctx.state, task_id) {
            Some(task) => {
                task.lose_work((power * 0.5).ceil());
                task.name()
            }
            None => "task",
        };
        ctx.state.ledger.add_stress(2.0);
        ctx.state.log(
            LogCategory::Task,
            format!("AI output on \"{}\" was wrong. Some work lost.", name),
        )
    } else {
        let full = tasks::find_mut(ctx.state, task_id)
            .map(|t| t.add_work(power))
            .unwrap_or(false);
        let completed = if full { complete_task(ctx, task_id) } else { None };
        match completed {
            Some(entry) => entry,
            None => ctx
                .state
                .log(LogCategory::Task, format!("AI assist: +{} work.", power)),
        }
    };

    if ctx.state.ai_assist_count == AI_ASSIST_TUTORIAL_AT && !ctx.state.flags.incidents_explained {
        tutorial_incident(ctx);
    }
    Ok(entry)
}

fn worker_label(world: &World, worker: WorkerRef) -> String {
    match worker {
        WorkerRef::Manual => "you".into(),
        WorkerRef::Solo => "AI worker".into(),
        WorkerRef::Agent(id) => find_agent(world, id)
            .and_then(|e| world.get::<&AgentName>(e).ok().map(|n| n.name.clone()))
            .unwrap_or_else(|| format!("agent #{}", id)),
    }
}

fn top_up_worker(ctx: &mut TickContext<'_>, worker: WorkerRef) -> Result<LogEntry, IntentError> {
    let state = &mut *ctx.state;
    let outcome = match worker {
        WorkerRef::Manual => return Err(IntentError::NothingToDo("you run on coffee".into())),
        WorkerRef::Solo => {
            if !state.solo.unlocked {
                return Err(IntentError::NothingToDo("no AI worker yet".into()));
            }
            let core = &mut state.solo.core;
            top_up(&mut core.tank, &mut state.ledger).map(|done| {
                wake(core);
                done
            })
        }
        WorkerRef::Agent(id) => {
            let entity = find_agent(ctx.world, id).ok_or(IntentError::UnknownAgent(id))?;
            let mut core = ctx
                .world
                .get::<&mut WorkerCore>(entity)
                .map_err(|_| IntentError::UnknownAgent(id))?;
            top_up(&mut core.tank, &mut state.ledger).map(|done| {
                wake(&mut core);
                done
            })
        }
    };

    let name = worker_label(ctx.world, worker);
    match outcome {
        Ok(done) => Ok(ctx.state.log(
            LogCategory::Economy,
            format!(
                "Topped up {}: +{:.0} tank for {:.0} tokens.",
                name, done.units_added, done.tokens_spent
            ),
        )),
        Err(TopUpRefusal::TankFull) => {
            Err(IntentError::NothingToDo(format!("{}'s tank is already full", name)))
        }
        Err(TopUpRefusal::NoTokens) => {
            let need = space_of(ctx, worker) / TANK_UNITS_PER_TOKEN;
            Err(IntentError::InsufficientTokens {
                need,
                have: ctx.state.ledger.tokens,
            })
        }
    }
}

/// A refill brings a stalled worker back to idle.
fn wake(core: &mut WorkerCore) {
    if core.status == WorkerStatus::Stalled {
        core.status = WorkerStatus::Idle;
    }
}

fn space_of(ctx: &TickContext<'_>, worker: WorkerRef) -> f64 {
    match worker {
        WorkerRef::Manual => 0.0,
        WorkerRef::Solo => ctx.state.solo.core.tank.space(),
        WorkerRef::Agent(id) => find_agent(ctx.world, id)
            .and_then(|e| ctx.world.get::<&WorkerCore>(e).ok().map(|c| c.tank.space()))
            .unwrap_or(0.0),
    }
}

/// Flips a worker between running and shut down. Shutting down hands
/// its task back to the pool.
fn shutdown_worker(ctx: &mut TickContext<'_>, worker: WorkerRef) -> Result<LogEntry, IntentError> {
    let enabled = match worker {
        WorkerRef::Manual => return Err(IntentError::NothingToDo("you can't shut yourself down".into())),
        WorkerRef::Solo => {
            if !ctx.state.solo.unlocked {
                return Err(IntentError::NothingToDo("no AI worker yet".into()));
            }
            ctx.state.solo.core.enabled
        }
        WorkerRef::Agent(id) => {
            let entity = find_agent(ctx.world, id).ok_or(IntentError::UnknownAgent(id))?;
            ctx.world
                .get::<&WorkerCore>(entity)
                .map_err(|_| IntentError::UnknownAgent(id))?
                .enabled
        }
    };

    if enabled {
        assignment::release_worker(ctx.world, ctx.state, worker, WorkerStatus::Idle);
    }
    match worker {
        WorkerRef::Solo => ctx.state.solo.core.enabled = !enabled,
        WorkerRef::Agent(id) => {
            if let Some(entity) = find_agent(ctx.world, id) {
                if let Ok(mut core) = ctx.world.get::<&mut WorkerCore>(entity) {
                    core.enabled = !enabled;
                }
            }
        }
        WorkerRef::Manual => {}
    }

    let name = worker_label(ctx.world, worker);
    let text = if enabled {
        format!("Shut down {}.", name)
    } else {
        format!("{} is back online.", name)
    };
    Ok(ctx.state.log(LogCategory::Agent, text))
}

fn assign_agent(
    ctx: &mut TickContext<'_>,
    agent: AgentId,
    task: TaskId,
) -> Result<LogEntry, IntentError> {
    assignment::bind(ctx.world, ctx.state, task, WorkerRef::Agent(agent))?;
    let name = worker_label(ctx.world, WorkerRef::Agent(agent));
    let task_name = tasks::find(ctx.state, task).map_or("task", |t| t.name());
    Ok(ctx.state.log(
        LogCategory::Agent,
        format!("Assigned {} to \"{}\".", name, task_name),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tasks::generate_task_of;
    use crate::protocol::{RoleKind, TaskTypeKind};

    fn sim() -> Simulation {
        Simulation::new(SimConfig {
            seed: 11,
            ..SimConfig::default()
        })
        .unwrap()
    }

    fn push_task(sim: &mut Simulation, kind: TaskTypeKind) -> TaskId {
        let task = generate_task_of(&mut sim.state, &mut sim.rng, kind);
        let id = task.id;
        sim.state.tasks.push(task);
        id
    }

    #[test]
    fn advance_ignores_garbage_and_caps_catch_up() {
        let mut sim = sim();
        assert_eq!(sim.advance(f64::NAN), 0);
        assert_eq!(sim.advance(-3.0), 0);
        assert_eq!(sim.advance(0.0), 0);
        assert_eq!(sim.state.tick, 0);

        assert_eq!(sim.advance(3600.0), 50);
        assert_eq!(sim.state.tick, 50);
    }

    #[test]
    fn degenerate_tick_is_rejected_up_front() {
        for tick_seconds in [0.0, -0.1, f64::NAN] {
            let config = SimConfig {
                tick_seconds,
                ..SimConfig::default()
            };
            assert!(matches!(
                Simulation::new(config.clone()),
                Err(ConfigError::NonPositive("tick_seconds"))
            ));
            let snapshot = sim().snapshot();
            assert!(Simulation::restore(snapshot, config).is_err());
        }
    }

    #[test]
    fn advance_carries_partial_ticks() {
        let mut sim = sim();
        assert_eq!(sim.advance(0.05), 0);
        assert_eq!(sim.advance(0.05), 1);
        assert_eq!(sim.state.tick, 1);
    }

    #[test]
    fn early_task_is_worked_to_completion() {
        let mut sim = sim();
        sim.apply(Intent::DoEarlyTask).unwrap();
        assert!(matches!(
            sim.apply(Intent::DoEarlyTask),
            Err(IntentError::NothingToDo(_))
        ));

        sim.advance(5.0);
        sim.advance(5.0);
        assert_eq!(sim.state.ledger.total_tasks_done, 1);
        assert!(sim.state.ledger.cash > 0.0);
        sim.apply(Intent::DoEarlyTask).unwrap();
    }

    #[test]
    fn repeated_rejections_log_once_per_window() {
        let mut sim = sim();
        for _ in 0..5 {
            assert_eq!(
                sim.apply(Intent::ClaimTask { task: 999 }),
                Err(IntentError::UnknownTask(999))
            );
        }
        assert_eq!(sim.state.log.count_matching("no task #999"), 1);
    }

    #[test]
    fn ai_assist_is_phase_gated() {
        let mut sim = sim();
        let id = push_task(&mut sim, TaskTypeKind::Email);
        assert_eq!(
            sim.apply(Intent::AiAssist { task: id }),
            Err(IntentError::PhaseLocked { need: 2 })
        );
    }

    #[test]
    fn ai_assist_claims_and_adds_a_burst() {
        let mut sim = sim();
        sim.state.phase = 2;
        sim.state.modifiers.ai_fail_mult = 0.0;
        let id = push_task(&mut sim, TaskTypeKind::Copy);

        sim.apply(Intent::AiAssist { task: id }).unwrap();
        let task = tasks::find(&sim.state, id).unwrap();
        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(task.work_done, 3.0);
        assert_eq!(sim.state.ai_assist_count, 1);
    }

    #[test]
    fn ai_assist_costs_tokens_from_phase_three() {
        let mut sim = sim();
        sim.state.phase = 3;
        sim.state.ledger.tokens = 0.0;
        let id = push_task(&mut sim, TaskTypeKind::Copy);
        assert!(matches!(
            sim.apply(Intent::AiAssist { task: id }),
            Err(IntentError::InsufficientTokens { .. })
        ));
        assert_eq!(tasks::find(&sim.state, id).unwrap().status, TaskStatus::Available);

        sim.state.ledger.tokens = 10.0;
        sim.apply(Intent::AiAssist { task: id }).unwrap();
        // ceil(3 * 1.6) = 5
        assert_eq!(sim.state.ledger.tokens, 5.0);
    }

    #[test]
    fn top_up_wakes_a_stalled_worker() {
        let mut sim = sim();
        sim.state.solo.unlocked = true;
        sim.state.solo.core.tank.level = 0.0;
        sim.state.solo.core.status = WorkerStatus::Stalled;
        sim.state.ledger.tokens = 10.0;

        sim.apply(Intent::TopUpWorker { worker: WorkerRef::Solo }).unwrap();
        assert_eq!(sim.state.solo.core.tank.level, 20.0);
        assert_eq!(sim.state.ledger.tokens, 0.0);
        assert_eq!(sim.state.solo.core.status, WorkerStatus::Idle);

        assert!(matches!(
            sim.apply(Intent::TopUpWorker { worker: WorkerRef::Solo }),
            Err(IntentError::InsufficientTokens { .. })
        ));
        assert_eq!(sim.state.solo.core.tank.level, 20.0);
    }

    #[test]
    fn shutdown_releases_the_task_and_toggles_back() {
        let mut sim = sim();
        sim.state.solo.unlocked = true;
        let id = push_task(&mut sim, TaskTypeKind::Copy);
        assignment::bind(&mut sim.world, &mut sim.state, id, WorkerRef::Solo).unwrap();

        sim.apply(Intent::ShutdownWorker { worker: WorkerRef::Solo }).unwrap();
        assert!(!sim.state.solo.core.enabled);
        assert_eq!(sim.state.solo.core.current_task, None);
        assert_eq!(tasks::find(&sim.state, id).unwrap().status, TaskStatus::Available);

        sim.apply(Intent::ShutdownWorker { worker: WorkerRef::Solo }).unwrap();
        assert!(sim.state.solo.core.enabled);
    }

    #[test]
    fn restore_rebuilds_links_and_id_counter() {
        let mut sim = sim();
        sim.state.phase = 5;
        sim.state.ledger.cash = 1_000.0;
        sim.apply(Intent::HireAgent { role: RoleKind::Writer }).unwrap();
        let agent = agent_ids(&sim.world)[0];
        let task = push_task(&mut sim, TaskTypeKind::Article);
        sim.apply(Intent::AssignAgent { agent, task }).unwrap();

        let json = serde_json::to_string(&sim.snapshot()).unwrap();
        let mut snapshot: WorldSnapshot = serde_json::from_str(&json).unwrap();
        snapshot.state.id_counter = 1;
        // A dangling back-reference must not survive the restore.
        snapshot.agents[0].current_task = Some(4242);

        let restored = Simulation::restore(snapshot, SimConfig::default()).unwrap();
        assert_eq!(agent_ids(&restored.world), vec![agent]);
        let t = tasks::find(&restored.state, task).unwrap();
        assert_eq!(t.assigned, None);
        assert_eq!(t.status, TaskStatus::Available);
        assert!(restored.state.id_counter > task.max(agent));
    }

    #[test]
    fn offline_projection_is_capped_and_read_only() {
        let mut sim = sim();
        assert!(sim.project_offline_progress(5.0).is_none());

        sim.state.phase = 4;
        sim.state.ledger.cash = 1_000.0;
        sim.apply(Intent::HireAgent { role: RoleKind::Writer }).unwrap();
        let cash = sim.state.ledger.cash;

        let report = sim.project_offline_progress(100.0).unwrap();
        // One agent at phase 4 earns 3.0/s, at half efficiency.
        assert!((report.earned - 150.0).abs() < 1e-9);
        assert_eq!(report.expenses, 0.0);
        assert_eq!(report.net, report.earned);
        assert_eq!(sim.state.ledger.cash, cash);

        let long = sim.project_offline_progress(1.0e9).unwrap();
        assert_eq!(long.seconds, 8.0 * 3600.0);

        sim.credit_offline(&report);
        assert!((sim.state.ledger.cash - cash - 150.0).abs() < 1e-9);
    }

    #[test]
    fn notices_drain_once() {
        let mut sim = sim();
        sim.state.notify("Hello", "World");
        assert_eq!(sim.drain_notices().len(), 1);
        assert!(sim.drain_notices().is_empty());
    }
}
