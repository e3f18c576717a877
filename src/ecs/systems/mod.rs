pub mod agent_tick;
pub mod coordinator;
pub mod economy;
pub mod incidents;
pub mod manual;
pub mod orchestration;
pub mod prune;
pub mod solo_worker;
pub mod spawn;

use hecs::World;
use rand::rngs::StdRng;

use crate::config::SimConfig;
use crate::ecs::components::GameState;

/// Everything a system may touch during one step. Borrowed from the
/// `Simulation` for the duration of a tick or an intent.
pub struct TickContext<'a> {
    pub world: &'a mut World,
    pub state: &'a mut GameState,
    pub rng: &'a mut StdRng,
    pub config: &'a SimConfig,
}

/// One kind of worker advancing tasks for `dt` seconds.
pub trait WorkerModel {
    fn name(&self) -> &'static str;
    fn step_tick(&self, ctx: &mut TickContext<'_>, dt: f64);
}

/// Runs one fixed step. The order is part of the contract: later
/// systems see what earlier ones produced this tick.
pub fn run_tick(ctx: &mut TickContext<'_>, dt: f64) {
    ctx.state.tick += 1;
    ctx.state.clock += dt;

    spawn::spawn_system(ctx);
    step(&manual::ManualWorker, ctx, dt);
    step(&solo_worker::SoloWorkerModel, ctx, dt);
    step(&coordinator::Manager, ctx, dt);
    coordinator::auto_assign_system(ctx);
    step(&agent_tick::AgentPool, ctx, dt);
    step(&coordinator::TokenManager, ctx, dt);
    incidents::incident_system(ctx, dt);
    step(&coordinator::IncidentResponder, ctx, dt);
    economy::income_system(ctx, dt);
    economy::expense_system(ctx, dt);
    economy::debt_system(ctx, dt);
    economy::stress_system(ctx, dt);
    orchestration::orchestration_system(ctx);
    prune::prune_system(ctx);
    crate::game::milestones::check_milestones(ctx);
}

fn step(model: &dyn WorkerModel, ctx: &mut TickContext<'_>, dt: f64) {
    tracing::trace!(model = model.name(), tick = ctx.state.tick, "worker step");
    model.step_tick(ctx, dt);
}
