use rand::Rng;

use crate::ecs::systems::TickContext;
use crate::game::agents::{agent_count, idle_with_role};
use crate::game::incidents::{raise_random, DECAY_GRACE, DECAY_PER_SEC};
use crate::protocol::RoleKind;

/// Seconds between periodic incident rolls.
pub fn check_interval(phase: u32, agents: usize) -> f64 {
    (60.0 - phase as f64 * 3.0 - agents as f64).max(15.0)
}

/// Chance that a periodic roll opens an incident.
pub fn periodic_chance(phase: u32, tech_debt: f64, agents: usize, drift_reduction: f64) -> f64 {
    let chance = 0.05 + phase as f64 * 0.02 + tech_debt * 0.003 + agents as f64 * 0.01;
    chance * (1.0 - drift_reduction * 0.3)
}

/// Reputation decay from stale incidents, then the periodic roll.
pub fn incident_system(ctx: &mut TickContext<'_>, dt: f64) {
    // ── Decay ────────────────────────────────────────────────────────
    let now = ctx.state.clock;
    let responders = idle_with_role(ctx.world, RoleKind::IncidentResponder) as f64;
    let decay: f64 = ctx
        .state
        .incidents
        .iter()
        .filter(|i| !i.resolved && now - i.created_at > DECAY_GRACE)
        .map(|i| DECAY_PER_SEC * dt * (1.0 - i.fix_progress / 100.0) / (1.0 + responders))
        .sum();
    if decay > 0.0 {
        ctx.state.ledger.lose_reputation(decay);
    }

    // ── Periodic generation ──────────────────────────────────────────
    let agents = agent_count(ctx.world);
    if !ctx.state.flags.incidents_explained || ctx.state.phase < 2 || agents == 0 {
        return;
    }
    let interval = check_interval(ctx.state.phase, agents);
    if let Some(last) = ctx.state.timers.last_incident_check {
        if now - last < interval {
            return;
        }
    }
    ctx.state.timers.last_incident_check = Some(now);

    let chance = periodic_chance(
        ctx.state.phase,
        ctx.state.ledger.tech_debt,
        agents,
        ctx.state.modifiers.drift_reduction,
    );
    if ctx.rng.gen::<f64>() < chance {
        raise_random(ctx, None);
    }
}
