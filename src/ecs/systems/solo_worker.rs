use rand::Rng;

use crate::ecs::systems::{TickContext, WorkerModel};
use crate::game::agents::{SOLO_DRAIN_PER_SEC, SOLO_FAIL_PER_SEC, SOLO_REVERT, SOLO_WORK_PER_SEC};
use crate::game::assignment;
use crate::game::incidents;
use crate::game::tasks::{self, complete_task};
use crate::game::tokens::failure_chance;
use crate::protocol::{LogCategory, WorkerRef, WorkerStatus};

pub const SOLO_STALL_KEY: &str = "solo:stall";

/// The single always-on AI worker bought with the Pro subscription.
pub struct SoloWorkerModel;

impl WorkerModel for SoloWorkerModel {
    fn name(&self) -> &'static str {
        "solo"
    }

    fn step_tick(&self, ctx: &mut TickContext<'_>, dt: f64) {
        let solo = &ctx.state.solo;
        if !solo.unlocked || !solo.core.enabled {
            return;
        }

        // ── Out of fuel ──────────────────────────────────────────────
        if solo.core.tank.is_empty() {
            stall(ctx);
            return;
        }
        if solo.core.status == WorkerStatus::Stalled {
            ctx.state.solo.core.status = WorkerStatus::Idle;
        }

        // ── Pick the oldest available task ───────────────────────────
        if ctx.state.solo.core.current_task.is_none() {
            let Some(next) = tasks::oldest_available(ctx.state) else {
                return;
            };
            if assignment::bind(ctx.world, ctx.state, next, WorkerRef::Solo).is_err() {
                return;
            }
        }
        let Some(task_id) = ctx.state.solo.core.current_task else {
            return;
        };

        // ── Burn tokens, pro-rated when the tank runs short ──────────
        let rate = SOLO_DRAIN_PER_SEC * ctx.state.modifiers.token_efficiency;
        let sustained = ctx.state.solo.core.tank.drain(rate, dt);
        let worked = dt * sustained;

        // ── Failure roll over the time actually worked ───────────────
        let per_sec = SOLO_FAIL_PER_SEC
            * ctx.state.modifiers.ai_fail_mult
            * (1.0 + ctx.state.ledger.tech_debt * 0.005);
        if ctx.rng.gen::<f64>() < failure_chance(per_sec, worked) {
            let name = match tasks::find_mut(ctx.state, task_id) {
                Some(task) => {
                    task.lose_work(task.work_done * SOLO_REVERT);
                    task.name()
                }
                None => "task",
            };
            assignment::release(ctx.world, ctx.state, task_id, WorkerStatus::Idle);
            ctx.state.log(
                LogCategory::Incident,
                format!("AI worker hallucinated on \"{}\". Progress lost.", name),
            );
            incidents::raise_random(ctx, Some("AI worker"));
            return;
        }

        // ── Progress ─────────────────────────────────────────────────
        let amount = SOLO_WORK_PER_SEC * ctx.state.modifiers.ai_power_mult * worked;
        let full = tasks::find_mut(ctx.state, task_id)
            .map(|t| t.add_work(amount))
            .unwrap_or(false);
        if full {
            complete_task(ctx, task_id);
        } else if ctx.state.solo.core.tank.is_empty() {
            stall(ctx);
        }
    }
}

/// Hands the current task back and parks the worker until a refill.
fn stall(ctx: &mut TickContext<'_>) {
    if ctx.state.solo.core.current_task.is_some() {
        assignment::release_worker(ctx.world, ctx.state, WorkerRef::Solo, WorkerStatus::Stalled);
    } else {
        ctx.state.solo.core.status = WorkerStatus::Stalled;
    }
    let cooldown = ctx.config.stall_log_cooldown;
    ctx.state.log_limited(
        SOLO_STALL_KEY,
        cooldown,
        LogCategory::Agent,
        "AI worker stalled: out of tokens. Top it up.",
    );
}
