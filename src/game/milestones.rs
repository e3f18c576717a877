use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ecs::systems::TickContext;
use crate::protocol::{LogCategory, UiReveal};

use super::tasks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MilestoneId {
    FirstTask,
    BacklogStart,
    RepUnlock,
    StressUnlock,
    UpgradesUnlock,
    ExpensesUnlock,
    IncomeDisplay,
    AiHint,
    TokensUnlock,
    AgentsUnlock,
    ComputeUnlock,
    DashboardUnlock,
    DebtUnlock,
    PrestigeUnlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    TasksDone(u64),
    Phase(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneFlag {
    TaskExpiry,
    ExpensesRevealed,
}

pub struct MilestoneDef {
    pub id: MilestoneId,
    pub trigger: Trigger,
    pub reveals: &'static [UiReveal],
    pub flags: &'static [MilestoneFlag],
    pub popup: Option<(&'static str, &'static str)>,
    pub spawn_on_trigger: u32,
}

pub fn all_milestones() -> &'static [MilestoneDef] {
    use UiReveal::*;

    static MILESTONES: &[MilestoneDef] = &[
        // ── Task-count ──────────────────────────────────────────────
        MilestoneDef {
            id: MilestoneId::FirstTask,
            trigger: Trigger::TasksDone(3),
            reveals: &[TopBar, Cash],
            flags: &[],
            popup: None,
            spawn_on_trigger: 0,
        },
        MilestoneDef {
            id: MilestoneId::BacklogStart,
            trigger: Trigger::TasksDone(5),
            reveals: &[TaskQueue],
            flags: &[],
            popup: Some(("Incoming...", "More gigs are coming in. Your inbox is filling up.")),
            spawn_on_trigger: 2,
        },
        MilestoneDef {
            id: MilestoneId::RepUnlock,
            trigger: Trigger::TasksDone(10),
            reveals: &[Reputation],
            flags: &[],
            popup: None,
            spawn_on_trigger: 0,
        },
        MilestoneDef {
            id: MilestoneId::StressUnlock,
            trigger: Trigger::TasksDone(12),
            reveals: &[Stress],
            flags: &[],
            popup: Some((
                "Pressure Building",
                "The work keeps coming. You are starting to feel the pressure.",
            )),
            spawn_on_trigger: 0,
        },
        MilestoneDef {
            id: MilestoneId::UpgradesUnlock,
            trigger: Trigger::TasksDone(20),
            reveals: &[Upgrades, Log],
            flags: &[MilestoneFlag::TaskExpiry],
            popup: Some((
                "Tools of the Trade",
                "Maybe some better tools would help you keep up...",
            )),
            spawn_on_trigger: 0,
        },
        MilestoneDef {
            id: MilestoneId::ExpensesUnlock,
            trigger: Trigger::TasksDone(90),
            reveals: &[ExpenseCard, Expenses],
            flags: &[MilestoneFlag::ExpensesRevealed],
            popup: Some((
                "Reality Check",
                "Your phone bill is due. Your car needs gas. Living costs money, even in a \
                 parking lot. Bills are now draining your cash.",
            )),
            spawn_on_trigger: 0,
        },
        MilestoneDef {
            id: MilestoneId::IncomeDisplay,
            trigger: Trigger::TasksDone(96),
            reveals: &[Income],
            flags: &[],
            popup: None,
            spawn_on_trigger: 0,
        },
        MilestoneDef {
            id: MilestoneId::AiHint,
            trigger: Trigger::TasksDone(110),
            reveals: &[],
            flags: &[],
            popup: Some((
                "There Must Be a Better Way",
                "You are getting faster, but the work never stops. Maybe there is a smarter \
                 way...",
            )),
            spawn_on_trigger: 0,
        },
        // ── Phase ───────────────────────────────────────────────────
        MilestoneDef {
            id: MilestoneId::TokensUnlock,
            trigger: Trigger::Phase(3),
            reveals: &[Tokens],
            flags: &[],
            popup: None,
            spawn_on_trigger: 0,
        },
        MilestoneDef {
            id: MilestoneId::AgentsUnlock,
            trigger: Trigger::Phase(4),
            reveals: &[Agents],
            flags: &[],
            popup: Some((
                "Delegation",
                "You can now hire AI agents to work tasks for you. Each agent has stats, \
                 traits, and specialties.",
            )),
            spawn_on_trigger: 0,
        },
        MilestoneDef {
            id: MilestoneId::ComputeUnlock,
            trigger: Trigger::Phase(6),
            reveals: &[Compute, Automation],
            flags: &[],
            popup: None,
            spawn_on_trigger: 0,
        },
        MilestoneDef {
            id: MilestoneId::DashboardUnlock,
            trigger: Trigger::Phase(7),
            reveals: &[Dashboard],
            flags: &[],
            popup: None,
            spawn_on_trigger: 0,
        },
        MilestoneDef {
            id: MilestoneId::DebtUnlock,
            trigger: Trigger::Phase(8),
            reveals: &[Debt],
            flags: &[],
            popup: None,
            spawn_on_trigger: 0,
        },
        MilestoneDef {
            id: MilestoneId::PrestigeUnlock,
            trigger: Trigger::Phase(11),
            reveals: &[Prestige],
            flags: &[],
            popup: None,
            spawn_on_trigger: 0,
        },
    ];

    MILESTONES
}

/// Milestones reached so far. Only ever grows within one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MilestoneState {
    pub reached: BTreeSet<MilestoneId>,
}

impl MilestoneState {
    pub fn has(&self, id: MilestoneId) -> bool {
        self.reached.contains(&id)
    }
}

/// Fires every milestone whose trigger is satisfied and that has not
/// fired before. Side effects run exactly once per milestone.
pub fn check_milestones(ctx: &mut TickContext<'_>) {
    for def in all_milestones() {
        if ctx.state.milestones.has(def.id) {
            continue;
        }
        let met = match def.trigger {
            Trigger::TasksDone(n) => ctx.state.ledger.total_tasks_done >= n,
            Trigger::Phase(p) => ctx.state.phase >= p,
        };
        if !met {
            continue;
        }

        ctx.state.milestones.reached.insert(def.id);
        tracing::info!(milestone = ?def.id, "milestone reached");

        for reveal in def.reveals {
            ctx.state.reveal(*reveal);
        }
        for flag in def.flags {
            match flag {
                MilestoneFlag::TaskExpiry => ctx.state.flags.task_expiry_enabled = true,
                MilestoneFlag::ExpensesRevealed => ctx.state.flags.expenses_revealed = true,
            }
        }
        for _ in 0..def.spawn_on_trigger {
            tasks::spawn_task(ctx.state, ctx.rng);
        }
        if let Some((title, body)) = def.popup {
            ctx.state.log(LogCategory::Progression, title);
            ctx.state.notify(title, body);
        }
    }
}
