use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::game::economy::Service;
use crate::game::incidents::Incident;
use crate::game::ledger::{Modifiers, ProgressFlags, ResourceLedger};
use crate::game::log::{Cooldowns, EventLog};
use crate::game::milestones::MilestoneState;
use crate::game::prestige::PrestigeState;
use crate::game::schedules::Schedule;
use crate::game::tasks::Task;
use crate::game::tokens::TokenTank;
use crate::game::upgrades::UpgradeState;
use crate::protocol::{
    AgentId, LogCategory, LogEntry, Notice, RoleKind, TaskId, Tick, TraitKind, UiReveal,
    WorkerStatus,
};

// ── Marker Components ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Agent;

// ── Agent Components ─────────────────────────────────────────────────

/// Stable id that survives snapshot/restore (entities do not).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentKey {
    pub id: AgentId,
}

#[derive(Debug, Clone)]
pub struct AgentName {
    pub name: String,
}

#[derive(Debug, Clone, Copy)]
pub struct AgentRole {
    pub role: RoleKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentStats {
    pub speed: f64,
    pub quality: f64,
    pub reliability: f64,
    pub token_cost: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct AgentTrait {
    pub kind: TraitKind,
}

#[derive(Debug, Clone)]
pub struct AgentRecord {
    pub auto_assign: bool,
    pub tasks_completed: u32,
    pub hired_at: f64,
}

// ── Worker core (shared by every automated worker) ───────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerCore {
    pub status: WorkerStatus,
    pub current_task: Option<TaskId>,
    pub tank: TokenTank,
    /// Sim-clock time the worker entered `Error`.
    pub error_since: Option<f64>,
    /// Cleared by the shutdown intent; a disabled worker never picks work.
    pub enabled: bool,
}

impl WorkerCore {
    pub fn new(tank: TokenTank) -> Self {
        Self {
            status: WorkerStatus::Idle,
            current_task: None,
            tank,
            error_since: None,
            enabled: true,
        }
    }

    /// Can take a new task right now.
    pub fn ready_for_work(&self) -> bool {
        self.enabled
            && self.status == WorkerStatus::Idle
            && self.current_task.is_none()
            && !self.tank.is_empty()
    }

    pub fn is_idle(&self) -> bool {
        self.enabled && self.status == WorkerStatus::Idle
    }
}

/// The single always-on automated worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoloWorker {
    pub unlocked: bool,
    pub core: WorkerCore,
}

// ── World State (plain structs, not ECS entities) ────────────────────

/// Sim-clock timestamps of the last rate-limited system runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timers {
    pub last_task_spawn: Option<f64>,
    pub last_incident_check: Option<f64>,
    pub last_token_buy: Option<f64>,
    pub last_manager_run: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub phase: u32,
    pub tick: Tick,
    /// Simulated seconds since the run started.
    pub clock: f64,
    pub ledger: ResourceLedger,
    pub modifiers: Modifiers,
    pub flags: ProgressFlags,
    pub revealed: BTreeSet<UiReveal>,
    pub tasks: Vec<Task>,
    pub incidents: Vec<Incident>,
    pub schedules: Vec<Schedule>,
    pub services: Vec<Service>,
    pub solo: SoloWorker,
    pub upgrades: UpgradeState,
    pub milestones: MilestoneState,
    pub prestige: PrestigeState,
    pub timers: Timers,
    pub cooldowns: Cooldowns,
    pub log: EventLog,
    /// Popups waiting for the display collaborator.
    pub notices: Vec<Notice>,
    pub ai_assist_count: u32,
    pub id_counter: u64,
}

impl GameState {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            phase: 1,
            tick: 0,
            clock: 0.0,
            ledger: ResourceLedger::default(),
            modifiers: Modifiers::default(),
            flags: ProgressFlags::default(),
            revealed: BTreeSet::new(),
            tasks: Vec::new(),
            incidents: Vec::new(),
            schedules: Vec::new(),
            services: Vec::new(),
            solo: SoloWorker {
                unlocked: false,
                core: WorkerCore::new(TokenTank::full(crate::game::agents::SOLO_TANK)),
            },
            upgrades: UpgradeState::new(),
            milestones: MilestoneState::default(),
            prestige: PrestigeState::default(),
            timers: Timers::default(),
            cooldowns: Cooldowns::default(),
            log: EventLog::new(log_capacity),
            notices: Vec::new(),
            ai_assist_count: 0,
            id_counter: 1,
        }
    }

    /// Hands out the next entity id. Ids are shared by tasks, agents,
    /// incidents and schedules.
    pub fn next_id(&mut self) -> u64 {
        let id = self.id_counter;
        self.id_counter += 1;
        id
    }

    pub fn log(&mut self, category: LogCategory, text: impl Into<String>) -> LogEntry {
        let text = text.into();
        tracing::debug!(tick = self.tick, ?category, "{}", text);
        self.log.push(self.tick, self.clock, category, text)
    }

    /// Logs only if `key` has not fired within `cooldown` seconds.
    pub fn log_limited(
        &mut self,
        key: &str,
        cooldown: f64,
        category: LogCategory,
        text: impl Into<String>,
    ) -> Option<LogEntry> {
        if self.cooldowns.ready(key, self.clock, cooldown) {
            Some(self.log(category, text))
        } else {
            None
        }
    }

    pub fn notify(&mut self, title: impl Into<String>, body: impl Into<String>) {
        self.notices.push(Notice {
            title: title.into(),
            body: body.into(),
        });
    }

    pub fn reveal(&mut self, what: UiReveal) {
        self.revealed.insert(what);
    }

    pub fn is_revealed(&self, what: UiReveal) -> bool {
        self.revealed.contains(&what)
    }

    pub fn open_incidents(&self) -> usize {
        self.incidents.iter().filter(|i| !i.resolved).count()
    }
}
