use serde::{Deserialize, Serialize};

use crate::ecs::components::GameState;
use crate::game::upgrades::UpgradeId;

// ── Core type aliases ──────────────────────────────────────────────

pub type TaskId = u64;
pub type AgentId = u64;
pub type IncidentId = u64;
pub type ScheduleId = u64;
pub type Tick = u64;

// ── Tasks ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskTypeKind {
    Email,
    Research,
    Spreadsheet,
    Social,
    Copy,
    Article,
    Report,
    Code,
    Integration,
    WebApp,
    Saas,
}

/// `Available → {Active | Ai | Agent} → Done`. Expired tasks are removed
/// outright and never carry a status of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Available,
    /// Claimed for manual work.
    Active,
    /// Held by the automated solo worker.
    Ai,
    /// Held by a hired agent.
    Agent,
    Done,
}

impl TaskStatus {
    /// In-flight or finished tasks are immune to expiry.
    pub fn is_in_flight(self) -> bool {
        matches!(self, TaskStatus::Active | TaskStatus::Ai | TaskStatus::Agent)
    }
}

// ── Workers ────────────────────────────────────────────────────────

/// Non-owning reference from a task to whoever is working it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerRef {
    Manual,
    Solo,
    Agent(AgentId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerStatus {
    Idle,
    Working,
    Error,
    /// Tank ran dry; the task has already been released. Behaves like
    /// `Idle` for routing (an empty tank is never ready for work) and stays
    /// visible until a refill.
    Stalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    Writer,
    Researcher,
    Coder,
    Analyst,
    Support,
    Sales,
    DevOps,
    Manager,
    TokenManager,
    IncidentResponder,
}

impl RoleKind {
    pub fn is_coordinator(self) -> bool {
        matches!(
            self,
            RoleKind::Manager | RoleKind::TokenManager | RoleKind::IncidentResponder
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraitKind {
    Overconfident,
    Pedantic,
    Sloppy,
    ToolObsessed,
    Frugal,
    Hallucinator,
    Perfectionist,
    Chaotic,
}

// ── Incidents ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentKind {
    Hallucination,
    TokenBurn,
    WrongEmail,
    Conflict,
    Outage,
    Drift,
    Overcharge,
    DataLeak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolveMethod {
    /// Free, costs stress.
    Manual,
    /// Costs twice the incident's cash cost.
    Cash,
}

// ── Progressive reveal ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UiReveal {
    TopBar,
    Cash,
    TaskQueue,
    Reputation,
    Stress,
    Upgrades,
    Log,
    ExpenseCard,
    Expenses,
    Income,
    Tokens,
    Agents,
    Compute,
    Automation,
    Dashboard,
    Debt,
    Prestige,
    Incidents,
}

/// A one-shot message for the popup collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

// ── Logging ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub tick: Tick,
    /// Simulation clock, in seconds.
    pub at: f64,
    pub text: String,
    pub category: LogCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogCategory {
    System,
    Task,
    Agent,
    Economy,
    Incident,
    Progression,
}

// ── Economy ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomySnapshot {
    pub cash: f64,
    pub tokens: f64,
    pub income_per_sec: f64,
    pub expenditure_per_sec: f64,
}

/// One-shot "welcome back" estimate. Never mutates the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineReport {
    pub seconds: f64,
    pub earned: f64,
    pub expenses: f64,
    pub net: f64,
    pub scheduled_runs: u64,
}

// ── Snapshot ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub name: String,
    pub role: RoleKind,
    pub trait_kind: TraitKind,
    pub speed: f64,
    pub quality: f64,
    pub reliability: f64,
    pub token_cost: f64,
    pub status: WorkerStatus,
    pub current_task: Option<TaskId>,
    pub tank_level: f64,
    pub tank_capacity: f64,
    pub error_since: Option<f64>,
    pub enabled: bool,
    pub auto_assign: bool,
    pub tasks_completed: u32,
    pub hired_at: f64,
}

/// Plain, serializable world state. Restoring re-derives every
/// task/worker back-reference instead of trusting the stored ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub state: GameState,
    pub agents: Vec<AgentSnapshot>,
}

// ── UI → engine messages ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    DoEarlyTask,
    ClaimTask { task: TaskId },
    AiAssist { task: TaskId },
    TopUpWorker { worker: WorkerRef },
    ShutdownWorker { worker: WorkerRef },
    HireAgent { role: RoleKind },
    FireAgent { agent: AgentId },
    AssignAgent { agent: AgentId, task: TaskId },
    ToggleAutoAssign { agent: AgentId },
    BuyUpgrade { upgrade: UpgradeId },
    ResolveIncident { incident: IncidentId, method: ResolveMethod },
    AddSchedule,
    ToggleSchedule { schedule: ScheduleId },
    RemoveSchedule { schedule: ScheduleId },
    Prestige,
    Retire,
}
