use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ecs::components::{AgentRecord, AgentStats, GameState};
use crate::ecs::systems::TickContext;
use crate::protocol::{LogCategory, LogEntry, TaskId, TaskStatus, TaskTypeKind, WorkerRef};

use super::agents::find_agent;
use super::assignment;
use super::milestones::check_milestones;

// ── Task catalog ────────────────────────────────────────────────────

pub struct TaskTypeDef {
    pub kind: TaskTypeKind,
    pub name: &'static str,
    pub base_work: f64,
    pub base_pay: f64,
    pub base_rep: f64,
    pub min_phase: u32,
}

/// Returns the full catalogue of task types.
pub fn all_task_types() -> &'static [TaskTypeDef] {
    use TaskTypeKind::*;

    static TYPES: &[TaskTypeDef] = &[
        TaskTypeDef { kind: Email, name: "Write Email", base_work: 5.0, base_pay: 3.0, base_rep: 1.0, min_phase: 1 },
        TaskTypeDef { kind: Research, name: "Research Snippet", base_work: 7.0, base_pay: 5.0, base_rep: 2.0, min_phase: 1 },
        TaskTypeDef { kind: Spreadsheet, name: "Spreadsheet Entry", base_work: 6.0, base_pay: 4.0, base_rep: 1.0, min_phase: 1 },
        TaskTypeDef { kind: Social, name: "Social Media Post", base_work: 4.0, base_pay: 2.0, base_rep: 2.0, min_phase: 1 },
        TaskTypeDef { kind: Copy, name: "Copywriting", base_work: 8.0, base_pay: 7.0, base_rep: 3.0, min_phase: 1 },
        TaskTypeDef { kind: Article, name: "Blog Article", base_work: 14.0, base_pay: 15.0, base_rep: 5.0, min_phase: 3 },
        TaskTypeDef { kind: Report, name: "Data Report", base_work: 17.0, base_pay: 20.0, base_rep: 6.0, min_phase: 3 },
        TaskTypeDef { kind: Code, name: "Small Script", base_work: 20.0, base_pay: 25.0, base_rep: 7.0, min_phase: 5 },
        TaskTypeDef { kind: Integration, name: "API Integration", base_work: 28.0, base_pay: 40.0, base_rep: 10.0, min_phase: 5 },
        TaskTypeDef { kind: WebApp, name: "Mini Web App", base_work: 45.0, base_pay: 70.0, base_rep: 15.0, min_phase: 8 },
        TaskTypeDef { kind: Saas, name: "SaaS Feature", base_work: 68.0, base_pay: 110.0, base_rep: 20.0, min_phase: 9 },
    ];

    TYPES
}

pub fn task_type(kind: TaskTypeKind) -> &'static TaskTypeDef {
    // Every variant has exactly one catalogue row.
    all_task_types()
        .iter()
        .find(|t| t.kind == kind)
        .unwrap_or(&all_task_types()[0])
}

pub fn is_code_task(kind: TaskTypeKind) -> bool {
    matches!(
        kind,
        TaskTypeKind::Code | TaskTypeKind::Integration | TaskTypeKind::WebApp | TaskTypeKind::Saas
    )
}

pub fn is_research_task(kind: TaskTypeKind) -> bool {
    matches!(kind, TaskTypeKind::Research | TaskTypeKind::Report)
}

// ── Client names ────────────────────────────────────────────────────

const CLIENT_NAMES: [&str; 16] = [
    "Greg", "Linda", "Dave", "Brenda", "Mike", "Janet", "Susan", "Doug", "Cheryl", "Raj",
    "Diane", "Priya", "Javier", "Leah", "Omar", "Naomi",
];

const CLIENT_TAGS: [&str; 8] = [
    "(following up)", "(ASAP please)", "(3rd request)", "(per my last email)",
    "(circling back)", "(need this by EOD)", "(URGENT)", "(please advise)",
];

const CLIENT_DESKS: [&str; 6] = [
    "Unknown Sender", "Vendor Relations", "Reply-All Victim", "Client Escalation Desk",
    "Accounts Receivable", "Billing Dispute Queue",
];

fn pick_client(rng: &mut StdRng) -> String {
    let roll: f64 = rng.gen();
    let name = CLIENT_NAMES[rng.gen_range(0..CLIENT_NAMES.len())];
    if roll < 0.5 {
        format!("{} {}", name, CLIENT_TAGS[rng.gen_range(0..CLIENT_TAGS.len())])
    } else if roll < 0.8 {
        name.to_string()
    } else {
        CLIENT_DESKS[rng.gen_range(0..CLIENT_DESKS.len())].to_string()
    }
}

// ── Task entity ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskTypeKind,
    pub client: String,
    pub work_required: f64,
    pub work_done: f64,
    pub pay: f64,
    pub reputation_reward: f64,
    pub status: TaskStatus,
    pub created_at: f64,
    pub assigned: Option<WorkerRef>,
    /// Set once the task is `Done`; physical removal happens at this time.
    pub remove_at: Option<f64>,
}

impl Task {
    pub fn name(&self) -> &'static str {
        task_type(self.kind).name
    }

    pub fn remaining(&self) -> f64 {
        (self.work_required - self.work_done).max(0.0)
    }

    /// Adds work, clamped to `work_required`. Returns `true` once full.
    pub fn add_work(&mut self, amount: f64) -> bool {
        if amount > 0.0 && amount.is_finite() {
            self.work_done = (self.work_done + amount).min(self.work_required);
        }
        self.work_done >= self.work_required
    }

    pub fn lose_work(&mut self, amount: f64) {
        self.work_done = (self.work_done - amount.max(0.0)).max(0.0);
    }
}

// ── Generation ──────────────────────────────────────────────────────

pub fn unlocked_types(phase: u32) -> Vec<TaskTypeKind> {
    all_task_types()
        .iter()
        .filter(|t| t.min_phase <= phase)
        .map(|t| t.kind)
        .collect()
}

/// Builds a task of `kind` scaled to the current progression.
pub fn generate_task_of(
    state: &mut GameState,
    rng: &mut StdRng,
    kind: TaskTypeKind,
) -> Task {
    let def = task_type(kind);
    let tier = (state.phase as i64 - def.min_phase as i64 + 1).max(1) as f64;
    let mult = 1.0 + (tier - 1.0) * 0.5 + state.prestige.count as f64 * 0.1;
    let fatigue = 1.0 + state.ledger.total_tasks_done as f64 * 0.002;
    let work_required =
        (def.base_work * mult * fatigue * (1.0 - state.modifiers.work_reduction)).ceil().max(1.0);

    Task {
        id: state.next_id(),
        kind,
        client: pick_client(rng),
        work_required,
        work_done: 0.0,
        pay: (def.base_pay * mult * 10.0).round() / 10.0,
        reputation_reward: (def.base_rep * mult).ceil(),
        status: TaskStatus::Available,
        created_at: state.clock,
        assigned: None,
        remove_at: None,
    }
}

/// Builds a task of a random unlocked type.
pub fn generate_task(state: &mut GameState, rng: &mut StdRng) -> Task {
    let types = unlocked_types(state.phase);
    let kind = types[rng.gen_range(0..types.len())];
    generate_task_of(state, rng, kind)
}

/// An unscaled, simple phase-1 task for the early "do task" button.
pub fn generate_early_task(state: &mut GameState, rng: &mut StdRng) -> Task {
    let easy: Vec<&TaskTypeDef> = all_task_types()
        .iter()
        .filter(|t| t.min_phase == 1 && t.base_work <= 10.0)
        .collect();
    let def = easy[rng.gen_range(0..easy.len())];
    Task {
        id: state.next_id(),
        kind: def.kind,
        client: pick_client(rng),
        work_required: def.base_work,
        work_done: 0.0,
        pay: def.base_pay,
        reputation_reward: def.base_rep,
        status: TaskStatus::Available,
        created_at: state.clock,
        assigned: None,
        remove_at: None,
    }
}

/// Live-task cap, growing with experience.
pub fn max_tasks(state: &GameState) -> usize {
    if state.prestige.count > 0 {
        return 12;
    }
    match state.ledger.total_tasks_done {
        0..=9 => 3,
        10..=19 => 5,
        20..=49 => 6,
        50..=99 => 8,
        _ => 12,
    }
}

/// Seconds between automatic spawns, or `None` while the queue is hidden.
pub fn spawn_interval(state: &GameState) -> Option<f64> {
    let rep = state.ledger.reputation * 0.005;
    if state.prestige.count > 0 {
        return Some((0.8 - state.phase as f64 * 0.5 - rep).max(0.5));
    }
    if !state.revealed.contains(&crate::protocol::UiReveal::TaskQueue) {
        return None;
    }
    Some(match state.ledger.total_tasks_done {
        0..=9 => 2.0,
        10..=14 => 1.6,
        15..=19 => 1.1,
        20..=49 => 1.0,
        50..=199 => 0.5,
        _ => (0.8 - state.phase as f64 * 0.55 - rep).max(0.5),
    })
}

/// Tasks that still count towards the live cap (done tasks are logically gone).
pub fn live_count(state: &GameState) -> usize {
    state
        .tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Done)
        .count()
}

/// Pushes a freshly generated task if below the cap. Returns its id.
pub fn spawn_task(state: &mut GameState, rng: &mut StdRng) -> Option<TaskId> {
    if live_count(state) >= max_tasks(state) {
        return None;
    }
    let task = generate_task(state, rng);
    let id = task.id;
    state.tasks.push(task);
    Some(id)
}

/// Oldest available task, ties broken by id.
pub fn oldest_available(state: &GameState) -> Option<TaskId> {
    state
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Available)
        .min_by(|a, b| {
            a.created_at
                .partial_cmp(&b.created_at)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        })
        .map(|t| t.id)
}

pub fn find(state: &GameState, id: TaskId) -> Option<&Task> {
    state.tasks.iter().find(|t| t.id == id)
}

pub fn find_mut(state: &mut GameState, id: TaskId) -> Option<&mut Task> {
    state.tasks.iter_mut().find(|t| t.id == id)
}

// ── Completion ──────────────────────────────────────────────────────

/// Quality multiplier of whoever finished the task. Only agents carry a
/// quality stat; code review boosts it on code work.
fn worker_quality(ctx: &TickContext<'_>, task: &Task) -> f64 {
    let Some(WorkerRef::Agent(id)) = task.assigned else {
        return 1.0;
    };
    let quality = find_agent(ctx.world, id)
        .and_then(|e| ctx.world.get::<&AgentStats>(e).ok().map(|s| s.quality))
        .unwrap_or(1.0);
    if is_code_task(task.kind) {
        quality * ctx.state.modifiers.code_quality_mult
    } else {
        quality
    }
}

/// Pays out a finished task, frees its worker and schedules removal.
/// The task is `Done` (and out of every active count) from here on.
pub fn complete_task(ctx: &mut TickContext<'_>, task_id: TaskId) -> Option<LogEntry> {
    let task = find(ctx.state, task_id)?;
    if task.status == TaskStatus::Done {
        return None;
    }
    let quality = worker_quality(ctx, task);
    let worker = task.assigned;
    let pay = task.pay * quality * ctx.state.modifiers.pay_mult;
    let rep = (task.reputation_reward * quality).ceil();
    let name = task.name();

    assignment::finish(ctx.world, ctx.state, task_id);
    let remove_at = ctx.state.clock + ctx.config.task_removal_grace;
    if let Some(task) = find_mut(ctx.state, task_id) {
        task.remove_at = Some(remove_at);
    }
    if let Some(WorkerRef::Agent(id)) = worker {
        if let Some(entity) = find_agent(ctx.world, id) {
            if let Ok(mut record) = ctx.world.get::<&mut AgentRecord>(entity) {
                record.tasks_completed += 1;
            }
        }
    }

    let ledger = &mut ctx.state.ledger;
    ledger.earn(pay);
    ledger.gain_reputation(rep);
    ledger.total_tasks_done += 1;
    ledger.add_stress(-2.0);

    let entry = ctx.state.log(
        LogCategory::Task,
        format!("Completed \"{}\" -> +${:.2}, +{} rep", name, pay, rep),
    );
    check_milestones(ctx);
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    #[test]
    fn tier_scales_work_and_pay() {
        let mut state = GameState::new(200);
        let mut rng = rng();
        let base = generate_task_of(&mut state, &mut rng, TaskTypeKind::Email);
        assert_eq!(base.work_required, 5.0);
        assert_eq!(base.pay, 3.0);

        state.phase = 3;
        let tiered = generate_task_of(&mut state, &mut rng, TaskTypeKind::Email);
        // tier 3 => mult 2.0
        assert_eq!(tiered.work_required, 10.0);
        assert_eq!(tiered.pay, 6.0);
        assert_eq!(tiered.reputation_reward, 2.0);
    }

    #[test]
    fn fatigue_and_work_reduction_apply() {
        let mut state = GameState::new(200);
        state.ledger.total_tasks_done = 500; // fatigue 2.0
        state.modifiers.work_reduction = 0.5;
        let task = generate_task_of(&mut state, &mut rng(), TaskTypeKind::Copy);
        assert_eq!(task.work_required, 8.0);
    }

    #[test]
    fn only_unlocked_types_spawn() {
        let mut state = GameState::new(200);
        let mut rng = rng();
        state.revealed.insert(crate::protocol::UiReveal::TaskQueue);
        for _ in 0..50 {
            let task = generate_task(&mut state, &mut rng);
            assert_eq!(task_type(task.kind).min_phase, 1);
        }
    }

    #[test]
    fn spawn_respects_cap() {
        let mut state = GameState::new(200);
        let mut rng = rng();
        for _ in 0..10 {
            spawn_task(&mut state, &mut rng);
        }
        assert_eq!(state.tasks.len(), 3);
    }

    #[test]
    fn no_spawn_interval_before_queue_revealed() {
        let mut state = GameState::new(200);
        assert_eq!(spawn_interval(&state), None);
        state.revealed.insert(crate::protocol::UiReveal::TaskQueue);
        assert_eq!(spawn_interval(&state), Some(2.0));
    }

    #[test]
    fn oldest_available_breaks_ties_by_id() {
        let mut state = GameState::new(200);
        let mut rng = rng();
        let a = generate_task(&mut state, &mut rng);
        let b = generate_task(&mut state, &mut rng);
        let (a_id, b_id) = (a.id, b.id);
        state.tasks.push(b);
        state.tasks.push(a);
        assert_eq!(oldest_available(&state), Some(a_id.min(b_id)));
    }

    #[test]
    fn add_work_clamps_to_required() {
        let mut state = GameState::new(200);
        let mut task = generate_task_of(&mut state, &mut rng(), TaskTypeKind::Social);
        assert!(!task.add_work(1.5));
        assert!(task.add_work(100.0));
        assert_eq!(task.work_done, task.work_required);
        task.lose_work(100.0);
        assert_eq!(task.work_done, 0.0);
    }

    #[test]
    fn completion_pays_out_and_defers_removal() {
        use crate::ecs::systems::fixture::Fixture;

        let mut fx = Fixture::new();
        fx.state.modifiers.pay_mult = 2.0;
        fx.state.ledger.stress = 10.0;
        let task = generate_task_of(&mut fx.state, &mut fx.rng, TaskTypeKind::Copy);
        let id = task.id;
        fx.state.tasks.push(task);
        assignment::bind(&mut fx.world, &mut fx.state, id, WorkerRef::Manual).unwrap();

        assert!(complete_task(&mut fx.ctx(), id).is_some());
        assert_eq!(fx.state.ledger.cash, 14.0);
        assert_eq!(fx.state.ledger.reputation, 3.0);
        assert_eq!(fx.state.ledger.total_tasks_done, 1);
        assert_eq!(fx.state.ledger.stress, 8.0);

        let done = find(&fx.state, id).unwrap();
        assert_eq!(done.status, TaskStatus::Done);
        assert_eq!(done.assigned, None);
        assert_eq!(done.remove_at, Some(fx.config.task_removal_grace));
        assert_eq!(live_count(&fx.state), 0);

        // A second completion is a no-op.
        assert!(complete_task(&mut fx.ctx(), id).is_none());
        assert_eq!(fx.state.ledger.total_tasks_done, 1);
    }
}
