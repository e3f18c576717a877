//! The task ↔ worker index. Every change to `Task::assigned` or
//! `WorkerCore::current_task` goes through here so the two sides never
//! drift apart.

use hecs::World;

use crate::ecs::components::{AgentKey, AgentRole, GameState, WorkerCore};
use crate::error::IntentError;
use crate::protocol::{TaskId, TaskStatus, WorkerRef, WorkerStatus};

use super::agents::find_agent;
use super::tasks;

fn with_core<R>(
    world: &mut World,
    state: &mut GameState,
    worker: WorkerRef,
    f: impl FnOnce(&mut WorkerCore) -> R,
) -> Option<R> {
    match worker {
        WorkerRef::Manual => None,
        WorkerRef::Solo => Some(f(&mut state.solo.core)),
        WorkerRef::Agent(id) => {
            let entity = find_agent(world, id)?;
            let mut core = world.get::<&mut WorkerCore>(entity).ok()?;
            Some(f(&mut *core))
        }
    }
}

/// The task a worker currently holds, if any.
pub fn current_task(world: &World, state: &GameState, worker: WorkerRef) -> Option<TaskId> {
    match worker {
        WorkerRef::Manual => None,
        WorkerRef::Solo => state.solo.core.current_task,
        WorkerRef::Agent(id) => {
            let entity = find_agent(world, id)?;
            let core = world.get::<&WorkerCore>(entity).ok()?;
            core.current_task
        }
    }
}

/// Binds an available task to `worker`, updating both sides.
///
/// # Errors
///
/// The task must exist and be `Available`; automated workers must be
/// idle, enabled and fuelled.
pub fn bind(
    world: &mut World,
    state: &mut GameState,
    task_id: TaskId,
    worker: WorkerRef,
) -> Result<(), IntentError> {
    let task = tasks::find(state, task_id).ok_or(IntentError::UnknownTask(task_id))?;
    if task.status != TaskStatus::Available {
        return Err(IntentError::TaskNotAvailable(task_id));
    }

    let status = match worker {
        WorkerRef::Manual => TaskStatus::Active,
        WorkerRef::Solo => {
            let core = &state.solo.core;
            if !state.solo.unlocked {
                return Err(IntentError::NothingToDo("no AI worker yet".into()));
            }
            if !core.ready_for_work() {
                return Err(IntentError::NothingToDo("AI worker is not ready".into()));
            }
            TaskStatus::Ai
        }
        WorkerRef::Agent(id) => {
            let entity = find_agent(world, id).ok_or(IntentError::UnknownAgent(id))?;
            let role = world
                .get::<&AgentRole>(entity)
                .map_err(|_| IntentError::UnknownAgent(id))?
                .role;
            if role.is_coordinator() {
                return Err(IntentError::NothingToDo(format!("{:?} does not take tasks", role)));
            }
            let core = world
                .get::<&WorkerCore>(entity)
                .map_err(|_| IntentError::UnknownAgent(id))?;
            if core.is_idle() && core.current_task.is_none() && core.tank.is_empty() {
                return Err(IntentError::NothingToDo("agent tank is empty".into()));
            }
            if !core.ready_for_work() {
                return Err(IntentError::AgentBusy(id));
            }
            TaskStatus::Agent
        }
    };

    with_core(world, state, worker, |core| {
        core.current_task = Some(task_id);
        core.status = WorkerStatus::Working;
    });
    if let Some(task) = tasks::find_mut(state, task_id) {
        task.status = status;
        task.assigned = Some(worker);
    }
    Ok(())
}

/// Returns an in-flight task to the pool and frees its worker, who moves
/// to `worker_status`. Done tasks keep their status.
pub fn release(
    world: &mut World,
    state: &mut GameState,
    task_id: TaskId,
    worker_status: WorkerStatus,
) -> Option<WorkerRef> {
    let clock = state.clock;
    let task = tasks::find_mut(state, task_id)?;
    let worker = task.assigned.take();
    if task.status != TaskStatus::Done {
        task.status = TaskStatus::Available;
    }
    if let Some(worker) = worker {
        free_core(world, state, worker, task_id, worker_status, clock);
    }
    worker
}

/// Frees `worker` and whatever task it holds.
pub fn release_worker(
    world: &mut World,
    state: &mut GameState,
    worker: WorkerRef,
    worker_status: WorkerStatus,
) -> Option<TaskId> {
    let held = current_task(world, state, worker);
    match held {
        Some(task_id) if tasks::find(state, task_id).is_some() => {
            release(world, state, task_id, worker_status);
        }
        _ => {
            let clock = state.clock;
            with_core(world, state, worker, |core| {
                core.current_task = None;
                set_status(core, worker_status, clock);
            });
        }
    }
    held
}

/// Marks `task_id` done and frees its worker back to idle.
pub fn finish(world: &mut World, state: &mut GameState, task_id: TaskId) -> Option<WorkerRef> {
    let clock = state.clock;
    let task = tasks::find_mut(state, task_id)?;
    task.status = TaskStatus::Done;
    task.work_done = task.work_required;
    let worker = task.assigned.take();
    if let Some(worker) = worker {
        free_core(world, state, worker, task_id, WorkerStatus::Idle, clock);
    }
    worker
}

fn free_core(
    world: &mut World,
    state: &mut GameState,
    worker: WorkerRef,
    task_id: TaskId,
    status: WorkerStatus,
    clock: f64,
) {
    with_core(world, state, worker, |core| {
        if core.current_task == Some(task_id) {
            core.current_task = None;
        }
        set_status(core, status, clock);
    });
}

fn set_status(core: &mut WorkerCore, status: WorkerStatus, clock: f64) {
    core.status = status;
    core.error_since = if status == WorkerStatus::Error {
        Some(clock)
    } else {
        None
    };
}

/// Re-derives both sides of the index after a restore. Any reference that
/// is not mirrored by the other side is dropped. Returns the number of
/// repairs made.
pub fn repair(world: &mut World, state: &mut GameState) -> usize {
    let mut repairs = 0;

    // Worker side: every held task must exist, be in flight and point back.
    let agents: Vec<(hecs::Entity, u64)> = world
        .query::<&AgentKey>()
        .iter()
        .map(|(e, k)| (e, k.id))
        .collect();
    let mut holders: Vec<(WorkerRef, Option<TaskId>)> = agents
        .iter()
        .map(|&(entity, id)| {
            let held = world
                .get::<&WorkerCore>(entity)
                .ok()
                .and_then(|c| c.current_task);
            (WorkerRef::Agent(id), held)
        })
        .collect();
    holders.push((WorkerRef::Solo, state.solo.core.current_task));

    for (worker, held) in holders {
        let consistent = held.map_or(true, |task_id| {
            tasks::find(state, task_id).map_or(false, |t| {
                t.status.is_in_flight() && t.assigned == Some(worker)
            })
        });
        let locked_solo = worker == WorkerRef::Solo && !state.solo.unlocked && held.is_some();
        if !consistent || locked_solo {
            let clock = state.clock;
            with_core(world, state, worker, |core| {
                core.current_task = None;
                set_status(core, WorkerStatus::Idle, clock);
            });
            repairs += 1;
        } else if held.is_none() {
            // A working worker with nothing to work on is idle.
            let clock = state.clock;
            with_core(world, state, worker, |core| {
                if core.status == WorkerStatus::Working || core.status == WorkerStatus::Stalled {
                    set_status(core, WorkerStatus::Idle, clock);
                }
            });
        }
    }

    // Task side: every assignment must be mirrored by its worker.
    let task_ids: Vec<TaskId> = state.tasks.iter().map(|t| t.id).collect();
    for task_id in task_ids {
        let (assigned, status) = match tasks::find(state, task_id) {
            Some(t) => (t.assigned, t.status),
            None => continue,
        };
        let mirrored = match assigned {
            None => !status.is_in_flight(),
            Some(WorkerRef::Manual) => status == TaskStatus::Active,
            Some(worker) => current_task(world, state, worker) == Some(task_id),
        };
        if !mirrored {
            if let Some(task) = tasks::find_mut(state, task_id) {
                task.assigned = None;
                if task.status != TaskStatus::Done {
                    task.status = TaskStatus::Available;
                }
            }
            repairs += 1;
        }
        // Finished tasks never hold a worker.
        if status == TaskStatus::Done {
            if let Some(task) = tasks::find_mut(state, task_id) {
                task.assigned = None;
            }
        }
    }

    repairs
}
