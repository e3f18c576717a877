use thiserror::Error;

use crate::protocol::{AgentId, IncidentId, RoleKind, ScheduleId, TaskId};

/// Why a user intent was rejected. Rejections never change state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IntentError {
    #[error("no task #{0}")]
    UnknownTask(TaskId),
    #[error("task #{0} is not available")]
    TaskNotAvailable(TaskId),
    #[error("no agent #{0}")]
    UnknownAgent(AgentId),
    #[error("{0:?} is not unlocked yet")]
    RoleLocked(RoleKind),
    #[error("already have a {0:?}")]
    RoleAlreadyHired(RoleKind),
    #[error("no agent slots available")]
    NoFreeSlot,
    #[error("not enough cash (need ${need:.2}, have ${have:.2})")]
    InsufficientCash { need: f64, have: f64 },
    #[error("not enough tokens (need {need:.0}, have {have:.0})")]
    InsufficientTokens { need: f64, have: f64 },
    #[error("upgrade not offered")]
    UnknownUpgrade,
    #[error("already purchased")]
    AlreadyPurchased,
    #[error("prerequisite not met: {0}")]
    PrerequisiteUnmet(String),
    #[error("agent #{0} is busy")]
    AgentBusy(AgentId),
    #[error("no incident #{0}")]
    UnknownIncident(IncidentId),
    #[error("incident #{0} is already resolved")]
    AlreadyResolved(IncidentId),
    #[error("nothing to do: {0}")]
    NothingToDo(String),
    #[error("requires phase {need}")]
    PhaseLocked { need: u32 },
    #[error("no schedule #{0}")]
    UnknownSchedule(ScheduleId),
}

impl IntentError {
    /// Cooldown key so a spammed rejection is logged once per window.
    pub fn cooldown_key(&self) -> &'static str {
        match self {
            IntentError::UnknownTask(_) => "reject:unknown_task",
            IntentError::TaskNotAvailable(_) => "reject:task_not_available",
            IntentError::UnknownAgent(_) => "reject:unknown_agent",
            IntentError::RoleLocked(_) => "reject:role_locked",
            IntentError::RoleAlreadyHired(_) => "reject:role_hired",
            IntentError::NoFreeSlot => "reject:no_slot",
            IntentError::InsufficientCash { .. } => "reject:cash",
            IntentError::InsufficientTokens { .. } => "reject:tokens",
            IntentError::UnknownUpgrade => "reject:unknown_upgrade",
            IntentError::AlreadyPurchased => "reject:purchased",
            IntentError::PrerequisiteUnmet(_) => "reject:prerequisite",
            IntentError::AgentBusy(_) => "reject:agent_busy",
            IntentError::UnknownIncident(_) => "reject:unknown_incident",
            IntentError::AlreadyResolved(_) => "reject:resolved",
            IntentError::NothingToDo(_) => "reject:nothing",
            IntentError::PhaseLocked { .. } => "reject:phase",
            IntentError::UnknownSchedule(_) => "reject:unknown_schedule",
        }
    }
}
