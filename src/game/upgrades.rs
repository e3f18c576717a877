use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ecs::components::GameState;
use crate::ecs::systems::TickContext;
use crate::error::IntentError;
use crate::protocol::{LogCategory, LogEntry};

use super::economy::{expense_tier, late_cost_multiplier, Service};
use super::milestones::check_milestones;

/// Tokens granted on entering phase 3.
pub const STARTER_TOKENS: f64 = 200.0;

// ── Upgrade identifiers ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UpgradeId {
    // Phase 1 -- scrappy tools
    PostItNotes,
    GasStationCoffee,
    StickyNoteSystem,
    SideHustle,
    InboxZero,
    GtdWorkflow,
    FocusTimer,
    DualMonitors,
    NoiseCancelling,
    FreeAi,
    // Phase 2 -- prompting
    PromptBasics,
    PromptExamples,
    MarketingCampaign,
    ProModel,
    // Phase 3 -- tokens
    TokenPack1,
    TokenOptimizer,
    Guardrails,
    TokenCompressor,
    PremiumSupport,
    TokenDistiller,
    BatchProcessing,
    BillboardCampaign,
    StructuredOutput,
    MultiBot,
    // Phase 4 -- agents
    AgentOnboarding,
    AgentSlot3,
    TaskTemplates,
    ClientCrm,
    ErrorHandling,
    AgentSlot5,
    GrowthMarketing,
    ToolUse,
    // Phase 5 -- tools
    MacroKeyboard,
    WebBrowse,
    CodeExec,
    Scheduling,
    // Phase 6 -- compute
    NeuralBoost,
    Compute1,
    Compute2,
    Management,
    // Phase 7 -- management
    ManagerAgent,
    SmartRouting,
    AgentSlot7,
    CodeAgents,
    // Phase 8 -- code
    Testing,
    CodeReview,
    Deploy,
    // Phase 9 -- services
    Server1,
    Server2,
    Fusion,
    // Phase 10 -- swarm
    Swarm,
    Consensus,
    Enterprise,
    // Phase 11 -- enterprise
    AiCeo,
    AgentSlot15,
    RetireUnlock,
    // Repeatable
    TokenPack2,
    PayDebt,
}

// ── Effects ─────────────────────────────────────────────────────────

/// One independent adjustment. Multiplicative effects multiply, slot
/// effects raise to at least the given value, fractions are capped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    ClickPower(f64),
    PayMultiplier(f64),
    WorkReduction(f64),
    AiFailMultiplier(f64),
    AiPowerMultiplier(f64),
    TokenEfficiency(f64),
    ToolBonus(f64),
    CodeSpeed(f64),
    AgentSpeed(f64),
    CodeQuality(f64),
    DebtReduction(f64),
    DriftReduction(f64),
    AgentSlots(u32),
    ServiceSlots(u32),
    ComputeSlots(u32),
    GrantTokens(f64),
    GrantReputation(f64),
    ReduceDebt(f64),
    TaskDetails,
    ManagerUnlock,
    SmartRouting,
    SwarmMode,
    AiCeo,
    UnlockSoloWorker,
}

const WORK_REDUCTION_CAP: f64 = 0.5;
const REDUCTION_CAP: f64 = 0.9;

/// The single dispatcher for upgrade effects.
pub fn apply_effect(state: &mut GameState, effect: Effect) {
    let m = &mut state.modifiers;
    match effect {
        Effect::ClickPower(x) => m.click_power *= x,
        Effect::PayMultiplier(x) => m.pay_mult *= x,
        Effect::WorkReduction(x) => {
            m.work_reduction = (m.work_reduction + x).min(WORK_REDUCTION_CAP)
        }
        Effect::AiFailMultiplier(x) => m.ai_fail_mult *= x,
        Effect::AiPowerMultiplier(x) => m.ai_power_mult *= x,
        Effect::TokenEfficiency(x) => m.token_efficiency *= x,
        Effect::ToolBonus(x) => m.tool_bonus += x,
        Effect::CodeSpeed(x) => m.code_speed_mult *= x,
        Effect::AgentSpeed(x) => m.agent_speed_mult *= x,
        Effect::CodeQuality(x) => m.code_quality_mult *= x,
        Effect::DebtReduction(x) => m.debt_reduction = (m.debt_reduction + x).min(REDUCTION_CAP),
        Effect::DriftReduction(x) => {
            m.drift_reduction = (m.drift_reduction + x).min(REDUCTION_CAP)
        }
        Effect::AgentSlots(n) => m.agent_slots = m.agent_slots.max(n),
        Effect::ServiceSlots(n) => m.service_slots = m.service_slots.max(n),
        Effect::ComputeSlots(n) => m.compute_max = m.compute_max.max(n),
        Effect::GrantTokens(n) => state.ledger.grant_tokens(n),
        Effect::GrantReputation(n) => state.ledger.gain_reputation(n),
        Effect::ReduceDebt(n) => state.ledger.add_debt(-n),
        Effect::TaskDetails => state.flags.task_details = true,
        Effect::ManagerUnlock => state.flags.manager_unlocked = true,
        Effect::SmartRouting => state.flags.smart_routing = true,
        Effect::SwarmMode => state.flags.swarm_mode = true,
        Effect::AiCeo => state.flags.ai_ceo = true,
        Effect::UnlockSoloWorker => {
            state.solo.unlocked = true;
            state.solo.core.tank.level = state.solo.core.tank.capacity;
        }
    }
}

// ── Upgrade definition ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Cash,
    Tokens,
}

pub struct UpgradeDef {
    pub id: UpgradeId,
    pub name: &'static str,
    pub description: &'static str,
    pub cost: f64,
    pub currency: Currency,
    /// Minimum phase at which the upgrade is offered.
    pub phase: u32,
    pub req_tasks: u64,
    pub req_rep: f64,
    pub effects: &'static [Effect],
    pub one_time: bool,
    pub unlock_phase: Option<u32>,
}

macro_rules! upgrade {
    ($id:ident, $name:expr, $desc:expr, $cost:expr, $phase:expr, $effects:expr) => {
        UpgradeDef {
            id: UpgradeId::$id,
            name: $name,
            description: $desc,
            cost: $cost,
            currency: Currency::Cash,
            phase: $phase,
            req_tasks: 0,
            req_rep: 0.0,
            effects: $effects,
            one_time: true,
            unlock_phase: None,
        }
    };
}

/// Returns the full catalogue of upgrades.
pub fn all_upgrades() -> &'static [UpgradeDef] {
    use Effect::*;

    static UPGRADES: &[UpgradeDef] = &[
        // ── Phase 1 ─────────────────────────────────────────────────
        UpgradeDef { req_tasks: 22, ..upgrade!(PostItNotes, "Post-It Notes", "+50% click power. Simple but effective.", 43.0, 1, &[ClickPower(1.5)]) },
        UpgradeDef { req_tasks: 24, ..upgrade!(GasStationCoffee, "Gas Station Coffee", "Tasks pay 15% more. Caffeine helps.", 51.0, 1, &[PayMultiplier(1.15)]) },
        UpgradeDef { req_tasks: 26, ..upgrade!(StickyNoteSystem, "A Box Of Paperclips", "Record who's asking for what.", 34.0, 1, &[TaskDetails]) },
        UpgradeDef { req_tasks: 30, ..upgrade!(SideHustle, "Side Hustle Optimization", "Tasks pay 20% more.", 41.0, 1, &[PayMultiplier(1.2)]) },
        UpgradeDef { req_tasks: 29, ..upgrade!(InboxZero, "Inbox Zero Method", "Tasks require 15% less work. A clear inbox, a clear mind.", 51.0, 1, &[WorkReduction(0.15)]) },
        UpgradeDef { req_tasks: 50, ..upgrade!(GtdWorkflow, "GTD Workflow", "You read 'Getting Things Done'. 2x click power.", 61.0, 1, &[ClickPower(2.0)]) },
        UpgradeDef { req_tasks: 52, ..upgrade!(FocusTimer, "Focus Timer (Pomodoro)", "Tasks require 20% less work.", 101.0, 1, &[WorkReduction(0.2)]) },
        UpgradeDef { req_tasks: 92, ..upgrade!(DualMonitors, "Dual Monitors", "More screen, same pay. It feels productive.", 80.0, 1, &[PayMultiplier(1.0)]) },
        UpgradeDef { req_tasks: 95, ..upgrade!(NoiseCancelling, "Noise-Cancelling Headphones", "Peace and quiet. Mostly placebo.", 99.0, 1, &[ClickPower(1.0)]) },
        UpgradeDef { req_tasks: 120, unlock_phase: Some(2), ..upgrade!(FreeAi, "Discover Free-Tier AI", "Unlock AI Assist on tasks. Faster but risks hallucination failures.", 210.0, 1, &[]) },
        // ── Phase 2 ─────────────────────────────────────────────────
        upgrade!(PromptBasics, "Prompt Engineering 101", "Reduce AI failure rate by 20%.", 120.0, 2, &[AiFailMultiplier(0.8)]),
        UpgradeDef { req_tasks: 120, ..upgrade!(PromptExamples, "Few-Shot Prompting", "AI assist does 30% more work per action.", 170.0, 2, &[AiPowerMultiplier(1.3)]) },
        UpgradeDef { req_tasks: 230, ..upgrade!(MarketingCampaign, "Marketing Campaign", "Your first marketing campaign! Tasks pay 60% more.", 200.0, 2, &[PayMultiplier(1.6), GrantReputation(80.0)]) },
        UpgradeDef { req_tasks: 260, unlock_phase: Some(3), ..upgrade!(ProModel, "Pro AI Subscription", "Unlock the Pro model and an always-on AI worker. Costs tokens. Unlocks Phase 3.", 500.0, 2, &[UnlockSoloWorker]) },
        // ── Phase 3 ─────────────────────────────────────────────────
        UpgradeDef { one_time: false, ..upgrade!(TokenPack1, "Token Pack (200)", "Get 200 tokens.", 110.0, 3, &[GrantTokens(200.0)]) },
        upgrade!(TokenOptimizer, "Token Optimizer", "Smarter caching cuts token use by 20%.", 150.0, 3, &[TokenEfficiency(0.8)]),
        upgrade!(Guardrails, "Output Guardrails", "Validation layer catches hallucinations. AI failure rate -30%.", 165.0, 3, &[AiFailMultiplier(0.7)]),
        UpgradeDef { req_tasks: 300, ..upgrade!(TokenCompressor, "Prompt Compression", "Prompt compacting cuts token use by 25%.", 180.0, 3, &[TokenEfficiency(0.75)]) },
        UpgradeDef { req_tasks: 335, ..upgrade!(PremiumSupport, "Premium Support", "Priority response times. Clients are thrilled.", 113.0, 3, &[GrantReputation(1.0)]) },
        UpgradeDef { req_tasks: 350, ..upgrade!(TokenDistiller, "Model Distillation", "Smaller model handles routine work. Token use -33%.", 291.0, 3, &[TokenEfficiency(0.67)]) },
        UpgradeDef { req_tasks: 351, ..upgrade!(BatchProcessing, "Batch Processing", "Queue and process work in batches. 2x click power.", 400.0, 3, &[ClickPower(2.0)]) },
        UpgradeDef { req_tasks: 353, ..upgrade!(BillboardCampaign, "Billboard", "A large advert on the side of a nearby building. Higher pay.", 500.0, 3, &[PayMultiplier(2.0), GrantReputation(1000.0)]) },
        UpgradeDef { req_tasks: 353, ..upgrade!(StructuredOutput, "Structured Outputs", "JSON mode makes task results more valuable.", 500.0, 3, &[PayMultiplier(1.35)]) },
        UpgradeDef { req_tasks: 380, unlock_phase: Some(4), ..upgrade!(MultiBot, "Multi-Bot License", "Unlock agent hiring. Phase 4 begins.", 2200.0, 3, &[]) },
        // ── Phase 4 ─────────────────────────────────────────────────
        upgrade!(AgentOnboarding, "Agent Onboarding Guide", "Better instructions for agents. +15% agent speed.", 1100.0, 4, &[AgentSpeed(1.15)]),
        upgrade!(AgentSlot3, "Agent Slot Expansion (3)", "Allow up to 3 agents.", 2200.0, 4, &[AgentSlots(3)]),
        upgrade!(TaskTemplates, "Task Templates", "Pre-written briefs. Tasks require 15% less work.", 2400.0, 4, &[WorkReduction(0.15)]),
        upgrade!(ClientCrm, "Client Tracker", "Keep clients happy. Tasks pay 40% more.", 2800.0, 4, &[PayMultiplier(1.4)]),
        upgrade!(ErrorHandling, "Error Recovery Protocol", "Agents fail less often. -20% AI failure rate.", 3200.0, 4, &[AiFailMultiplier(0.8)]),
        upgrade!(AgentSlot5, "Agent Slot Expansion (5)", "Allow up to 5 agents.", 6500.0, 4, &[AgentSlots(5)]),
        upgrade!(GrowthMarketing, "Growth Marketing Engine", "Paid ads and referral loops. Adds passive cashflow and boosts agent revenue.", 8100.0, 4, &[PayMultiplier(1.35), GrantReputation(220.0)]),
        UpgradeDef { unlock_phase: Some(5), ..upgrade!(ToolUse, "Tool Use SDK", "Agents can use tools. Unlock Phase 5.", 12000.0, 4, &[]) },
        // ── Phase 5 ─────────────────────────────────────────────────
        upgrade!(MacroKeyboard, "Macro Keyboard", "Programmable hotkeys. 3x click power.", 600.0, 5, &[ClickPower(3.0)]),
        upgrade!(WebBrowse, "Web Search Tool", "Agents can browse the web. +15% speed on research.", 400.0, 5, &[ToolBonus(0.15)]),
        upgrade!(CodeExec, "Code Execution Tool", "Agents can run code. +20% speed on code tasks.", 500.0, 5, &[CodeSpeed(1.2)]),
        UpgradeDef { unlock_phase: Some(6), ..upgrade!(Scheduling, "Job Scheduler", "Set agents to run on schedules. Unlock Phase 6.", 2000.0, 5, &[]) },
        // ── Phase 6 ─────────────────────────────────────────────────
        upgrade!(NeuralBoost, "Neural Architecture Boost", "Optimised model weights. All agents work 50% faster.", 800.0, 6, &[AgentSpeed(1.5)]),
        upgrade!(Compute1, "Compute Tier 1", "Unlock 3 compute slots for parallel jobs.", 500.0, 6, &[ComputeSlots(3)]),
        upgrade!(Compute2, "Compute Tier 2", "Upgrade to 6 compute slots.", 1200.0, 6, &[ComputeSlots(6)]),
        UpgradeDef { unlock_phase: Some(7), ..upgrade!(Management, "Agent Management Console", "Unlock manager dashboard. Phase 7.", 1000.0, 6, &[]) },
        // ── Phase 7 ─────────────────────────────────────────────────
        upgrade!(ManagerAgent, "Manager Agent Unlock", "Hire manager agents that route and refill. +1 agent slot.", 1500.0, 7, &[ManagerUnlock, AgentSlots(6)]),
        upgrade!(SmartRouting, "Smart Routing", "Manager assigns agents to any task when no specialty matches.", 1200.0, 7, &[Effect::SmartRouting]),
        upgrade!(AgentSlot7, "Agent Slot Expansion (7)", "Allow up to 7 agents.", 2000.0, 7, &[AgentSlots(7)]),
        UpgradeDef { unlock_phase: Some(8), ..upgrade!(CodeAgents, "Code-Writer Agents", "Agents can write scripts and automations. Phase 8.", 2500.0, 7, &[]) },
        // ── Phase 8 ─────────────────────────────────────────────────
        upgrade!(Testing, "Automated Testing", "Reduces technical debt growth by 30%.", 2000.0, 8, &[DebtReduction(0.3)]),
        upgrade!(CodeReview, "Code Review Bot", "Improves code agent quality by 25%.", 2000.0, 8, &[CodeQuality(1.25)]),
        UpgradeDef { unlock_phase: Some(9), ..upgrade!(Deploy, "Deployment Platform", "Deploy services for passive income. Phase 9.", 5000.0, 8, &[]) },
        // ── Phase 9 ─────────────────────────────────────────────────
        upgrade!(Server1, "Server Tier 1", "Deploy up to 2 services.", 3000.0, 9, &[ServiceSlots(2)]),
        upgrade!(Server2, "Server Tier 2", "Deploy up to 5 services.", 8000.0, 9, &[ServiceSlots(5)]),
        UpgradeDef { unlock_phase: Some(10), ..upgrade!(Fusion, "Agent Fusion Lab", "Fuse agents into composite engines. Phase 10.", 10000.0, 9, &[]) },
        // ── Phase 10 ────────────────────────────────────────────────
        upgrade!(Swarm, "Swarm Mode", "Run many cheap agents in parallel with voting.", 15000.0, 10, &[SwarmMode]),
        upgrade!(Consensus, "Consensus Engine", "Reduces alignment drift incidents.", 12000.0, 10, &[DriftReduction(0.5)]),
        UpgradeDef { unlock_phase: Some(11), ..upgrade!(Enterprise, "Enterprise License", "Full autonomous departments. Phase 11.", 25000.0, 10, &[]) },
        // ── Phase 11 ────────────────────────────────────────────────
        upgrade!(AiCeo, "AI CEO", "Meta-agent allocates budget and decides what to build.", 50000.0, 11, &[Effect::AiCeo]),
        upgrade!(AgentSlot15, "Agent Slot Expansion (15)", "Allow up to 15 agents.", 30000.0, 11, &[AgentSlots(15)]),
        UpgradeDef { unlock_phase: Some(12), ..upgrade!(RetireUnlock, "Golden Parachute", "The Retire button appears. Phase 12.", 100000.0, 11, &[]) },
        // ── Repeatable ──────────────────────────────────────────────
        UpgradeDef { one_time: false, ..upgrade!(TokenPack2, "Token Pack (500)", "Get 500 tokens.", 300.0, 3, &[GrantTokens(500.0)]) },
        UpgradeDef { one_time: false, ..upgrade!(PayDebt, "Pay Down Tech Debt", "Reduce tech debt by 15.", 200.0, 8, &[ReduceDebt(15.0)]) },
    ];

    UPGRADES
}

/// Looks up a single upgrade definition by id.
pub fn get_upgrade(id: UpgradeId) -> Option<&'static UpgradeDef> {
    all_upgrades().iter().find(|u| u.id == id)
}

/// Price after the late-game multiplier (applies to phase 4+ entries).
pub fn upgrade_cost(def: &UpgradeDef, state: &GameState) -> f64 {
    if def.currency != Currency::Cash || def.phase < 4 {
        return def.cost;
    }
    (def.cost * late_cost_multiplier(state)).ceil()
}

// ── Player upgrade state ────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpgradeState {
    pub purchased: BTreeSet<UpgradeId>,
}

impl UpgradeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the upgrade has been purchased.
    pub fn has(&self, id: UpgradeId) -> bool {
        self.purchased.contains(&id)
    }

    /// Checks everything except price.
    pub fn check_prerequisites(&self, def: &UpgradeDef, state: &GameState) -> Result<(), IntentError> {
        if def.one_time && self.has(def.id) {
            return Err(IntentError::AlreadyPurchased);
        }
        if def.phase > state.phase {
            return Err(IntentError::PhaseLocked { need: def.phase });
        }
        if state.ledger.total_tasks_done < def.req_tasks {
            return Err(IntentError::PrerequisiteUnmet(format!(
                "{} tasks completed",
                def.req_tasks
            )));
        }
        if def.req_rep > 0.0 && state.ledger.reputation < def.req_rep {
            return Err(IntentError::PrerequisiteUnmet(format!(
                "{} reputation",
                def.req_rep
            )));
        }
        Ok(())
    }
}

/// Upgrades the player could buy right now if they had the money.
pub fn offered(state: &GameState) -> Vec<UpgradeId> {
    all_upgrades()
        .iter()
        .filter(|def| state.upgrades.check_prerequisites(def, state).is_ok())
        .map(|def| def.id)
        .collect()
}

// ── Purchase ────────────────────────────────────────────────────────

/// Validate, debit, record, apply effects, then advance the phase if the
/// upgrade unlocks one.
pub fn buy_upgrade(ctx: &mut TickContext<'_>, id: UpgradeId) -> Result<LogEntry, IntentError> {
    let def = get_upgrade(id).ok_or(IntentError::UnknownUpgrade)?;
    ctx.state.upgrades.check_prerequisites(def, ctx.state)?;

    let cost = upgrade_cost(def, ctx.state);
    let ledger = &mut ctx.state.ledger;
    match def.currency {
        Currency::Cash => {
            if !ledger.try_spend_cash(cost) {
                return Err(IntentError::InsufficientCash {
                    need: cost,
                    have: ledger.cash,
                });
            }
        }
        Currency::Tokens => {
            if !ledger.try_spend_tokens(cost) {
                return Err(IntentError::InsufficientTokens {
                    need: cost,
                    have: ledger.tokens,
                });
            }
        }
    }

    if def.one_time {
        ctx.state.upgrades.purchased.insert(id);
    }
    for effect in def.effects {
        apply_effect(ctx.state, *effect);
    }
    if let Some(next) = def.unlock_phase {
        if next > ctx.state.phase {
            enter_phase(ctx, next, def.name, def.description);
        }
    }

    tracing::info!(upgrade = ?id, cost, "upgrade purchased");
    let entry = ctx
        .state
        .log(LogCategory::Progression, format!("Purchased: {}", def.name));
    check_milestones(ctx);
    Ok(entry)
}

/// Raises the phase and grants its one-time entry bonuses.
pub fn enter_phase(ctx: &mut TickContext<'_>, phase: u32, title: &str, description: &str) {
    let state = &mut *ctx.state;
    state.phase = phase;
    tracing::info!(phase, "phase unlocked");
    state.log(LogCategory::Progression, format!("PHASE {} UNLOCKED!", phase));

    let mut body = description.to_string();
    if phase == 3 {
        state.ledger.grant_tokens(STARTER_TOKENS);
        body.push_str(&format!(
            "\n\nYou start with {} tokens. AI work burns tokens over time. Buy token packs to \
             keep up, or you will stall out.",
            STARTER_TOKENS
        ));
    }
    if state.flags.expenses_revealed {
        let tier = expense_tier(phase);
        body.push_str(&format!(
            "\n\nLifestyle upgraded to: {}. Expenses are now ${:.2}/s.",
            tier.name, tier.rate
        ));
    }
    if phase == 9 {
        state.modifiers.agent_speed_mult *= 6.0;
        state.modifiers.pay_mult *= 3.0;
        body.push_str("\n\nInfrastructure scaling kicks in: agent speed and task pay surge.");
    }
    if phase >= 9 && state.services.is_empty() {
        let id = state.next_id();
        state.services.push(Service {
            id,
            name: "Content Engine v1".into(),
            income_rate: 5.0,
            active: true,
        });
        state.log(
            LogCategory::Economy,
            "Deployed: Content Engine v1 (+$5/s passive income)",
        );
    }
    state.notify(title, body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::systems::fixture::Fixture;

    #[test]
    fn every_id_has_a_definition() {
        let ids: BTreeSet<UpgradeId> = all_upgrades().iter().map(|u| u.id).collect();
        assert_eq!(ids.len(), all_upgrades().len());
        assert!(get_upgrade(UpgradeId::PayDebt).is_some());
        assert!(get_upgrade(UpgradeId::PostItNotes).is_some());
    }

    #[test]
    fn unmet_prerequisite_changes_nothing() {
        let mut fx = Fixture::new();
        fx.state.ledger.cash = 1000.0;
        let result = buy_upgrade(&mut fx.ctx(), UpgradeId::PostItNotes);
        assert!(matches!(result, Err(IntentError::PrerequisiteUnmet(_))));
        assert_eq!(fx.state.ledger.cash, 1000.0);
        assert!(!fx.state.upgrades.has(UpgradeId::PostItNotes));
        assert_eq!(fx.state.modifiers.click_power, 1.0);
    }

    #[test]
    fn one_time_upgrade_cannot_be_bought_twice() {
        let mut fx = Fixture::new();
        fx.state.ledger.cash = 1000.0;
        fx.state.ledger.total_tasks_done = 22;
        buy_upgrade(&mut fx.ctx(), UpgradeId::PostItNotes).unwrap();
        assert_eq!(fx.state.ledger.cash, 957.0);
        assert_eq!(fx.state.modifiers.click_power, 1.5);

        assert_eq!(
            buy_upgrade(&mut fx.ctx(), UpgradeId::PostItNotes),
            Err(IntentError::AlreadyPurchased)
        );
        assert_eq!(fx.state.ledger.cash, 957.0);
        assert_eq!(fx.state.modifiers.click_power, 1.5);
    }

    #[test]
    fn repeatable_upgrades_stack() {
        let mut fx = Fixture::at_phase(3);
        fx.state.ledger.cash = 1000.0;
        buy_upgrade(&mut fx.ctx(), UpgradeId::TokenPack1).unwrap();
        buy_upgrade(&mut fx.ctx(), UpgradeId::TokenPack1).unwrap();
        assert_eq!(fx.state.ledger.tokens, 400.0);
        assert_eq!(fx.state.ledger.cash, 780.0);
        assert!(!fx.state.upgrades.has(UpgradeId::TokenPack1));
    }

    #[test]
    fn phase_unlock_grants_starter_tokens_and_solo_worker() {
        let mut fx = Fixture::at_phase(2);
        fx.state.ledger.cash = 500.0;
        fx.state.ledger.total_tasks_done = 260;
        buy_upgrade(&mut fx.ctx(), UpgradeId::ProModel).unwrap();
        assert_eq!(fx.state.phase, 3);
        assert_eq!(fx.state.ledger.tokens, STARTER_TOKENS);
        assert!(fx.state.solo.unlocked);
        assert!(fx.state.notices.iter().any(|n| n.title == "Pro AI Subscription"));
    }

    #[test]
    fn capped_and_max_effects() {
        let mut fx = Fixture::new();
        apply_effect(&mut fx.state, Effect::WorkReduction(0.4));
        apply_effect(&mut fx.state, Effect::WorkReduction(0.4));
        assert_eq!(fx.state.modifiers.work_reduction, 0.5);

        apply_effect(&mut fx.state, Effect::AgentSlots(5));
        apply_effect(&mut fx.state, Effect::AgentSlots(3));
        assert_eq!(fx.state.modifiers.agent_slots, 5);

        fx.state.ledger.tech_debt = 10.0;
        apply_effect(&mut fx.state, Effect::ReduceDebt(15.0));
        assert_eq!(fx.state.ledger.tech_debt, 0.0);
    }

    #[test]
    fn late_upgrades_cost_more() {
        let mut fx = Fixture::at_phase(6);
        let def = get_upgrade(UpgradeId::NeuralBoost).unwrap();
        // 800 * 1.24
        assert_eq!(upgrade_cost(def, &fx.state), 992.0);
        let early = get_upgrade(UpgradeId::TokenPack2).unwrap();
        assert_eq!(upgrade_cost(early, &fx.state), 300.0);
        fx.state.phase = 4;
        assert_eq!(upgrade_cost(def, &fx.state), 800.0);
    }

    #[test]
    fn entering_phase_nine_deploys_a_service() {
        let mut fx = Fixture::at_phase(8);
        enter_phase(&mut fx.ctx(), 9, "Deployment Platform", "");
        assert_eq!(fx.state.services.len(), 1);
        assert_eq!(fx.state.modifiers.agent_speed_mult, 6.0);
        assert_eq!(fx.state.modifiers.pay_mult, 3.0);
    }
}
