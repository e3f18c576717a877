use serde::{Deserialize, Serialize};

pub const STRESS_MAX: f64 = 100.0;

/// Scalar economy state. Every mutation goes through a method that keeps
/// the fields non-negative (and stress within `0..=100`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLedger {
    pub cash: f64,
    pub tokens: f64,
    pub reputation: f64,
    pub tech_debt: f64,
    pub stress: f64,

    pub total_cash_earned: f64,
    pub total_tasks_done: u64,
    pub total_clicks: u64,
    pub total_incidents: u64,
}

impl ResourceLedger {
    /// Earned income: counts towards lifetime earnings.
    pub fn earn(&mut self, amount: f64) {
        if amount > 0.0 && amount.is_finite() {
            self.cash += amount;
            self.total_cash_earned += amount;
        }
    }

    /// Debit `amount` if affordable. Returns `false` and leaves cash
    /// untouched otherwise.
    pub fn try_spend_cash(&mut self, amount: f64) -> bool {
        if amount < 0.0 || self.cash < amount {
            return false;
        }
        self.cash -= amount;
        true
    }

    /// Debit up to `amount`, flooring at zero. Returns what was taken.
    pub fn drain_cash(&mut self, amount: f64) -> f64 {
        let taken = amount.max(0.0).min(self.cash);
        self.cash -= taken;
        taken
    }

    pub fn try_spend_tokens(&mut self, amount: f64) -> bool {
        if amount < 0.0 || self.tokens < amount {
            return false;
        }
        self.tokens -= amount;
        true
    }

    pub fn drain_tokens(&mut self, amount: f64) -> f64 {
        let taken = amount.max(0.0).min(self.tokens);
        self.tokens -= taken;
        taken
    }

    pub fn grant_tokens(&mut self, amount: f64) {
        self.tokens += amount.max(0.0);
    }

    pub fn gain_reputation(&mut self, amount: f64) {
        self.reputation += amount.max(0.0);
    }

    pub fn lose_reputation(&mut self, amount: f64) {
        self.reputation = (self.reputation - amount.max(0.0)).max(0.0);
    }

    pub fn add_stress(&mut self, amount: f64) {
        self.stress = (self.stress + amount).clamp(0.0, STRESS_MAX);
    }

    pub fn add_debt(&mut self, amount: f64) {
        self.tech_debt = (self.tech_debt + amount).max(0.0);
    }
}

/// Upgrade-driven multipliers and bonuses read by the systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    pub click_power: f64,
    pub pay_mult: f64,
    /// Fraction of work shaved off newly generated tasks, capped at 0.5.
    pub work_reduction: f64,
    pub ai_fail_mult: f64,
    pub ai_power_mult: f64,
    pub token_efficiency: f64,
    pub tool_bonus: f64,
    pub code_speed_mult: f64,
    pub agent_speed_mult: f64,
    pub code_quality_mult: f64,
    pub debt_reduction: f64,
    pub drift_reduction: f64,
    pub agent_slots: u32,
    pub service_slots: u32,
    pub compute_max: u32,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            click_power: 1.0,
            pay_mult: 1.0,
            work_reduction: 0.0,
            ai_fail_mult: 1.0,
            ai_power_mult: 1.0,
            token_efficiency: 1.0,
            tool_bonus: 0.0,
            code_speed_mult: 1.0,
            agent_speed_mult: 1.0,
            code_quality_mult: 1.0,
            debt_reduction: 0.0,
            drift_reduction: 0.0,
            agent_slots: 2,
            service_slots: 0,
            compute_max: 0,
        }
    }
}

/// Persistent switches flipped by upgrades and milestones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressFlags {
    pub task_expiry_enabled: bool,
    pub expenses_revealed: bool,
    pub incidents_explained: bool,
    pub task_details: bool,
    pub manager_unlocked: bool,
    pub smart_routing: bool,
    pub swarm_mode: bool,
    pub ai_ceo: bool,
    pub retired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spending_never_goes_negative() {
        let mut ledger = ResourceLedger {
            cash: 10.0,
            tokens: 5.0,
            ..Default::default()
        };
        assert!(!ledger.try_spend_cash(10.5));
        assert_eq!(ledger.cash, 10.0);
        assert_eq!(ledger.drain_cash(25.0), 10.0);
        assert_eq!(ledger.cash, 0.0);
        assert_eq!(ledger.drain_tokens(7.0), 5.0);
        assert_eq!(ledger.tokens, 0.0);
    }

    #[test]
    fn stress_and_reputation_are_clamped() {
        let mut ledger = ResourceLedger::default();
        ledger.add_stress(150.0);
        assert_eq!(ledger.stress, STRESS_MAX);
        ledger.add_stress(-500.0);
        assert_eq!(ledger.stress, 0.0);
        ledger.gain_reputation(3.0);
        ledger.lose_reputation(10.0);
        assert_eq!(ledger.reputation, 0.0);
    }

    #[test]
    fn earn_tracks_lifetime_total() {
        let mut ledger = ResourceLedger::default();
        ledger.earn(4.5);
        ledger.earn(-3.0);
        ledger.earn(f64::NAN);
        assert_eq!(ledger.cash, 4.5);
        assert_eq!(ledger.total_cash_earned, 4.5);
    }
}
