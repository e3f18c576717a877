use serde::{Deserialize, Serialize};

use super::ledger::ResourceLedger;

/// Tank units bought by one global token.
pub const TANK_UNITS_PER_TOKEN: f64 = 2.0;

// ── Tank ────────────────────────────────────────────────────────────

/// A bounded private token buffer owned by one automated worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenTank {
    pub level: f64,
    pub capacity: f64,
}

impl TokenTank {
    pub fn full(capacity: f64) -> Self {
        Self {
            level: capacity,
            capacity,
        }
    }

    pub fn empty(capacity: f64) -> Self {
        Self {
            level: 0.0,
            capacity,
        }
    }

    pub fn space(&self) -> f64 {
        (self.capacity - self.level).max(0.0)
    }

    pub fn is_full(&self) -> bool {
        self.space() <= f64::EPSILON
    }

    pub fn is_empty(&self) -> bool {
        self.level <= f64::EPSILON
    }

    /// Fill level in `0..=1`. A zero-capacity tank reads as full.
    pub fn ratio(&self) -> f64 {
        if self.capacity <= 0.0 {
            1.0
        } else {
            (self.level / self.capacity).clamp(0.0, 1.0)
        }
    }

    /// Drains `min(level, rate * dt)` and returns the sustained fraction
    /// of the requested drain in `0..=1`. Work for the tick scales by it.
    pub fn drain(&mut self, rate: f64, dt: f64) -> f64 {
        let wanted = (rate * dt).max(0.0);
        if wanted <= 0.0 {
            return 1.0;
        }
        let taken = wanted.min(self.level.max(0.0));
        self.level = (self.level - taken).max(0.0);
        taken / wanted
    }

    /// Adds up to `units`, bounded by capacity. Returns what went in.
    pub fn fill(&mut self, units: f64) -> f64 {
        let added = units.max(0.0).min(self.space());
        self.level += added;
        added
    }

    /// Moves up to `units` out of this tank. Returns what came out.
    pub fn take(&mut self, units: f64) -> f64 {
        let taken = units.max(0.0).min(self.level);
        self.level -= taken;
        taken
    }
}

// ── Top-up ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopUpRefusal {
    TankFull,
    NoTokens,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopUp {
    pub tokens_spent: f64,
    pub units_added: f64,
}

/// Converts global tokens into tank units. Partial fills are allowed when
/// the balance cannot cover the whole gap.
pub fn top_up(tank: &mut TokenTank, ledger: &mut ResourceLedger) -> Result<TopUp, TopUpRefusal> {
    if tank.is_full() {
        return Err(TopUpRefusal::TankFull);
    }
    if ledger.tokens <= 0.0 {
        return Err(TopUpRefusal::NoTokens);
    }
    let tokens_wanted = tank.space() / TANK_UNITS_PER_TOKEN;
    let tokens_spent = ledger.drain_tokens(tokens_wanted);
    let units_added = tank.fill(tokens_spent * TANK_UNITS_PER_TOKEN);
    Ok(TopUp {
        tokens_spent,
        units_added,
    })
}

// ── Failure odds ────────────────────────────────────────────────────

/// Probability that at least one failure happens during `dt` seconds for
/// a per-second rate: `1 - (1 - rate)^dt`.
pub fn failure_chance(rate_per_sec: f64, dt: f64) -> f64 {
    if dt <= 0.0 || !rate_per_sec.is_finite() {
        return 0.0;
    }
    let rate = rate_per_sec.clamp(0.0, 1.0);
    1.0 - (1.0 - rate).powf(dt)
}
