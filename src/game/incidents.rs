use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ecs::systems::TickContext;
use crate::error::IntentError;
use crate::protocol::{IncidentId, IncidentKind, LogCategory, LogEntry, ResolveMethod, Severity, UiReveal};

/// Age after which an open incident starts eating reputation.
pub const DECAY_GRACE: f64 = 10.0;
/// Reputation lost per second per open incident past its grace period.
pub const DECAY_PER_SEC: f64 = 0.1;
pub const MANUAL_RESOLVE_STRESS: f64 = 10.0;
/// Cash cost charged for paid resolution when the incident has none.
pub const DEFAULT_CASH_COST: f64 = 20.0;
pub const PAID_RESOLVE_MULT: f64 = 2.0;

// ── Templates ───────────────────────────────────────────────────────

pub struct IncidentTemplate {
    pub kind: IncidentKind,
    pub name: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub reputation_cost: f64,
    pub cash_cost: f64,
    pub token_cost: f64,
    pub min_phase: u32,
}

pub fn all_templates() -> &'static [IncidentTemplate] {
    use IncidentKind::*;
    use Severity::*;

    static TEMPLATES: &[IncidentTemplate] = &[
        IncidentTemplate { kind: Hallucination, name: "Hallucinated Output Published", description: "An agent published confident nonsense to a client.", severity: Critical, reputation_cost: 5.0, cash_cost: 0.0, token_cost: 0.0, min_phase: 2 },
        IncidentTemplate { kind: TokenBurn, name: "Token Budget Exceeded", description: "An agent entered a reasoning loop and burned through tokens.", severity: Warning, reputation_cost: 0.0, cash_cost: 0.0, token_cost: 50.0, min_phase: 3 },
        IncidentTemplate { kind: WrongEmail, name: "Wrong Email Sent", description: "An agent emailed the wrong client with another client's data.", severity: Critical, reputation_cost: 8.0, cash_cost: 0.0, token_cost: 0.0, min_phase: 5 },
        IncidentTemplate { kind: Conflict, name: "Agent Conflict", description: "Two agents overwrote each other's work.", severity: Warning, reputation_cost: 3.0, cash_cost: 0.0, token_cost: 0.0, min_phase: 7 },
        IncidentTemplate { kind: Outage, name: "Deployment Outage", description: "A deployed service went down. Clients are unhappy.", severity: Critical, reputation_cost: 10.0, cash_cost: 20.0, token_cost: 0.0, min_phase: 9 },
        IncidentTemplate { kind: Drift, name: "Alignment Drift", description: "Agents optimised for the wrong metric. Output quality dropped.", severity: Warning, reputation_cost: 4.0, cash_cost: 0.0, token_cost: 0.0, min_phase: 10 },
        IncidentTemplate { kind: Overcharge, name: "Billing Spike", description: "Compute costs surged from an unoptimised workflow.", severity: Warning, reputation_cost: 0.0, cash_cost: 30.0, token_cost: 0.0, min_phase: 6 },
        IncidentTemplate { kind: DataLeak, name: "Data Mix-up", description: "Training data from one client leaked into another's output.", severity: Critical, reputation_cost: 12.0, cash_cost: 0.0, token_cost: 0.0, min_phase: 8 },
    ];

    TEMPLATES
}

pub fn template(kind: IncidentKind) -> &'static IncidentTemplate {
    all_templates()
        .iter()
        .find(|t| t.kind == kind)
        .unwrap_or(&all_templates()[0])
}

// ── Incident ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub kind: IncidentKind,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub reputation_cost: f64,
    pub cash_cost: f64,
    pub token_cost: f64,
    /// `0..=100`; an incident auto-resolves when it reaches 100.
    pub fix_progress: f64,
    pub resolved: bool,
    pub created_at: f64,
    pub remove_at: Option<f64>,
}

impl Incident {
    pub fn from_template(id: IncidentId, tmpl: &IncidentTemplate, created_at: f64) -> Self {
        Self {
            id,
            kind: tmpl.kind,
            name: tmpl.name.to_string(),
            description: tmpl.description.to_string(),
            severity: tmpl.severity,
            reputation_cost: tmpl.reputation_cost,
            cash_cost: tmpl.cash_cost,
            token_cost: tmpl.token_cost,
            fix_progress: 0.0,
            resolved: false,
            created_at,
            remove_at: None,
        }
    }

    /// Cash charged by the paid resolution path.
    pub fn paid_resolution_cost(&self) -> f64 {
        let base = if self.cash_cost > 0.0 {
            self.cash_cost
        } else {
            DEFAULT_CASH_COST
        };
        base * PAID_RESOLVE_MULT
    }
}

// ── Creation ────────────────────────────────────────────────────────

/// Applies the immediate half penalty, then records the incident.
pub fn open_incident(ctx: &mut TickContext<'_>, incident: Incident) -> IncidentId {
    let ledger = &mut ctx.state.ledger;
    if incident.reputation_cost > 0.0 {
        ledger.lose_reputation((incident.reputation_cost / 2.0).ceil());
    }
    if incident.cash_cost > 0.0 {
        ledger.drain_cash(incident.cash_cost / 2.0);
    }
    if incident.token_cost > 0.0 {
        ledger.drain_tokens(incident.token_cost / 2.0);
    }
    record(ctx, incident)
}

fn record(ctx: &mut TickContext<'_>, mut incident: Incident) -> IncidentId {
    let state = &mut *ctx.state;
    incident.created_at = state.clock;
    state.ledger.total_incidents += 1;
    state.flags.incidents_explained = true;
    state.reveal(UiReveal::Incidents);
    tracing::warn!(kind = ?incident.kind, id = incident.id, "incident opened");
    state.log(LogCategory::Incident, format!("INCIDENT: {}!", incident.name));

    let id = incident.id;
    state.incidents.push(incident);
    id
}

/// Opens an incident drawn from the phase-gated catalogue.
pub fn raise_random(ctx: &mut TickContext<'_>, culprit: Option<&str>) -> Option<IncidentId> {
    let phase = ctx.state.phase;
    let pool: Vec<&IncidentTemplate> = all_templates()
        .iter()
        .filter(|t| t.min_phase <= phase)
        .collect();
    if pool.is_empty() {
        return None;
    }
    let tmpl = pool[ctx.rng.gen_range(0..pool.len())];
    let id = ctx.state.next_id();
    let mut incident = Incident::from_template(id, tmpl, ctx.state.clock);
    if let Some(name) = culprit {
        incident.description = format!("{} ({})", incident.description, name);
    }
    Some(open_incident(ctx, incident))
}

/// A worker failure turns into an incident with probability `chance`.
pub fn maybe_raise(ctx: &mut TickContext<'_>, chance: f64, culprit: Option<&str>) -> Option<IncidentId> {
    if ctx.rng.gen::<f64>() >= chance {
        return None;
    }
    raise_random(ctx, culprit)
}

/// The scripted first incident after heavy AI-assist use.
pub fn tutorial_incident(ctx: &mut TickContext<'_>) -> IncidentId {
    let id = ctx.state.next_id();
    let incident = Incident {
        id,
        kind: IncidentKind::Hallucination,
        name: "Hallucinated Output Published".into(),
        description: "Your AI produced confident nonsense and sent it to a client.".into(),
        severity: Severity::Warning,
        reputation_cost: 3.0,
        cash_cost: 0.0,
        token_cost: 0.0,
        fix_progress: 0.0,
        resolved: false,
        created_at: ctx.state.clock,
        remove_at: None,
    };
    // Flat one-point penalty instead of the half cost.
    ctx.state.ledger.lose_reputation(1.0);
    let id = record(ctx, incident);
    ctx.state.notify(
        "Your First Incident",
        "Incidents are operational failures caused by automation. Unresolved incidents drain \
         reputation over time. Fix manually (costs stress) or pay to resolve. This is a mild one. \
         They get worse as you scale.",
    );
    id
}

// ── Resolution ──────────────────────────────────────────────────────

fn mark_resolved(ctx: &mut TickContext<'_>, idx: usize) {
    let grace = ctx.config.incident_removal_grace;
    let now = ctx.state.clock;
    let inc = &mut ctx.state.incidents[idx];
    inc.resolved = true;
    inc.remove_at = Some(now + grace);
}

/// Resolve an open incident by hand (stress) or with cash.
pub fn resolve_incident(
    ctx: &mut TickContext<'_>,
    id: IncidentId,
    method: ResolveMethod,
) -> Result<LogEntry, IntentError> {
    let idx = ctx
        .state
        .incidents
        .iter()
        .position(|i| i.id == id)
        .ok_or(IntentError::UnknownIncident(id))?;
    if ctx.state.incidents[idx].resolved {
        return Err(IntentError::AlreadyResolved(id));
    }
    let name = ctx.state.incidents[idx].name.clone();

    let text = match method {
        ResolveMethod::Manual => {
            ctx.state.ledger.add_stress(MANUAL_RESOLVE_STRESS);
            format!("Manually resolved: {}.", name)
        }
        ResolveMethod::Cash => {
            let cost = ctx.state.incidents[idx].paid_resolution_cost();
            if !ctx.state.ledger.try_spend_cash(cost) {
                return Err(IntentError::InsufficientCash {
                    need: cost,
                    have: ctx.state.ledger.cash,
                });
            }
            format!("Paid ${:.2} to resolve: {}.", cost, name)
        }
    };
    mark_resolved(ctx, idx);
    Ok(ctx.state.log(LogCategory::Incident, text))
}

/// Auto-resolution once responders push fix progress to 100.
pub fn resolve_by_responder(ctx: &mut TickContext<'_>, idx: usize) {
    mark_resolved(ctx, idx);
    let name = ctx.state.incidents[idx].name.clone();
    ctx.state
        .log(LogCategory::Incident, format!("Responder resolved: {}.", name));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::systems::fixture::Fixture;

    fn outage(fx: &mut Fixture) -> IncidentId {
        let id = fx.state.next_id();
        let incident = Incident::from_template(id, template(IncidentKind::Outage), 0.0);
        open_incident(&mut fx.ctx(), incident)
    }

    #[test]
    fn opening_applies_half_penalty() {
        let mut fx = Fixture::at_phase(9);
        fx.state.ledger.cash = 100.0;
        fx.state.ledger.reputation = 50.0;
        outage(&mut fx);
        assert_eq!(fx.state.ledger.cash, 90.0);
        assert_eq!(fx.state.ledger.reputation, 45.0);
        assert!(fx.state.flags.incidents_explained);
        assert!(fx.state.is_revealed(UiReveal::Incidents));
        assert_eq!(fx.state.open_incidents(), 1);
    }

    #[test]
    fn paid_resolution_costs_double() {
        let mut fx = Fixture::at_phase(9);
        let id = outage(&mut fx);
        fx.state.ledger.cash = 100.0;
        resolve_incident(&mut fx.ctx(), id, ResolveMethod::Cash).unwrap();
        assert_eq!(fx.state.ledger.cash, 60.0);
        let inc = &fx.state.incidents[0];
        assert!(inc.resolved);
        assert_eq!(inc.remove_at, Some(fx.config.incident_removal_grace));
        assert_eq!(
            resolve_incident(&mut fx.ctx(), id, ResolveMethod::Manual),
            Err(IntentError::AlreadyResolved(id))
        );
    }

    #[test]
    fn paid_resolution_rejected_when_broke() {
        let mut fx = Fixture::at_phase(9);
        let id = outage(&mut fx);
        fx.state.ledger.cash = 39.0;
        let result = resolve_incident(&mut fx.ctx(), id, ResolveMethod::Cash);
        assert!(matches!(result, Err(IntentError::InsufficientCash { .. })));
        assert_eq!(fx.state.ledger.cash, 39.0);
        assert!(!fx.state.incidents[0].resolved);
    }

    #[test]
    fn manual_resolution_costs_stress() {
        let mut fx = Fixture::at_phase(2);
        let id = raise_random(&mut fx.ctx(), None).unwrap();
        resolve_incident(&mut fx.ctx(), id, ResolveMethod::Manual).unwrap();
        assert_eq!(fx.state.ledger.stress, MANUAL_RESOLVE_STRESS);
    }

    #[test]
    fn catalogue_is_phase_gated() {
        let mut fx = Fixture::at_phase(1);
        assert_eq!(raise_random(&mut fx.ctx(), None), None);
        fx.state.phase = 2;
        for _ in 0..10 {
            raise_random(&mut fx.ctx(), None);
        }
        assert!(fx
            .state
            .incidents
            .iter()
            .all(|i| i.kind == IncidentKind::Hallucination));
    }
}
