pub mod agents;
pub mod assignment;
pub mod economy;
pub mod incidents;
pub mod ledger;
pub mod log;
pub mod milestones;
pub mod prestige;
pub mod schedules;
pub mod tasks;
pub mod tokens;
pub mod upgrades;
