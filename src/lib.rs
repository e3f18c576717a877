pub mod config;
pub mod ecs;
pub mod error;
pub mod game;
pub mod protocol;
pub mod sim;

pub use config::SimConfig;
pub use error::IntentError;
pub use protocol::Intent;
pub use sim::Simulation;
