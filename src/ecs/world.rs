use hecs::World;

use crate::config::SimConfig;
use crate::protocol::LogCategory;

use super::components::GameState;

/// Creates an empty agent world along with the initial `GameState`
/// resource. A new run starts in phase 1 with no cash, no tasks and the
/// solo worker locked; the first task comes from the early "do task"
/// intent.
pub fn create_world(config: &SimConfig) -> (World, GameState) {
    let world = World::new();

    // ── Initial GameState ────────────────────────────────────────────
    let mut game_state = GameState::new(config.log_capacity);
    game_state.log(
        LogCategory::System,
        "Another day in the car. Time to find some work.",
    );

    (world, game_state)
}
