use bevy::prelude::*;

pub mod ai;
pub mod config;
pub mod geometry;
pub mod map;
pub mod pathfinding;
pub mod simulation;
pub mod skirmish;
pub mod weapons;

use ai::AiPlugin;
use config::ConfigPlugin;
use simulation::SimulationPlugin;

/// Everything needed to run a battle headless: configuration, the
/// simulation core and the AI that drives it.
///
/// Content (maps, units, weapon templates) is supplied by the embedding
/// application; see [`skirmish::SkirmishPlugin`] for a complete example.
pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            ConfigPlugin,
            SimulationPlugin,
            AiPlugin,
        ));
    }
}
