/// Simulation layer - deterministic game logic.
///
/// This module is organized into:
/// - **components**: Entity records (bodies, units, projectiles)
/// - **battlefield**: The arena that owns every entity
/// - **resources**: Tick counter, performance stats, runtime config
/// - **events**: Messages emitted to the layers around the simulation
/// - **collision**: Move resolution, proximity and line-of-sight queries
/// - **motion**: Unit and projectile integration
/// - **systems**: Tick bookkeeping and cleanup

use bevy::prelude::*;

pub mod battlefield;
pub mod collision;
pub mod components;
pub mod events;
pub mod motion;
pub mod resources;
pub mod systems;

pub use battlefield::*;
pub use collision::{line_of_sight, proximity_test, z_bands_overlap, z_intersection, z_min_max, CollisionEngine, CollisionWorld, EntityCollision, MoveResolution};
pub use components::*;
pub use events::*;
pub use resources::*;

// System sets for organizing execution order
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum SimSet {
    Behavior,    // AI decides intent for the scheduled subset
    Motion,      // Units turn and move through the collision engine
    Projectiles, // Shots fly and land
    Cleanup,     // Destroyed entities leave the field
}

/// Main simulation plugin
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_hz(30.0));

        app.init_resource::<SimConfig>();
        app.init_resource::<SimPerformance>();
        app.init_resource::<SimTick>();
        app.init_resource::<Battlefield>();
        app.init_resource::<crate::game::map::BattleMap>();
        app.init_resource::<crate::game::weapons::ProjectileTemplates>();

        app.add_message::<WeaponFired>();
        app.add_message::<EntityDamaged>();
        app.add_message::<UnitDestroyed>();
        app.add_message::<UnitWithdrawn>();
        app.add_message::<ProjectileImpact>();

        app.configure_sets(FixedUpdate, (
            SimSet::Behavior,
            SimSet::Motion,
            SimSet::Projectiles,
            SimSet::Cleanup,
        ).chain());

        app.add_systems(FixedUpdate, (
            systems::increment_sim_tick.before(systems::sim_start),
            systems::sim_start.before(SimSet::Behavior),
            motion::update_units.in_set(SimSet::Motion),
            motion::update_projectiles.in_set(SimSet::Projectiles),
            systems::cleanup_destroyed.in_set(SimSet::Cleanup),
            systems::sim_end.after(SimSet::Cleanup),
        ));
    }
}
