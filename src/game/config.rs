use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::game::map::BattleMap;
use crate::game::simulation::SimConfig;

/// Where [`ConfigPlugin`] looks for the startup configuration.
pub const INITIAL_CONFIG_PATH: &str = "assets/initial_config.ron";

/// Static configuration loaded once at startup.
///
/// Values are human-facing: rates are per second and angles in degrees.
/// [`SimConfig::from_initial`] converts them into per-tick simulation units.
/// Any field missing from the file keeps its default.
#[derive(Resource, Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InitialConfig {
    // Simulation
    pub tick_rate: f64,

    // Collision
    pub clip_distance: f64,
    pub slide_backoff: f64,
    pub axis_epsilon: f64,

    // Motion
    pub acceleration: f64,
    pub turret_turn_rate_deg: f64,
    pub pitch_rate_deg: f64,
    pub vtol_cruise_altitude: f64,
    pub vtol_climb_rate: f64,
    pub collision_damage: f64,
    pub collision_min_speed: f64,
    pub restart_heat_ratio: f64,

    // AI
    pub ai_seed: u64,
    pub initiative_reroll_ticks: u32,
    pub detection_radius: f64,
    pub path_reevaluate_ticks: u32,
    pub waypoint_reach: f64,
    pub standoff_min_ratio: f64,
    pub standoff_max_ratio: f64,
    pub aim_jitter: f64,
    pub lock_tolerance_deg: f64,
    pub lock_gain: f64,
    pub lock_decay: f64,
    pub fire_tolerance: f64,
    pub fire_chance_base: f64,
    pub fire_chance_per_tick: f64,
    pub fire_chance_lock_bonus: f64,
    pub withdraw_structure_ratio: f64,
    pub guard_follow_distance: f64,
    pub wander_radius: f64,

    // Skirmish runner
    pub skirmish_max_ticks: u64,
}

impl Default for InitialConfig {
    fn default() -> Self {
        Self {
            tick_rate: 30.0,
            clip_distance: 0.1,
            slide_backoff: 0.01,
            axis_epsilon: 0.001,
            acceleration: 4.5,
            turret_turn_rate_deg: 135.0,
            pitch_rate_deg: 90.0,
            vtol_cruise_altitude: 6.0,
            vtol_climb_rate: 1.5,
            collision_damage: 0.5,
            collision_min_speed: 0.6,
            restart_heat_ratio: 0.5,
            ai_seed: 0x5712_1de5,
            initiative_reroll_ticks: 300,
            detection_radius: 40.0,
            path_reevaluate_ticks: 60,
            waypoint_reach: 0.75,
            standoff_min_ratio: 0.6,
            standoff_max_ratio: 0.9,
            aim_jitter: 0.005,
            lock_tolerance_deg: 5.0,
            lock_gain: 0.05,
            lock_decay: 0.1,
            fire_tolerance: 1.5,
            fire_chance_base: 0.2,
            fire_chance_per_tick: 0.01,
            fire_chance_lock_bonus: 0.5,
            withdraw_structure_ratio: 0.2,
            guard_follow_distance: 4.0,
            wander_radius: 8.0,
            skirmish_max_ticks: 9000,
        }
    }
}

impl InitialConfig {
    /// Reads and parses a RON config file.
    pub fn load(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path, e))?;
        ron::from_str::<InitialConfig>(&contents)
            .map_err(|e| format!("Failed to parse {}: {}", path, e))
    }
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (load_initial_config, init_sim_config_from_initial, apply_map_clip_distance).chain());
    }
}

/// Load static initial configuration synchronously at startup.
/// This must complete before any simulation state that depends on these values.
fn load_initial_config(mut commands: Commands) {
    match InitialConfig::load(INITIAL_CONFIG_PATH) {
        Ok(config) => {
            info!("Loaded initial config from {}", INITIAL_CONFIG_PATH);
            commands.insert_resource(config);
        }
        Err(e) => {
            error!("{}", e);
            error!("Using default InitialConfig");
            commands.insert_resource(InitialConfig::default());
        }
    }
}

/// Convert the loaded config into simulation units and match the fixed
/// timestep to the configured tick rate.
pub fn init_sim_config_from_initial(mut commands: Commands, initial: Res<InitialConfig>) {
    let config = SimConfig::from_initial(&initial);
    commands.insert_resource(Time::<Fixed>::from_hz(config.tick_rate));
    info!("[CONFIG] Tick rate {} Hz | initiative re-roll every {} ticks | AI seed {:#x}",
          config.tick_rate, config.ai.initiative_reroll_ticks, config.ai.seed);
    commands.insert_resource(config);
}

/// Keep the map's wall inflation in step with the collision clip margin.
pub fn apply_map_clip_distance(config: Res<SimConfig>, mut map: ResMut<BattleMap>) {
    let clip = config.collision.clip_distance;
    if map.clip_distance() != clip {
        debug!("[CONFIG] Map clip distance {} -> {}", map.clip_distance(), clip);
        map.set_clip_distance(clip);
    }
}
