/// Resource definitions for the simulation.
///
/// This module contains the runtime configuration, the tick counter and
/// performance tracking.

use bevy::prelude::*;
use std::time::Duration;

use crate::game::config::InitialConfig;

// ============================================================================
// Tick Counter
// ============================================================================

/// Number of simulation ticks run so far.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 += 1;
    }
}

// ============================================================================
// Performance Tracking
// ============================================================================

/// Performance tracking for simulation ticks
#[derive(Resource, Default)]
pub struct SimPerformance {
    pub last_duration: Duration,
    pub projectiles_in_flight: usize,
    pub ai_evaluated_last_tick: usize,
}

// ============================================================================
// Simulation Configuration
// ============================================================================

/// Tunables of the collision engine.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionSettings {
    /// Margin kept from map edges
    pub clip_distance: f64,
    /// How far short of the first obstacle a sliding mover stops
    pub slide_backoff: f64,
    /// Below this, an axis is considered to have no room left
    pub axis_epsilon: f64,
}

/// Tunables of the per-tick motion integration.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionSettings {
    /// Change in forward speed per tick
    pub acceleration: f64,
    /// Radians per tick
    pub turret_turn_rate: f64,
    /// Radians per tick
    pub pitch_rate: f64,
    pub vtol_cruise_altitude: f64,
    /// Units per tick
    pub vtol_climb_rate: f64,
    /// Damage per unit-per-tick of speed when bumping into something
    pub collision_damage: f64,
    /// Bumps slower than this (units per tick) are harmless
    pub collision_min_speed: f64,
    /// Heat fraction a shut-down unit must cool to before restarting
    pub restart_heat_ratio: f64,
}

/// Tunables of the AI decision engine.
#[derive(Clone, Debug, PartialEq)]
pub struct AiSettings {
    pub seed: u64,
    pub initiative_reroll_ticks: u32,
    pub detection_radius: f64,
    pub path_reevaluate_ticks: u32,
    pub waypoint_reach: f64,
    /// Stand-off band as fractions of the unit's ideal weapon range
    pub standoff_min_ratio: f64,
    pub standoff_max_ratio: f64,
    /// Aim spread per unit of range, before target size scaling
    pub aim_jitter: f64,
    /// Radians within which the turret counts as on target
    pub lock_tolerance: f64,
    pub lock_gain: f64,
    pub lock_decay: f64,
    /// Aim error allowed at the target, in multiples of the target radius
    pub fire_tolerance: f64,
    pub fire_chance_base: f64,
    pub fire_chance_per_tick: f64,
    pub fire_chance_lock_bonus: f64,
    /// Structure fraction below which a unit withdraws
    pub withdraw_structure_ratio: f64,
    pub guard_follow_distance: f64,
    pub wander_radius: f64,
}

/// Runtime simulation configuration.
///
/// Converted once from the user-facing [`InitialConfig`] (per-second rates,
/// degrees) into the units the simulation computes in (per-tick rates,
/// radians). The conversion is the only place tick rate enters the maths.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub tick_rate: f64,
    pub collision: CollisionSettings,
    pub motion: MotionSettings,
    pub ai: AiSettings,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::from_initial(&InitialConfig::default())
    }
}

impl SimConfig {
    pub fn from_initial(initial: &InitialConfig) -> Self {
        let tick_rate = initial.tick_rate.max(1.0);
        let per_tick = |per_second: f64| per_second / tick_rate;
        let radians_per_tick = |deg_per_second: f64| deg_per_second.to_radians() / tick_rate;

        Self {
            tick_rate,
            collision: CollisionSettings {
                clip_distance: initial.clip_distance,
                slide_backoff: initial.slide_backoff,
                axis_epsilon: initial.axis_epsilon,
            },
            motion: MotionSettings {
                acceleration: initial.acceleration / (tick_rate * tick_rate),
                turret_turn_rate: radians_per_tick(initial.turret_turn_rate_deg),
                pitch_rate: radians_per_tick(initial.pitch_rate_deg),
                vtol_cruise_altitude: initial.vtol_cruise_altitude,
                vtol_climb_rate: per_tick(initial.vtol_climb_rate),
                collision_damage: initial.collision_damage * tick_rate,
                collision_min_speed: per_tick(initial.collision_min_speed),
                restart_heat_ratio: initial.restart_heat_ratio,
            },
            ai: AiSettings {
                seed: initial.ai_seed,
                initiative_reroll_ticks: initial.initiative_reroll_ticks,
                detection_radius: initial.detection_radius,
                path_reevaluate_ticks: initial.path_reevaluate_ticks,
                waypoint_reach: initial.waypoint_reach,
                standoff_min_ratio: initial.standoff_min_ratio,
                standoff_max_ratio: initial.standoff_max_ratio,
                aim_jitter: initial.aim_jitter,
                lock_tolerance: initial.lock_tolerance_deg.to_radians(),
                lock_gain: initial.lock_gain,
                lock_decay: initial.lock_decay,
                fire_tolerance: initial.fire_tolerance,
                fire_chance_base: initial.fire_chance_base,
                fire_chance_per_tick: initial.fire_chance_per_tick,
                fire_chance_lock_bonus: initial.fire_chance_lock_bonus,
                withdraw_structure_ratio: initial.withdraw_structure_ratio,
                guard_follow_distance: initial.guard_follow_distance,
                wander_radius: initial.wander_radius,
            },
        }
    }
}
