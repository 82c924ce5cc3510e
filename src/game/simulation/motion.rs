/// Per-tick motion integration.
///
/// This module handles:
/// - Weapon cooldown and heat upkeep, overheat shutdown and restart
/// - Turning heading, turret and pitch toward the AI's intent
/// - Moving every unit through the collision engine
/// - Collision damage between units and what they bump into
/// - Projectile flight, fanned out over rayon

use bevy::math::{DVec2, DVec3};
use bevy::prelude::*;
use rayon::prelude::*;
use strider_macros::profile;

use crate::game::geometry::{approach, turn_toward};
use crate::game::map::BattleMap;
use super::battlefield::Battlefield;
use super::collision::{CollisionEngine, CollisionWorld};
use super::components::*;
use super::events::*;
use super::resources::*;

// ============================================================================
// Units
// ============================================================================

/// A unit ran into something hard enough to hurt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bump {
    pub mover: EntityId,
    pub other: EntityId,
    pub amount: f64,
}

/// Cool weapons and shed heat. Flips `powered` on overheat and recovery.
pub fn upkeep(unit: &mut Unit, motion: &MotionSettings) {
    for weapon in unit.armament.iter_mut() {
        weapon.tick();
    }
    unit.heat = (unit.heat - unit.heat_dissipation).max(0.0);

    if unit.max_heat <= 0.0 {
        return;
    }
    if unit.powered && unit.heat >= unit.max_heat {
        unit.powered = false;
        info!("[MOTION] {:?} shut down from heat ({:.1}/{:.1})", unit.id(), unit.heat, unit.max_heat);
    } else if !unit.powered && !unit.withdrawn && unit.heat <= unit.max_heat * motion.restart_heat_ratio {
        unit.powered = true;
        info!("[MOTION] {:?} restarted", unit.id());
    }
}

/// Turn current state toward intent at the unit's rates.
pub fn steer(unit: &mut Unit, motion: &MotionSettings) {
    let wanted_velocity = if unit.powered {
        unit.target_velocity.min(unit.max_velocity).max(-unit.max_velocity)
    } else {
        0.0
    };
    unit.velocity = approach(unit.velocity, wanted_velocity, motion.acceleration);

    if unit.powered {
        unit.heading = turn_toward(unit.heading, unit.target_heading, unit.turn_rate);
        unit.turret_angle = turn_toward(unit.turret_angle, unit.target_turret_angle, motion.turret_turn_rate);
        unit.pitch = approach(unit.pitch, unit.target_pitch, motion.pitch_rate);
    }

    unit.velocity_z = if unit.kind() == EntityKind::Vtol {
        let cruise = if unit.powered { motion.vtol_cruise_altitude } else { unit.body.floor_z() };
        (cruise - unit.body.z).clamp(-motion.vtol_climb_rate, motion.vtol_climb_rate)
    } else {
        0.0
    };
}

/// Move every living unit one tick. Units move in storage order, each seeing
/// the already-updated positions of the ones before it.
pub fn advance_units(field: &mut Battlefield, map: &BattleMap, config: &SimConfig) -> Vec<Bump> {
    let mut bumps = Vec::new();

    for i in 0..field.units.len() {
        let (body, target, target_z, speed) = {
            let unit = &mut field.units[i];
            if unit.is_destroyed() {
                continue;
            }
            upkeep(unit, &config.motion);
            steer(unit, &config.motion);

            let target = unit.body.pos + unit.velocity_vector();
            let target_z = unit.body.z + unit.velocity_z;
            (unit.body.clone(), target, target_z, unit.velocity.abs())
        };

        let resolution = CollisionEngine::new(map, field.collision_world(), &config.collision)
            .resolve_move(&body, target, target_z, true);

        let unit = &mut field.units[i];
        unit.body.pos = resolution.position;
        unit.body.z = resolution.z;

        if let Some(first) = resolution.collisions.first() {
            if speed > config.motion.collision_min_speed {
                bumps.push(Bump {
                    mover: unit.id(),
                    other: first.entity,
                    amount: speed * config.motion.collision_damage,
                });
            }
            unit.velocity = 0.0;
        }
    }

    bumps
}

#[profile(4)]
pub fn update_units(
    mut field: ResMut<Battlefield>,
    map: Res<BattleMap>,
    config: Res<SimConfig>,
    tick: Res<SimTick>,
    mut damaged: MessageWriter<EntityDamaged>,
    mut destroyed: MessageWriter<UnitDestroyed>,
) {
    let field = &mut *field;
    let bumps = advance_units(field, &map, &config);

    for bump in bumps {
        for victim in [bump.mover, bump.other] {
            let Some(killed) = strike(field, victim, bump.amount) else {
                continue;
            };
            damaged.write(EntityDamaged { entity: victim, source: None, amount: bump.amount });
            if killed {
                report_destroyed(field, victim, &mut destroyed, tick.0);
            }
        }
    }
}

/// Damage a unit that is still fighting. `None` when the victim is not a unit
/// or was already destroyed earlier this tick, else whether this hit killed it.
fn strike(field: &mut Battlefield, victim: EntityId, amount: f64) -> Option<bool> {
    if !field.unit(victim).is_some_and(|u| !u.is_destroyed()) {
        return None;
    }
    Some(field.apply_damage(victim, amount))
}

fn report_destroyed(field: &Battlefield, id: EntityId, destroyed: &mut MessageWriter<UnitDestroyed>, tick: u64) {
    if let Some(unit) = field.unit(id) {
        info!("[MOTION] {:?} (team {}) destroyed at tick {}", id, unit.team, tick);
        destroyed.write(UnitDestroyed { entity: id, team: unit.team });
    }
}

// ============================================================================
// Projectiles
// ============================================================================

/// How a projectile's tick ended, when it did not simply keep flying.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Flight {
    /// Struck a body
    Hit { target: EntityId, at: DVec3 },
    /// Struck a wall, the ground or the map edge
    Impact { at: DVec3 },
    /// Ran out of lifespan
    Expired,
}

/// Outcome of one projectile's tick, tagged with what the applier needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightOutcome {
    pub projectile: EntityId,
    pub shooter: Option<EntityId>,
    pub damage: f64,
    pub flight: Flight,
}

fn fly(projectile: &mut Projectile, engine: &CollisionEngine) -> Option<Flight> {
    if projectile.body.destroyed {
        return None;
    }
    if projectile.lifespan == 0 {
        projectile.body.destroyed = true;
        return Some(Flight::Expired);
    }
    projectile.lifespan -= 1;

    let step = projectile.step();
    let target: DVec2 = projectile.body.pos + step.truncate();
    let resolution = engine.resolve_move(&projectile.body, target, projectile.body.z + step.z, false);

    if let Some(hit) = resolution.collisions.first() {
        projectile.body.destroyed = true;
        return Some(Flight::Hit { target: hit.entity, at: hit.point.extend(hit.z) });
    }

    projectile.body.pos = resolution.position;
    projectile.body.z = resolution.z;
    if resolution.collided {
        projectile.body.destroyed = true;
        return Some(Flight::Impact { at: projectile.body.pos3() });
    }
    None
}

/// Advance every projectile one tick in parallel. Units and props are only
/// read; what the projectiles hit is returned for the caller to apply.
pub fn advance_projectiles(field: &mut Battlefield, map: &BattleMap, settings: &CollisionSettings) -> Vec<FlightOutcome> {
    let world = CollisionWorld { units: &field.units, props: &field.props };
    let engine = CollisionEngine::new(map, world, settings);

    field
        .projectiles
        .par_iter_mut()
        .filter_map(|projectile| {
            let flight = fly(projectile, &engine)?;
            Some(FlightOutcome {
                projectile: projectile.body.id,
                shooter: projectile.body.parent,
                damage: projectile.damage,
                flight,
            })
        })
        .collect()
}

#[profile(4)]
pub fn update_projectiles(
    mut field: ResMut<Battlefield>,
    map: Res<BattleMap>,
    config: Res<SimConfig>,
    tick: Res<SimTick>,
    mut perf: ResMut<SimPerformance>,
    mut impacts: MessageWriter<ProjectileImpact>,
    mut damaged: MessageWriter<EntityDamaged>,
    mut destroyed: MessageWriter<UnitDestroyed>,
) {
    let field = &mut *field;
    let outcomes = advance_projectiles(field, &map, &config.collision);

    for outcome in outcomes {
        match outcome.flight {
            Flight::Hit { target, at } => {
                impacts.write(ProjectileImpact { projectile: outcome.projectile, target: Some(target), position: at });
                if let Some(killed) = strike(field, target, outcome.damage) {
                    damaged.write(EntityDamaged { entity: target, source: outcome.shooter, amount: outcome.damage });
                    if killed {
                        report_destroyed(field, target, &mut destroyed, tick.0);
                    }
                }
            }
            Flight::Impact { at } => {
                impacts.write(ProjectileImpact { projectile: outcome.projectile, target: None, position: at });
            }
            Flight::Expired => {}
        }
    }

    perf.projectiles_in_flight = field.projectiles.iter().filter(|p| !p.body.destroyed).count();
}
