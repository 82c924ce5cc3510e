//! Target acquisition, aiming and firing.

use bevy::math::DVec3;
use bevy::prelude::*;
use rand::Rng;
use std::f64::consts::FRAC_PI_2;

use crate::game::geometry::{angle_delta, angle_to, segment_circle_intersections, Circle, Segment};
use crate::game::simulation::{line_of_sight, z_bands_overlap, z_min_max, Battlefield, EntityId, Unit, WeaponFired};
use crate::game::weapons::Weapon;
use super::behavior::Status;
use super::context::AiContext;
use super::state::{AiState, GunneryState};

/// Cap on random aim error, radians.
const MAX_AIM_SPREAD: f64 = 0.5;

/// Point the shot should be sent to so it meets a target moving at
/// constant `velocity`. `None` when the shot can never catch up.
pub fn intercept(muzzle: DVec3, target: DVec3, velocity: DVec3, speed: f64) -> Option<DVec3> {
    let to_target = target - muzzle;
    let a = velocity.length_squared() - speed * speed;
    let b = 2.0 * to_target.dot(velocity);
    let c = to_target.length_squared();

    let t = if a.abs() < 1e-12 {
        if b.abs() < 1e-12 {
            return None;
        }
        -c / b
    } else {
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let t1 = (-b - root) / (2.0 * a);
        let t2 = (-b + root) / (2.0 * a);
        match (t1 > 0.0, t2 > 0.0) {
            (true, true) => t1.min(t2),
            (true, false) => t1,
            (false, true) => t2,
            (false, false) => return None,
        }
    };

    (t > 0.0).then(|| target + velocity * t)
}

/// Middle of a unit's collision volume: where it shoots from and is aimed at.
fn center(unit: &Unit) -> DVec3 {
    unit.body.pos.extend(unit.body.center_z())
}

/// Keep a living target, or pick the closest enemy in detection range.
pub fn has_target(ctx: &mut AiContext, state: &mut AiState) -> Status {
    if ctx.target().is_some() {
        return Status::Success;
    }
    let Some(me) = ctx.me() else {
        return Status::Failure;
    };
    let (pos, team, previous) = (me.body.pos, me.team, me.target);

    let closest = ctx
        .field
        .living_units()
        .filter(|u| u.id() != ctx.unit && u.team != team)
        .map(|u| (u.body.pos.distance(pos), u.id()))
        .filter(|(d, _)| *d <= ctx.settings.detection_radius)
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        .map(|(_, id)| id);

    let Some(found) = closest else {
        return Status::Failure;
    };
    if previous != Some(found) {
        state.gunnery = GunneryState::default();
        state.piloting.clear();
        debug!("[AI] {:?} acquired {:?}", ctx.unit, found);
    }
    if let Some(me) = ctx.me_mut() {
        me.target = Some(found);
    }
    Status::Success
}

pub fn target_is_alive(ctx: &mut AiContext, state: &mut AiState) -> Status {
    if ctx.target().is_some() {
        return Status::Success;
    }
    if let Some(me) = ctx.me_mut() {
        me.target = None;
    }
    state.gunnery = GunneryState::default();
    Status::Failure
}

/// Lead the target, add range- and size-dependent error, and lay the turret.
pub fn turret_to_target(ctx: &mut AiContext, state: &mut AiState) -> Status {
    let (Some(me), Some(target)) = (ctx.me(), ctx.target()) else {
        return Status::Failure;
    };
    let Some(primary) = me.armament.first() else {
        return Status::Failure;
    };

    let from = center(me);
    let at = center(target);
    let velocity = target.velocity_vector().extend(target.velocity_z);
    let lead = intercept(from, at, velocity, primary.projectile_speed).unwrap_or(at);
    let current_turret = me.turret_angle;
    let target_radius = target.body.radius.max(0.1);

    let distance = from.distance(lead);
    let spread = (ctx.settings.aim_jitter * distance / target_radius).min(MAX_AIM_SPREAD);
    let bearing = angle_to(from.truncate(), lead.truncate());
    let elevation = (lead.z - from.z).atan2(from.truncate().distance(lead.truncate()));

    let yaw_error = ctx.rng.random_range(-spread..=spread);
    let pitch_error = ctx.rng.random_range(-spread..=spread) * 0.5;

    if let Some(me) = ctx.me_mut() {
        me.target_turret_angle = bearing + yaw_error;
        me.target_pitch = elevation + pitch_error;
    }

    let gunnery = &mut state.gunnery;
    gunnery.lead = Some(lead);
    if angle_delta(current_turret, bearing).abs() <= ctx.settings.lock_tolerance {
        gunnery.lock = (gunnery.lock + ctx.settings.lock_gain).min(1.0);
    } else {
        gunnery.lock = (gunnery.lock - ctx.settings.lock_decay).max(0.0);
    }
    Status::Success
}

/// True if a living teammate stands on the line of fire.
fn friendly_in_line(field: &Battlefield, me: &Unit, target_id: EntityId, from: DVec3, to: DVec3) -> bool {
    let line = Segment::new(from.truncate(), to.truncate());
    let shot_band = (from.z.min(to.z), from.z.max(to.z));

    field.living_units().any(|other| {
        other.team == me.team
            && other.id() != me.id()
            && other.id() != target_id
            && z_bands_overlap(shot_band, z_min_max(&other.body, other.body.z))
            && !segment_circle_intersections(&line, &Circle::new(other.body.pos, other.body.radius), true).is_empty()
    })
}

/// Weapons that would fire this tick, before the fire-chance roll.
struct Volley {
    target: EntityId,
    weapons: Vec<usize>,
}

fn plan_volley(ctx: &AiContext, state: &AiState) -> Option<Volley> {
    let me = ctx.me()?;
    let target = ctx.target()?;

    let distance = me.body.pos.distance(target.body.pos);
    // A weapon without a registered projectile can never launch anything
    let usable = |w: &Weapon| w.is_ready() && w.in_range(distance) && ctx.templates.get(w).is_some();
    let first = me.armament.iter().position(usable)?;

    if !line_of_sight(ctx.map, me.body.pos, target.body.pos) {
        return None;
    }

    let from = center(me);
    let lead = state.gunnery.lead.unwrap_or_else(|| center(target));
    if friendly_in_line(ctx.field, me, target.id(), from, lead) {
        trace!("[AI] {:?} holding fire: friendly in line", ctx.unit);
        return None;
    }

    // How far the turret line passes from the aim point, at the aim point's range
    let bearing = angle_to(from.truncate(), lead.truncate());
    let off_bore = angle_delta(me.turret_angle, bearing).abs().min(FRAC_PI_2);
    let miss = from.truncate().distance(lead.truncate()) * off_bore.sin();
    if miss > ctx.settings.fire_tolerance * target.body.radius {
        return None;
    }

    let class = me.armament[first].class;
    let mut heat = me.heat;
    let weapons = me
        .armament
        .iter()
        .enumerate()
        .filter(|(_, w)| w.class == class && usable(*w))
        .filter_map(|(i, w)| {
            if me.max_heat > 0.0 && heat + w.heat > me.max_heat {
                return None;
            }
            heat += w.heat;
            Some(i)
        })
        .collect::<Vec<_>>();

    (!weapons.is_empty()).then(|| Volley { target: target.id(), weapons })
}

/// Fire every ready weapon of the first ready weapon's class, if the shot is
/// clear, on target, and the fire-chance roll passes.
pub fn fire_weapons(ctx: &mut AiContext, state: &mut AiState) -> Status {
    let Some(volley) = plan_volley(ctx, state) else {
        return Status::Failure;
    };

    let chance = ctx.settings.fire_chance_base
        + ctx.settings.fire_chance_lock_bonus * state.gunnery.lock
        + ctx.settings.fire_chance_per_tick * state.gunnery.ticks_since_fired as f64;
    if ctx.rng.random::<f64>() >= chance {
        return Status::Failure;
    }

    let mut fired = 0;
    for index in volley.weapons {
        let Some(me) = ctx.field.unit_mut(ctx.unit) else {
            break;
        };
        let weapon = &mut me.armament[index];
        if ctx.templates.get(weapon).is_none() || !weapon.try_fire() {
            continue;
        }
        let weapon = weapon.clone();
        me.heat += weapon.heat;
        let (team, heading, pitch, origin) = (me.team, me.turret_angle, me.pitch, center(me));

        let id = ctx.field.allocate_id();
        let Some(projectile) = ctx.templates.build_projectile(id, &weapon, origin, heading, pitch, ctx.unit, team) else {
            continue;
        };
        ctx.field.add_projectile(projectile);
        ctx.outbox.fired.push(WeaponFired { shooter: ctx.unit, projectile: id, weapon: weapon.name });
        fired += 1;
    }

    if fired == 0 {
        return Status::Failure;
    }
    state.gunnery.ticks_since_fired = 0;
    debug!("[AI] {:?} fired {} weapon(s) at {:?} (tick {})", ctx.unit, fired, volley.target, ctx.tick);
    Status::Success
}
