//! Movement decisions: closing to stand-off range, withdrawing, and the
//! standing orders units follow when there is nothing to shoot.

use bevy::math::DVec2;
use bevy::prelude::*;
use rand::Rng;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

use crate::game::geometry::{angle_to, direction};
use crate::game::simulation::{EntityKind, UnitWithdrawn};
use super::behavior::Status;
use super::context::AiContext;
use super::state::AiState;

/// Rotations tried around the target when the direct stand-off point is unroutable.
const STANDOFF_ANGLES: [f64; 5] = [0.0, FRAC_PI_4, -FRAC_PI_4, FRAC_PI_2, -FRAC_PI_2];

// ============================================================================
// Route helpers
// ============================================================================

/// Keep a point away from the map edge.
fn clamp_to_map(ctx: &AiContext, point: DVec2) -> DVec2 {
    let margin = 0.5;
    let max = ctx.map.size() - DVec2::splat(margin);
    DVec2::new(point.x.max(margin).min(max.x), point.y.max(margin).min(max.y))
}

/// Replace the route with a fresh one to `destination`.
fn request_path(ctx: &AiContext, state: &mut AiState, destination: DVec2) -> bool {
    let Some(me) = ctx.me() else {
        return false;
    };
    let Some(path) = ctx.pathing.find_path(me.body.pos, destination) else {
        warn!("[PATHFINDING] {:?}: no route from {:?} to {:?}", ctx.unit, me.body.pos, destination);
        return false;
    };

    let piloting = &mut state.piloting;
    piloting.waypoints = path.into_iter().rev().collect();
    piloting.destination = Some(destination);
    piloting.ticks_since_path = 0;
    true
}

/// Whether the current route is missing, stale, or heads somewhere else.
fn needs_route(ctx: &AiContext, state: &AiState, destination: DVec2) -> bool {
    let piloting = &state.piloting;
    piloting.waypoints.is_empty()
        || piloting.ticks_since_path >= ctx.settings.path_reevaluate_ticks
        || piloting.destination.is_none_or(|d| d.distance(destination) > ctx.settings.waypoint_reach)
}

/// Route to `destination` if needed, then steer along the route.
fn go_to(ctx: &mut AiContext, state: &mut AiState, destination: DVec2) -> bool {
    if needs_route(ctx, state, destination) && !request_path(ctx, state, destination) {
        return false;
    }
    follow_path(ctx, state);
    true
}

/// Pop reached waypoints and steer toward the next one; stop when none remain.
pub fn follow_path(ctx: &mut AiContext, state: &mut AiState) {
    let reach = ctx.settings.waypoint_reach;
    let Some(me) = ctx.me_mut() else {
        return;
    };
    let pos = me.body.pos;

    let waypoints = &mut state.piloting.waypoints;
    while waypoints.last().is_some_and(|w| w.distance(pos) <= reach) {
        waypoints.pop();
    }

    match waypoints.last() {
        Some(next) => {
            let heading = angle_to(pos, *next);
            me.target_heading = heading;
            me.target_turret_angle = heading;
            me.target_velocity = me.max_velocity;
        }
        None => {
            me.target_velocity = 0.0;
            state.piloting.destination = None;
        }
    }
}

fn stop(ctx: &mut AiContext, state: &mut AiState) {
    state.piloting.clear();
    if let Some(me) = ctx.me_mut() {
        me.target_velocity = 0.0;
    }
}

// ============================================================================
// Engagement
// ============================================================================

/// Close to a randomized distance inside the unit's ideal weapon range.
pub fn turn_to_target(ctx: &mut AiContext, state: &mut AiState) -> Status {
    let (Some(me), Some(target)) = (ctx.me(), ctx.target()) else {
        return Status::Failure;
    };
    let (pos, target_pos) = (me.body.pos, target.body.pos);
    let ideal = me
        .armament
        .iter()
        .map(|w| w.range)
        .min_by(f64::total_cmp)
        .unwrap_or(ctx.settings.guard_follow_distance);

    let low = ideal * ctx.settings.standoff_min_ratio;
    let high = ideal * ctx.settings.standoff_max_ratio;
    let distance = pos.distance(target_pos);

    if (low..=high).contains(&distance) {
        state.piloting.clear();
        if let Some(me) = ctx.me_mut() {
            me.target_heading = angle_to(pos, target_pos);
            me.target_velocity = 0.0;
        }
        return Status::Success;
    }

    let route_fresh = !state.piloting.waypoints.is_empty()
        && state.piloting.ticks_since_path < ctx.settings.path_reevaluate_ticks;
    if route_fresh {
        follow_path(ctx, state);
        return Status::Success;
    }

    let standoff = if low < high { ctx.rng.random_range(low..high) } else { low };
    let approach = angle_to(target_pos, pos);
    for offset in STANDOFF_ANGLES {
        let point = clamp_to_map(ctx, target_pos + direction(approach + offset) * standoff);
        if request_path(ctx, state, point) {
            state.piloting.standoff = Some(standoff);
            follow_path(ctx, state);
            return Status::Success;
        }
    }
    Status::Failure
}

// ============================================================================
// Withdrawal
// ============================================================================

/// Structure strictly below the threshold. Emplacements never withdraw.
pub fn determine_forced_withdrawal(ctx: &mut AiContext) -> Status {
    let Some(me) = ctx.me() else {
        return Status::Failure;
    };
    Status::from(me.kind() != EntityKind::Emplacement
        && me.structure_ratio() < ctx.settings.withdraw_structure_ratio)
}

pub fn turn_to_withdraw(ctx: &mut AiContext, state: &mut AiState) -> Status {
    let Some(area) = state.orders.withdraw_area else {
        return Status::Failure;
    };
    let Some(me) = ctx.me() else {
        return Status::Failure;
    };
    if area.contains(me.body.pos) {
        return Status::Success;
    }
    Status::from(go_to(ctx, state, area.center))
}

pub fn velocity_to_max(ctx: &mut AiContext) -> Status {
    if let Some(me) = ctx.me_mut() {
        me.target_velocity = me.max_velocity;
    }
    Status::Success
}

pub fn reach_withdraw_position(ctx: &mut AiContext, state: &mut AiState) -> Status {
    let (Some(area), Some(me)) = (state.orders.withdraw_area, ctx.me()) else {
        return Status::Failure;
    };
    Status::from(area.contains(me.body.pos))
}

/// Leave the field. The unit is gone from the fight from here on.
pub fn eject(ctx: &mut AiContext) -> Status {
    let Some(me) = ctx.me_mut() else {
        return Status::Failure;
    };
    me.powered = false;
    me.withdrawn = true;
    me.body.destroyed = true;
    me.velocity = 0.0;
    me.target_velocity = 0.0;
    let team = me.team;

    info!("[AI] {:?} (team {}) ejected", ctx.unit, team);
    ctx.outbox.withdrawn.push(UnitWithdrawn { entity: ctx.unit, team });
    Status::Success
}

// ============================================================================
// Standing orders
// ============================================================================

/// Stay inside the guarded circle, drifting between random points in it.
pub fn guard_area(ctx: &mut AiContext, state: &mut AiState) -> Status {
    let Some(area) = state.orders.guard_area else {
        return Status::Failure;
    };
    let Some(me) = ctx.me() else {
        return Status::Failure;
    };

    if !area.contains(me.body.pos) {
        if !go_to(ctx, state, area.center) {
            stop(ctx, state);
        }
        return Status::Success;
    }

    if state.piloting.waypoints.is_empty() {
        let angle = ctx.rng.random_range(0.0..TAU);
        let reach = area.radius * ctx.rng.random::<f64>();
        let point = clamp_to_map(ctx, area.center + direction(angle) * reach);
        if !request_path(ctx, state, point) {
            stop(ctx, state);
            return Status::Success;
        }
    }
    follow_path(ctx, state);
    Status::Success
}

/// Keep within follow distance of a formation leader.
pub fn guard_unit(ctx: &mut AiContext, state: &mut AiState) -> Status {
    let Some(leader_id) = state.orders.guard_unit else {
        return Status::Failure;
    };
    let Some(leader) = ctx.field.unit(leader_id).filter(|u| !u.is_destroyed()) else {
        return Status::Failure;
    };
    let (leader_pos, leader_heading) = (leader.body.pos, leader.heading);
    let Some(me) = ctx.me() else {
        return Status::Failure;
    };

    if me.body.pos.distance(leader_pos) <= ctx.settings.guard_follow_distance {
        stop(ctx, state);
        if let Some(me) = ctx.me_mut() {
            me.target_heading = leader_heading;
            me.target_turret_angle = leader_heading;
        }
        return Status::Success;
    }

    if !go_to(ctx, state, leader_pos) {
        stop(ctx, state);
    }
    Status::Success
}

/// Walk the patrol route, looping back to the start.
pub fn patrol_path(ctx: &mut AiContext, state: &mut AiState) -> Status {
    if state.orders.patrol.is_empty() {
        return Status::Failure;
    }
    let Some(me) = ctx.me() else {
        return Status::Failure;
    };
    let pos = me.body.pos;

    let orders = &mut state.orders;
    orders.patrol_cursor %= orders.patrol.len();
    if orders.patrol[orders.patrol_cursor].distance(pos) <= ctx.settings.waypoint_reach {
        orders.patrol_cursor = (orders.patrol_cursor + 1) % orders.patrol.len();
    }
    let leg = orders.patrol[orders.patrol_cursor];

    if !go_to(ctx, state, leg) {
        // Unreachable leg: skip it next time
        state.orders.patrol_cursor = (state.orders.patrol_cursor + 1) % state.orders.patrol.len();
        stop(ctx, state);
    }
    Status::Success
}

/// Amble to random nearby points. Always succeeds.
pub fn wander(ctx: &mut AiContext, state: &mut AiState) -> Status {
    let Some(me) = ctx.me() else {
        return Status::Success;
    };
    let pos = me.body.pos;

    if state.piloting.waypoints.is_empty() {
        let angle = ctx.rng.random_range(0.0..TAU);
        let reach = ctx.settings.wander_radius * ctx.rng.random::<f64>();
        let point = clamp_to_map(ctx, pos + direction(angle) * reach);
        if !request_path(ctx, state, point) {
            stop(ctx, state);
            return Status::Success;
        }
    }
    follow_path(ctx, state);
    Status::Success
}
