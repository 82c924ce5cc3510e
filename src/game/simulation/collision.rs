/// Collision detection and move resolution.
///
/// This module handles:
/// - Resolving a requested 3D move against walls and collidable bodies
/// - Sliding along obstacles with axis-decomposed retries
/// - Proximity, vertical band and line-of-sight queries
///
/// The engine never writes. Callers apply the resolved position and whatever
/// damage the reported collisions imply.

use bevy::math::DVec2;
use bevy::prelude::*;
use smallvec::SmallVec;

use crate::game::geometry::{angle_to, direction, segment_circle_intersections, segment_intersection, Circle, Segment};
use crate::game::map::BattleMap;
use super::battlefield::Battlefield;
use super::components::*;
use super::resources::CollisionSettings;

#[cfg(test)]
mod tests;

/// Upper bound on resolution passes. Every retry drops an axis or disables
/// sliding, so real requests settle in three.
const MAX_PASSES: usize = 4;

// ============================================================================
// Results
// ============================================================================

/// One body a move ran into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityCollision {
    pub entity: EntityId,
    /// Where the mover's path meets the other body's own circle
    pub point: DVec2,
    pub z: f64,
}

/// Outcome of [`CollisionEngine::resolve_move`].
#[derive(Clone, Debug, PartialEq)]
pub struct MoveResolution {
    pub position: DVec2,
    pub z: f64,
    pub collided: bool,
    /// Sorted by distance from the mover's starting position, closest first
    pub collisions: SmallVec<[EntityCollision; 4]>,
}

impl MoveResolution {
    fn unobstructed(position: DVec2, z: f64) -> Self {
        Self { position, z, collided: false, collisions: SmallVec::new() }
    }
}

// ============================================================================
// World view
// ============================================================================

/// Read-only view of every body a mover can run into.
#[derive(Clone, Copy)]
pub struct CollisionWorld<'a> {
    pub units: &'a [Unit],
    pub props: &'a [Body],
}

impl<'a> CollisionWorld<'a> {
    pub fn bodies(&self) -> impl Iterator<Item = &'a Body> + 'a {
        self.units.iter().map(|u| &u.body).chain(self.props.iter())
    }
}

impl Battlefield {
    pub fn collision_world(&self) -> CollisionWorld<'_> {
        CollisionWorld { units: &self.units, props: &self.props }
    }
}

/// What a single probe of a straight move found.
#[derive(Default)]
struct Probe {
    intersections: SmallVec<[DVec2; 8]>,
    collisions: SmallVec<[EntityCollision; 4]>,
}

impl Probe {
    fn is_clear(&self) -> bool {
        self.intersections.is_empty()
    }

    fn closest_distance(&self, origin: DVec2) -> f64 {
        self.intersections
            .iter()
            .map(|p| origin.distance(*p))
            .fold(f64::INFINITY, f64::min)
    }
}

/// A move to try: destination, destination Z, and whether sliding is allowed.
#[derive(Clone, Copy, Debug)]
struct Request {
    dest: DVec2,
    z: f64,
    slide: bool,
}

// ============================================================================
// Engine
// ============================================================================

pub struct CollisionEngine<'a> {
    pub map: &'a BattleMap,
    pub world: CollisionWorld<'a>,
    pub settings: &'a CollisionSettings,
}

impl<'a> CollisionEngine<'a> {
    pub fn new(map: &'a BattleMap, world: CollisionWorld<'a>, settings: &'a CollisionSettings) -> Self {
        Self { map, world, settings }
    }

    /// Resolve a move of `mover` toward `(target, target_z)`.
    ///
    /// Without `allow_slide` any obstruction leaves the mover where it is.
    /// With it, the mover stops just short of the first obstruction and then
    /// tries to slide along whichever axis still has room.
    pub fn resolve_move(&self, mover: &Body, target: DVec2, target_z: f64, allow_slide: bool) -> MoveResolution {
        if !mover.is_collidable() {
            return MoveResolution::unobstructed(target, target_z);
        }

        let origin = mover.pos;
        let origin_z = mover.z;
        if target == origin && target_z == origin_z {
            return MoveResolution::unobstructed(origin, origin_z);
        }

        let mut request = Request { dest: target, z: target_z, slide: allow_slide };
        let mut resolved = (origin, origin_z);
        let mut collided = false;
        let mut collisions = SmallVec::new();

        for _ in 0..MAX_PASSES {
            if request.dest == origin && request.z == origin_z {
                break;
            }

            let probe = self.probe(mover, request.dest, request.z);
            if probe.is_clear() {
                resolved = (request.dest, request.z);
                break;
            }

            if !collided {
                collided = true;
                collisions = probe.collisions.clone();
            }
            if !request.slide {
                break;
            }

            match self.slide(mover, request, &probe) {
                SlideStep::Retry(next) => request = next,
                SlideStep::Settled(pos, z) => {
                    resolved = (pos, z);
                    break;
                }
                SlideStep::Blocked => break,
            }
        }

        let (position, z, clamped) = self.clamp(mover, resolved.0, resolved.1);
        if clamped {
            trace!("[COLLISION] {:?} clamped to ({:.2}, {:.2}, {:.2})", mover.id, position.x, position.y, z);
        }

        MoveResolution {
            position,
            z,
            collided: collided || clamped,
            collisions,
        }
    }

    /// Decide the next request after a blocked sliding pass.
    fn slide(&self, mover: &Body, request: Request, probe: &Probe) -> SlideStep {
        let origin = mover.pos;
        let eps = self.settings.axis_epsilon;

        if (request.z - mover.z).abs() > eps {
            // Vertical motion alone may still be possible against a wall
            if self.probe(mover, origin, request.z).is_clear() {
                return SlideStep::Settled(origin, request.z);
            }
            return SlideStep::Retry(Request { dest: request.dest, z: mover.z, slide: true });
        }

        let wanted = request.dest - origin;
        let safe = (probe.closest_distance(origin) - self.settings.slide_backoff).max(0.0);
        let slide_point = if wanted == DVec2::ZERO {
            origin
        } else {
            origin + direction(angle_to(origin, request.dest)) * safe
        };
        let progress = (slide_point - origin).abs();

        let x_exhausted = wanted.x.abs() > eps && progress.x <= eps;
        let y_exhausted = wanted.y.abs() > eps && progress.y <= eps;
        let along_y = DVec2::new(origin.x, request.dest.y);
        let along_x = DVec2::new(request.dest.x, origin.y);

        if x_exhausted && y_exhausted {
            // Pressed against an obstacle: take whichever single axis still has room
            if self.probe(mover, along_y, request.z).is_clear() {
                SlideStep::Settled(along_y, request.z)
            } else if self.probe(mover, along_x, request.z).is_clear() {
                SlideStep::Settled(along_x, request.z)
            } else {
                SlideStep::Blocked
            }
        } else if x_exhausted {
            SlideStep::Retry(Request { dest: along_y, z: request.z, slide: false })
        } else if y_exhausted {
            SlideStep::Retry(Request { dest: along_x, z: request.z, slide: false })
        } else if progress.x <= eps && progress.y <= eps {
            SlideStep::Blocked
        } else {
            SlideStep::Retry(Request { dest: slide_point, z: request.z, slide: false })
        }
    }

    /// Test the straight move from the mover's position to `dest` at `dest_z`.
    fn probe(&self, mover: &Body, dest: DVec2, dest_z: f64) -> Probe {
        let mut probe = Probe::default();
        let path = Segment::new(mover.pos, dest);
        let reach = mover.pos3().distance(dest.extend(dest_z));

        for wall in self.map.walls() {
            if !proximity_test(reach, dest, wall.closest_bounds_point(dest)) {
                continue;
            }
            if let Some(point) = segment_intersection(&path, wall) {
                probe.intersections.push(point);
            }
        }

        let mover_band = z_min_max(mover, dest_z);
        let mover_mid_z = (mover_band.0 + mover_band.1) / 2.0;

        for other in self.world.bodies() {
            if other.id == mover.id
                || Some(other.id) == mover.parent
                || other.destroyed
                || !other.is_collidable()
                || !other.kind.is_collision_target()
            {
                continue;
            }

            let combined = mover.radius + other.radius;
            if !proximity_test(reach + combined, dest, other.pos) {
                continue;
            }
            if !z_bands_overlap(mover_band, z_min_max(other, other.z)) {
                continue;
            }

            let hits = segment_circle_intersections(&path, &Circle::new(other.pos, combined), true);
            let contact = if let Some(first) = hits.first() {
                probe.intersections.extend(hits.iter().copied());
                contact_point(*first, other)
            } else if Circle::new(other.pos, combined).contains(dest) {
                probe.intersections.push(dest);
                contact_point(dest, other)
            } else {
                continue;
            };

            probe.collisions.push(EntityCollision {
                entity: other.id,
                point: contact,
                z: z_intersection(mover_mid_z, other),
            });
        }

        let origin = mover.pos;
        probe.collisions.sort_by(|a, b| {
            origin.distance_squared(a.point).total_cmp(&origin.distance_squared(b.point))
        });
        probe
    }

    fn clamp(&self, mover: &Body, pos: DVec2, z: f64) -> (DVec2, f64, bool) {
        let clip = self.settings.clip_distance;
        let max = self.map.size() - DVec2::splat(clip);
        let clamped_pos = DVec2::new(pos.x.max(clip).min(max.x), pos.y.max(clip).min(max.y));
        let clamped_z = z.max(mover.floor_z());
        let changed = clamped_pos != pos || clamped_z != z;
        (clamped_pos, clamped_z, changed)
    }
}

enum SlideStep {
    Retry(Request),
    Settled(DVec2, f64),
    Blocked,
}

/// Where the line from `hit` toward `other`'s centre meets `other`'s own circle.
fn contact_point(hit: DVec2, other: &Body) -> DVec2 {
    let inward = Segment::new(hit, other.pos);
    segment_circle_intersections(&inward, &Circle::new(other.pos, other.radius), true)
        .first()
        .copied()
        .unwrap_or(hit)
}

// ============================================================================
// Proximity / vertical helpers
// ============================================================================

/// Cheap box test: true when `a` and `b` are within `max_dist` on both axes.
///
/// Never rejects a pair whose Euclidean distance is at most `max_dist`.
#[inline]
pub fn proximity_test(max_dist: f64, a: DVec2, b: DVec2) -> bool {
    (a.x - b.x).abs() <= max_dist && (a.y - b.y).abs() <= max_dist
}

/// Vertical extent `(min, max)` of `body` if it stood at `z`.
pub fn z_min_max(body: &Body, z: f64) -> (f64, f64) {
    match body.anchor {
        Anchor::Bottom => (z, z + body.height),
        Anchor::Center => (z - body.height / 2.0, z + body.height / 2.0),
        Anchor::Top => (z - body.height, z),
    }
}

/// Strict overlap: bands that only touch do not overlap.
#[inline]
pub fn z_bands_overlap(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

/// `z` pulled into `body`'s current vertical band.
pub fn z_intersection(z: f64, body: &Body) -> f64 {
    let (min, max) = z_min_max(body, body.z);
    z.max(min).min(max)
}

/// True when no wall crosses the straight line between the two points.
/// Entities never block sight.
pub fn line_of_sight(map: &BattleMap, observer: DVec2, target: DVec2) -> bool {
    !map.segment_blocked(observer, target)
}
