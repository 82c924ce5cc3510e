//! 2D geometry used by the collision engine and the AI.
//!
//! Everything works on `f64` vectors (`DVec2`). Angles are radians, measured
//! counter-clockwise from the +X axis, the same convention `f64::atan2` uses.

use bevy::math::DVec2;
use smallvec::SmallVec;
use std::f64::consts::{PI, TAU};


/// A directed line segment from `a` to `b`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub a: DVec2,
    pub b: DVec2,
}

impl Segment {
    pub fn new(a: DVec2, b: DVec2) -> Self {
        Self { a, b }
    }

    /// Point of the axis-aligned bounding box closest to `point`.
    pub fn closest_bounds_point(&self, point: DVec2) -> DVec2 {
        point.clamp(self.a.min(self.b), self.a.max(self.b))
    }
}

/// A circle in the XY plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: DVec2,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: DVec2, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn contains(&self, point: DVec2) -> bool {
        self.center.distance_squared(point) < self.radius * self.radius
    }
}

/// Unit vector pointing along `angle`.
#[inline]
pub fn direction(angle: f64) -> DVec2 {
    DVec2::new(angle.cos(), angle.sin())
}

/// Angle of the vector from `from` to `to`.
#[inline]
pub fn angle_to(from: DVec2, to: DVec2) -> f64 {
    let d = to - from;
    d.y.atan2(d.x)
}

/// Wraps an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest rotation from `from` to `to`, in `(-π, π]`.
pub fn angle_delta(from: f64, to: f64) -> f64 {
    let mut delta = normalize_angle(to) - normalize_angle(from);
    if delta > PI {
        delta -= TAU;
    } else if delta <= -PI {
        delta += TAU;
    }
    delta
}

/// Rotates `current` toward `target` by at most `max_step`, returning the
/// result wrapped into `[0, 2π)`.
pub fn turn_toward(current: f64, target: f64, max_step: f64) -> f64 {
    let delta = angle_delta(current, target);
    if delta.abs() <= max_step {
        normalize_angle(target)
    } else {
        normalize_angle(current + max_step.copysign(delta))
    }
}

/// Moves a scalar toward `target` by at most `max_step`.
pub fn approach(current: f64, target: f64, max_step: f64) -> f64 {
    let delta = target - current;
    if delta.abs() <= max_step {
        target
    } else {
        current + max_step.copysign(delta)
    }
}

/// Exact intersection point of two segments, endpoints included.
///
/// Parallel and degenerate segments never intersect.
pub fn segment_intersection(s1: &Segment, s2: &Segment) -> Option<DVec2> {
    let r = s1.b - s1.a;
    let s = s2.b - s2.a;
    let denom = r.perp_dot(s);
    if denom == 0.0 {
        return None;
    }

    let qp = s2.a - s1.a;
    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(s1.a + r * t)
    } else {
        None
    }
}

/// Intersections of the line through `segment` with `circle`, ordered from
/// `segment.a` toward `segment.b`.
///
/// With `segment_only` set, points outside the segment are discarded.
/// Degenerate segments yield nothing.
pub fn segment_circle_intersections(
    segment: &Segment,
    circle: &Circle,
    segment_only: bool,
) -> SmallVec<[DVec2; 2]> {
    let mut points = SmallVec::new();
    let d = segment.b - segment.a;
    let a = d.length_squared();
    if a == 0.0 {
        return points;
    }

    let f = segment.a - circle.center;
    let b = 2.0 * f.dot(d);
    let c = f.length_squared() - circle.radius * circle.radius;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return points;
    }

    let root = discriminant.sqrt();
    let t1 = (-b - root) / (2.0 * a);
    let t2 = (-b + root) / (2.0 * a);
    for t in [t1, t2] {
        if segment_only && !(0.0..=1.0).contains(&t) {
            continue;
        }
        let point = segment.a + d * t;
        // tangent hits produce the same point twice
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    points
}
