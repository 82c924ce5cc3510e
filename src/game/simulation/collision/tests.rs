use super::*;
use crate::game::geometry::Segment;
use crate::game::simulation::SimConfig;

fn settings() -> CollisionSettings {
    SimConfig::default().collision
}

fn mech(id: u32, x: f64, y: f64) -> Body {
    Body::new(EntityId(id), EntityKind::Mech, DVec2::new(x, y), 0.5, 2.0)
}

fn unit(body: Body) -> Unit {
    Unit::new(body, 0)
}

fn open_map_with_wall() -> BattleMap {
    let mut map = BattleMap::new(20, 20);
    map.add_wall(Segment::new(DVec2::new(10.0, 0.0), DVec2::new(10.0, 20.0)));
    map
}

#[test]
fn test_unobstructed_move_reaches_target() {
    let map = BattleMap::new(20, 20);
    let settings = settings();
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &[], props: &[] }, &settings);

    let result = engine.resolve_move(&mech(1, 5.0, 5.0), DVec2::new(6.0, 6.0), 0.0, true);
    assert_eq!(result.position, DVec2::new(6.0, 6.0));
    assert!(!result.collided);
    assert!(result.collisions.is_empty());
}

#[test]
fn test_requesting_current_position_is_a_no_op() {
    let map = open_map_with_wall();
    let settings = settings();
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &[], props: &[] }, &settings);
    let mover = mech(1, 9.99, 5.0);

    let result = engine.resolve_move(&mover, mover.pos, mover.z, true);
    assert_eq!(result.position, mover.pos);
    assert!(!result.collided);
}

#[test]
fn test_non_collidable_mover_passes_through_walls() {
    let map = open_map_with_wall();
    let settings = settings();
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &[], props: &[] }, &settings);
    let sprite = Body::new(EntityId(1), EntityKind::Effect, DVec2::new(9.0, 5.0), 0.0, 1.0);

    let result = engine.resolve_move(&sprite, DVec2::new(11.0, 5.0), 0.0, false);
    assert_eq!(result.position, DVec2::new(11.0, 5.0));
    assert!(!result.collided);
}

#[test]
fn test_wall_rejects_non_sliding_move() {
    let map = open_map_with_wall();
    let settings = settings();
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &[], props: &[] }, &settings);
    let mover = mech(1, 9.0, 5.0);

    let result = engine.resolve_move(&mover, DVec2::new(11.0, 5.0), 0.0, false);
    assert_eq!(result.position, mover.pos);
    assert!(result.collided);
}

#[test]
fn test_head_on_slide_stops_short_of_wall() {
    let map = open_map_with_wall();
    let settings = settings();
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &[], props: &[] }, &settings);

    let result = engine.resolve_move(&mech(1, 9.0, 5.0), DVec2::new(11.0, 5.0), 0.0, true);
    assert!(result.collided);
    assert!(result.position.x < 10.0, "Must stay on the near side, got {}", result.position.x);
    assert!(result.position.x > 9.9, "Should close most of the gap, got {}", result.position.x);
    assert_eq!(result.position.y, 5.0);
}

#[test]
fn test_diagonal_move_slides_along_wall() {
    let map = open_map_with_wall();
    let settings = settings();
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &[], props: &[] }, &settings);
    let mover = mech(1, 9.995, 5.0);

    let result = engine.resolve_move(&mover, DVec2::new(10.5, 5.5), 0.0, true);
    assert!(result.collided);
    assert_eq!(result.position, DVec2::new(9.995, 5.5));
}

#[test]
fn test_pressed_against_horizontal_wall_slides_along_x() {
    let mut map = BattleMap::new(20, 20);
    map.add_wall(Segment::new(DVec2::new(0.0, 10.0), DVec2::new(20.0, 10.0)));
    let settings = settings();
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &[], props: &[] }, &settings);
    let mover = mech(1, 5.0, 9.995);

    // Mirror of the vertical wall case: the free axis is X here
    let result = engine.resolve_move(&mover, DVec2::new(5.5, 10.5), 0.0, true);
    assert!(result.collided);
    assert_eq!(result.position, DVec2::new(5.5, 9.995));
}

#[test]
fn test_sliding_into_corner_is_blocked() {
    let mut map = open_map_with_wall();
    map.add_wall(Segment::new(DVec2::new(0.0, 6.0), DVec2::new(20.0, 6.0)));
    let settings = settings();
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &[], props: &[] }, &settings);
    let mover = mech(1, 9.995, 5.995);

    let result = engine.resolve_move(&mover, DVec2::new(10.5, 6.5), 0.0, true);
    assert!(result.collided);
    assert_eq!(result.position, mover.pos);
}

#[test]
fn test_collisions_sorted_by_distance_from_start() {
    let map = BattleMap::new(20, 20);
    let settings = settings();
    let props = [
        Body::new(EntityId(10), EntityKind::Prop, DVec2::new(8.0, 5.0), 0.3, 3.0),
        Body::new(EntityId(11), EntityKind::Prop, DVec2::new(5.0, 5.0), 0.3, 3.0),
        Body::new(EntityId(12), EntityKind::Prop, DVec2::new(6.5, 5.0), 0.3, 3.0),
    ];
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &[], props: &props }, &settings);

    let result = engine.resolve_move(&mech(1, 2.0, 5.0), DVec2::new(10.0, 5.0), 0.0, false);
    let order: Vec<u32> = result.collisions.iter().map(|c| c.entity.0).collect();
    assert_eq!(order, vec![11, 12, 10]);

    // The reported point sits on the other body's own circle
    let first = result.collisions[0];
    assert!((first.point.distance(DVec2::new(5.0, 5.0)) - 0.3).abs() < 1e-9);
}

#[test]
fn test_vertical_bands_separate_vtol_from_ground_unit() {
    let map = BattleMap::new(20, 20);
    let settings = settings();
    let units = [unit(mech(2, 6.0, 5.0))];
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &units, props: &[] }, &settings);

    let vtol = Body::new(EntityId(1), EntityKind::Vtol, DVec2::new(5.0, 5.0), 0.5, 2.0).with_z(50.0);
    let high = engine.resolve_move(&vtol, DVec2::new(6.0, 5.0), 50.0, false);
    assert!(!high.collided, "VTOL at altitude flies over");
    assert_eq!(high.position, DVec2::new(6.0, 5.0));

    let low = engine.resolve_move(&mech(1, 5.0, 5.0), DVec2::new(6.0, 5.0), 0.0, false);
    assert!(low.collided);
    assert_eq!(low.collisions.len(), 1);
    assert_eq!(low.collisions[0].entity, EntityId(2));
    assert_eq!(low.position, DVec2::new(5.0, 5.0));
}

#[test]
fn test_parent_and_destroyed_bodies_are_ignored() {
    let map = BattleMap::new(20, 20);
    let settings = settings();
    let mut wreck = unit(mech(3, 8.0, 5.0));
    wreck.body.destroyed = true;
    let units = [unit(mech(2, 5.0, 5.0)), wreck];
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &units, props: &[] }, &settings);

    let shot = Body::new(EntityId(9), EntityKind::Projectile, DVec2::new(5.0, 5.0), 0.05, 0.1)
        .with_anchor(Anchor::Center)
        .with_z(1.0)
        .with_parent(EntityId(2));

    let result = engine.resolve_move(&shot, DVec2::new(10.0, 5.0), 1.0, false);
    assert!(!result.collided);
    assert_eq!(result.position, DVec2::new(10.0, 5.0));
}

#[test]
fn test_destination_inside_body_counts_as_collision() {
    let map = BattleMap::new(20, 20);
    let settings = settings();
    let props = [Body::new(EntityId(5), EntityKind::Prop, DVec2::new(5.6, 5.0), 0.5, 3.0)];
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &[], props: &props }, &settings);

    // Already overlapping: the path never crosses the combined circle
    let result = engine.resolve_move(&mech(1, 5.0, 5.0), DVec2::new(5.1, 5.0), 0.0, false);
    assert!(result.collided);
    assert_eq!(result.collisions.len(), 1);
    assert_eq!(result.position, DVec2::new(5.0, 5.0));
}

#[test]
fn test_clamping_counts_as_collision() {
    let map = BattleMap::new(20, 20);
    let settings = settings();
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &[], props: &[] }, &settings);

    let result = engine.resolve_move(&mech(1, 1.0, 5.0), DVec2::new(-3.0, 5.0), -1.0, true);
    assert!(result.collided);
    assert_eq!(result.position, DVec2::new(settings.clip_distance, 5.0));
    assert_eq!(result.z, 0.0);
}

#[test]
fn test_resolution_is_idempotent() {
    let map = open_map_with_wall();
    let settings = settings();
    let props = [Body::new(EntityId(5), EntityKind::Prop, DVec2::new(7.0, 7.0), 0.8, 3.0)];
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &[], props: &props }, &settings);
    let mover = mech(1, 6.0, 6.0);

    let first = engine.resolve_move(&mover, DVec2::new(8.0, 8.0), 0.0, true);
    let second = engine.resolve_move(&mover, DVec2::new(8.0, 8.0), 0.0, true);
    assert_eq!(first, second);

    let mut moved = mover.clone();
    moved.pos = first.position;
    moved.z = first.z;
    let settled = engine.resolve_move(&moved, first.position, first.z, true);
    assert_eq!(settled.position, first.position);
    assert!(!settled.collided);
}

#[test]
fn test_randomized_moves_never_cross_walls() {
    let mut rng = fastrand::Rng::with_seed(42);
    let mut map = BattleMap::new(24, 24);
    for _ in 0..80 {
        map.block_cell(rng.usize(0..24), rng.usize(0..24));
    }
    map.rebuild_walls();
    let settings = settings();
    let engine = CollisionEngine::new(&map, CollisionWorld { units: &[], props: &[] }, &settings);

    let mut checked = 0;
    while checked < 500 {
        let (cx, cy) = (rng.usize(0..24), rng.usize(0..24));
        if !map.is_walkable(cx, cy) {
            continue;
        }
        let mover = mech(1, cx as f64 + 0.5, cy as f64 + 0.5);
        let target = DVec2::new(1.0 + rng.f64() * 22.0, 1.0 + rng.f64() * 22.0);
        let slide = rng.bool();

        let result = engine.resolve_move(&mover, target, 0.0, slide);
        assert!(
            !map.segment_blocked(mover.pos, result.position),
            "Tunneled from {:?} to {:?} (target {:?}, slide {})",
            mover.pos, result.position, target, slide
        );
        checked += 1;
    }
}

#[test]
fn test_proximity_test_is_a_superset_of_distance() {
    let a = DVec2::new(0.0, 0.0);
    assert!(proximity_test(1.0, a, DVec2::new(1.0, 1.0)));
    assert!(proximity_test(1.0, a, DVec2::new(0.6, 0.6)));
    assert!(!proximity_test(1.0, a, DVec2::new(1.01, 0.0)));
    assert!(proximity_test(2.0, a, DVec2::new(1.01, 0.0)));
}

#[test]
fn test_z_bands_by_anchor() {
    let bottom = mech(1, 0.0, 0.0);
    let center = bottom.clone().with_anchor(Anchor::Center);
    let top = bottom.clone().with_anchor(Anchor::Top);

    assert_eq!(z_min_max(&bottom, 1.0), (1.0, 3.0));
    assert_eq!(z_min_max(&center, 1.0), (0.0, 2.0));
    assert_eq!(z_min_max(&top, 1.0), (-1.0, 1.0));

    // Touching bands do not overlap
    assert!(!z_bands_overlap((0.0, 2.0), (2.0, 4.0)));
    assert!(z_bands_overlap((0.0, 2.0), (1.9, 4.0)));

    assert_eq!(z_intersection(5.0, &bottom), 2.0);
    assert_eq!(z_intersection(-1.0, &bottom), 0.0);
    assert_eq!(z_intersection(1.5, &bottom), 1.5);
}

#[test]
fn test_line_of_sight_blocked_by_wall_only() {
    let mut map = BattleMap::new(20, 20);
    assert!(line_of_sight(&map, DVec2::new(5.0, 5.0), DVec2::new(15.0, 5.0)));

    map.block_cell(10, 5);
    map.rebuild_walls();
    assert!(!line_of_sight(&map, DVec2::new(5.0, 5.5), DVec2::new(15.0, 5.5)));
    assert!(line_of_sight(&map, DVec2::new(5.0, 8.5), DVec2::new(15.0, 8.5)));
}
