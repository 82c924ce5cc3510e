use bevy::math::DVec2;
use bevy::prelude::*;
use std::f64::consts::PI;

use strider::game::ai::{combat_tree, AiHandler};
use strider::game::geometry::Circle;
use strider::game::map::BattleMap;
use strider::game::simulation::{
    Battlefield, Body, EntityId, EntityKind, SimConfig, SimPerformance, SimSet, Unit, UnitDestroyed, UnitWithdrawn,
    WeaponFired,
};
use strider::game::weapons::{ProjectileTemplate, ProjectileTemplates, TechBase, Weapon, WeaponClass};
use strider::game::GamePlugin;

/// Counts messages the simulation emitted.
#[derive(Resource, Default, Debug)]
struct Tally {
    fired: usize,
    destroyed: usize,
    withdrawn: usize,
}

fn tally(
    mut tally: ResMut<Tally>,
    mut fired: MessageReader<WeaponFired>,
    mut destroyed: MessageReader<UnitDestroyed>,
    mut withdrawn: MessageReader<UnitWithdrawn>,
) {
    tally.fired += fired.read().count();
    tally.destroyed += destroyed.read().count();
    tally.withdrawn += withdrawn.read().count();
}

/// App with the full game stack, started up, on an empty 64x64 map.
fn battle_app(seed: u64) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(GamePlugin);
    app.init_resource::<Tally>();
    app.add_systems(FixedUpdate, tally.after(SimSet::Cleanup));

    // Startup: config load, AI handler seeding
    app.update();

    let ai = {
        let mut config = app.world_mut().resource_mut::<SimConfig>();
        config.ai.seed = seed;
        config.ai.clone()
    };
    app.world_mut().resource_mut::<AiHandler>().configure(&ai);
    app.world_mut()
        .resource_mut::<ProjectileTemplates>()
        .register(TechBase::InnerSphere, "Medium Laser", ProjectileTemplate::default());
    app
}

fn laser() -> Weapon {
    let mut weapon = Weapon::new("Medium Laser", TechBase::InnerSphere, WeaponClass::Energy);
    weapon.range = 20.0;
    weapon.damage = 5.0;
    weapon.heat = 3.0;
    weapon.cooldown = 15;
    weapon.projectile_speed = 2.0;
    weapon
}

fn spawn_mech(app: &mut App, pos: DVec2, team: u8, heading: f64) -> EntityId {
    let mut field = app.world_mut().resource_mut::<Battlefield>();
    field.spawn_unit(|id| {
        let mut unit = Unit::new(Body::new(id, EntityKind::Mech, pos, 0.5, 2.0), team);
        unit.max_velocity = 0.1;
        unit.turn_rate = 0.05;
        unit.structure = 10.0;
        unit.max_structure = 10.0;
        unit.max_heat = 30.0;
        unit.heat_dissipation = 0.2;
        unit.armament.push(laser());
        unit.face(heading);
        unit
    })
}

fn add_ai(app: &mut App, unit: EntityId, withdraw_area: Option<Circle>) {
    let mut handler = app.world_mut().resource_mut::<AiHandler>();
    handler.add(unit, combat_tree()).orders.withdraw_area = withdraw_area;
}

fn tick(app: &mut App, count: usize) {
    for _ in 0..count {
        app.world_mut().run_schedule(FixedUpdate);
    }
}

/// Position, heading and damage state of every unit, bit for bit.
fn snapshot(app: &App) -> Vec<(EntityId, [u64; 5])> {
    app.world()
        .resource::<Battlefield>()
        .units
        .iter()
        .map(|u| (u.id(), [
            u.body.pos.x.to_bits(),
            u.body.pos.y.to_bits(),
            u.heading.to_bits(),
            u.turret_angle.to_bits(),
            u.structure.to_bits(),
        ]))
        .collect()
}

#[test]
fn test_duel_ends_with_a_casualty() {
    let mut app = battle_app(11);
    {
        let mut config = app.world_mut().resource_mut::<SimConfig>();
        config.ai.aim_jitter = 0.0;
        config.ai.fire_chance_base = 1.0;
    }
    let a = spawn_mech(&mut app, DVec2::new(20.0, 32.0), 0, 0.0);
    let b = spawn_mech(&mut app, DVec2::new(40.0, 32.0), 1, PI);
    add_ai(&mut app, a, None);
    add_ai(&mut app, b, None);

    for _ in 0..1200 {
        tick(&mut app, 1);
        if app.world().resource::<Tally>().destroyed > 0 {
            break;
        }
    }

    let tally = app.world().resource::<Tally>();
    assert!(tally.fired > 0, "Nobody fired");
    assert!(tally.destroyed > 0, "Duel never produced a casualty: {:?}", tally);

    // Destroyed units are swept and their behaviors dropped in the same tick
    let field = app.world().resource::<Battlefield>();
    assert!(field.units.iter().all(|u| !u.is_destroyed()));
    assert_eq!(app.world().resource::<AiHandler>().len(), field.units.len());
}

#[test]
fn test_seeded_battles_are_deterministic() {
    let run = |seed: u64| {
        let mut app = battle_app(seed);
        for i in 0..3 {
            let y = 20.0 + 6.0 * i as f64;
            let west = spawn_mech(&mut app, DVec2::new(15.0, y), 0, 0.0);
            let east = spawn_mech(&mut app, DVec2::new(45.0, y), 1, PI);
            add_ai(&mut app, west, None);
            add_ai(&mut app, east, None);
        }
        tick(&mut app, 600);
        (snapshot(&app), app.world().resource::<Tally>().fired)
    };

    let first = run(1234);
    let second = run(1234);
    assert_eq!(first, second);
    assert!(first.1 > 0, "Battle should have seen some fire");
}

#[test]
fn test_initiative_spreads_ai_over_ticks() {
    let mut app = battle_app(5);
    for i in 0..8 {
        let unit = spawn_mech(&mut app, DVec2::new(8.0 + 4.0 * i as f64, 10.0), 0, 0.0);
        add_ai(&mut app, unit, None);
    }

    for _ in 0..8 {
        tick(&mut app, 1);
        assert_eq!(app.world().resource::<SimPerformance>().ai_evaluated_last_tick, 2);
    }
}

#[test]
fn test_badly_damaged_unit_withdraws() {
    let mut app = battle_app(3);
    let home = Circle::new(DVec2::new(10.0, 10.0), 3.0);

    let crippled = spawn_mech(&mut app, DVec2::new(10.0, 10.0), 0, 0.0);
    let holding = spawn_mech(&mut app, DVec2::new(11.0, 12.0), 0, 0.0);
    {
        let mut field = app.world_mut().resource_mut::<Battlefield>();
        if let Some(unit) = field.unit_mut(crippled) {
            unit.structure = 1.9;
        }
        // Exactly at the threshold is not below it
        if let Some(unit) = field.unit_mut(holding) {
            unit.structure = 2.0;
        }
    }
    add_ai(&mut app, crippled, Some(home));
    add_ai(&mut app, holding, Some(home));

    // Every unit gets a turn within four ticks
    tick(&mut app, 4);

    let field = app.world().resource::<Battlefield>();
    assert!(field.unit(crippled).is_none(), "Withdrawn unit should be swept");
    assert!(field.unit(holding).is_some());
    assert_eq!(app.world().resource::<Tally>().withdrawn, 1);
    assert!(app.world().resource::<AiHandler>().state(crippled).is_none());
}

#[test]
fn test_units_do_not_drive_through_walls() {
    let mut app = battle_app(1);
    {
        let mut map = app.world_mut().resource_mut::<BattleMap>();
        for y in 0..64 {
            map.block_cell(20, y);
        }
        map.rebuild_walls();
    }
    // No AI: the unit just drives east at full speed
    let unit = spawn_mech(&mut app, DVec2::new(15.0, 30.0), 0, 0.0);
    {
        let mut field = app.world_mut().resource_mut::<Battlefield>();
        if let Some(unit) = field.unit_mut(unit) {
            unit.target_velocity = unit.max_velocity;
        }
    }

    tick(&mut app, 200);

    let field = app.world().resource::<Battlefield>();
    let pos = field.unit(unit).map(|u| u.body.pos).unwrap_or_default();
    assert!(pos.x < 20.0, "Unit went through the wall to {:?}", pos);
    assert!(pos.x > 19.0, "Unit should have reached the wall, stopped at {:?}", pos);
}

#[test]
fn test_stray_projectiles_expire() {
    let mut app = battle_app(1);
    let shooter = spawn_mech(&mut app, DVec2::new(32.0, 32.0), 0, 0.0);
    {
        let world = app.world_mut();
        let shot = world.resource::<ProjectileTemplates>().build_projectile(
            EntityId(10_000), &laser(), DVec2::new(32.0, 32.0).extend(1.0), PI / 2.0, 0.0, shooter, 0,
        );
        let mut field = world.resource_mut::<Battlefield>();
        if let Some(shot) = shot {
            field.add_projectile(shot);
        }
        assert_eq!(field.projectiles.len(), 1);
    }

    // Range 20 at speed 2 is 10 ticks, plus overshoot
    tick(&mut app, 20);
    assert!(app.world().resource::<Battlefield>().projectiles.is_empty());
}
