//! A ready-made two-lance battle used by the headless binary.
//!
//! Builds a small walled map, spawns a lance per side, puts every unit under
//! the combat tree and runs until one side is gone or the tick limit from
//! [`InitialConfig::skirmish_max_ticks`] is hit.

use bevy::math::DVec2;
use bevy::prelude::*;
use std::f64::consts::PI;

use crate::game::ai::{combat_tree, AiHandler};
use crate::game::config::InitialConfig;
use crate::game::geometry::Circle;
use crate::game::map::BattleMap;
use crate::game::simulation::{
    Battlefield, Body, EntityId, EntityKind, SimConfig, SimSet, SimTick, Unit, UnitDestroyed, UnitWithdrawn,
};
use crate::game::weapons::{ProjectileTemplate, ProjectileTemplates, TechBase, Weapon, WeaponClass};

pub const TEAMS: usize = 2;

/// How a skirmish ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkirmishOutcome {
    /// The given team is the only one with units left
    Victory(u8),
    /// Both sides lost everything on the same tick
    Draw,
    TimeLimit,
}

/// Running tally of the battle.
#[derive(Resource, Debug, Default)]
pub struct Skirmish {
    pub max_ticks: u64,
    pub destroyed: [u32; TEAMS],
    pub withdrawn: [u32; TEAMS],
    pub outcome: Option<SkirmishOutcome>,
}

/// Decide whether the battle is over at `tick`.
pub fn decide(field: &Battlefield, tick: u64, max_ticks: u64) -> Option<SkirmishOutcome> {
    let alive: Vec<u8> = (0..TEAMS as u8).filter(|team| field.team_strength(*team) > 0).collect();
    match alive.as_slice() {
        [] => Some(SkirmishOutcome::Draw),
        [team] => Some(SkirmishOutcome::Victory(*team)),
        _ if tick >= max_ticks => Some(SkirmishOutcome::TimeLimit),
        _ => None,
    }
}

pub struct SkirmishPlugin;

impl Plugin for SkirmishPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Skirmish>();
        app.add_systems(Startup, setup_skirmish.after(crate::game::ai::configure_ai_handler));
        app.add_systems(FixedUpdate, (tally_casualties, check_skirmish_end).chain().after(SimSet::Cleanup));
    }
}

// ============================================================================
// Content
// ============================================================================

fn ticks(seconds: f64, tick_rate: f64) -> u32 {
    (seconds * tick_rate).round().max(1.0) as u32
}

fn medium_laser(tick_rate: f64) -> Weapon {
    let mut weapon = Weapon::new("Medium Laser", TechBase::InnerSphere, WeaponClass::Energy);
    weapon.range = 18.0;
    weapon.damage = 5.0;
    weapon.heat = 3.0;
    weapon.cooldown = ticks(3.0, tick_rate);
    weapon.projectile_speed = 60.0 / tick_rate;
    weapon
}

fn autocannon(tick_rate: f64) -> Weapon {
    let mut weapon = Weapon::new("AC/5", TechBase::InnerSphere, WeaponClass::Ballistic);
    weapon.range = 24.0;
    weapon.damage = 5.0;
    weapon.heat = 1.0;
    weapon.ammo = Some(20);
    weapon.cooldown = ticks(4.0, tick_rate);
    weapon.projectile_speed = 30.0 / tick_rate;
    weapon
}

fn lrm(tick_rate: f64) -> Weapon {
    let mut weapon = Weapon::new("LRM-10", TechBase::Clan, WeaponClass::Missile);
    weapon.range = 30.0;
    weapon.damage = 6.0;
    weapon.heat = 4.0;
    weapon.ammo = Some(12);
    weapon.cooldown = ticks(5.0, tick_rate);
    weapon.projectile_speed = 20.0 / tick_rate;
    weapon
}

fn er_large_laser(tick_rate: f64) -> Weapon {
    let mut weapon = Weapon::new("ER Large Laser", TechBase::Clan, WeaponClass::Energy);
    weapon.range = 26.0;
    weapon.damage = 8.0;
    weapon.heat = 8.0;
    weapon.cooldown = ticks(4.0, tick_rate);
    weapon.projectile_speed = 80.0 / tick_rate;
    weapon
}

fn register_templates(templates: &mut ProjectileTemplates) {
    let beam = ProjectileTemplate { radius: 0.05, height: 0.1, overshoot_ticks: 1 };
    let slug = ProjectileTemplate { radius: 0.1, height: 0.2, overshoot_ticks: 3 };
    let missile = ProjectileTemplate { radius: 0.15, height: 0.15, overshoot_ticks: 6 };

    templates.register(TechBase::InnerSphere, "Medium Laser", beam);
    templates.register(TechBase::Clan, "ER Large Laser", beam);
    templates.register(TechBase::InnerSphere, "AC/5", slug);
    templates.register(TechBase::Clan, "LRM-10", missile);
}

/// Stat line for a unit, with speeds per second.
struct Chassis {
    radius: f64,
    height: f64,
    speed: f64,
    turn_rate_deg: f64,
    structure: f64,
    armor: f64,
    max_heat: f64,
    dissipation: f64,
}

fn chassis(kind: EntityKind) -> Chassis {
    match kind {
        EntityKind::Vtol => Chassis {
            radius: 0.8, height: 1.5, speed: 6.0, turn_rate_deg: 120.0,
            structure: 8.0, armor: 8.0, max_heat: 0.0, dissipation: 0.0,
        },
        EntityKind::Vehicle => Chassis {
            radius: 0.7, height: 2.0, speed: 4.0, turn_rate_deg: 90.0,
            structure: 12.0, armor: 16.0, max_heat: 0.0, dissipation: 0.0,
        },
        _ => Chassis {
            radius: 0.6, height: 3.0, speed: 3.0, turn_rate_deg: 60.0,
            structure: 20.0, armor: 30.0, max_heat: 30.0, dissipation: 10.0,
        },
    }
}

fn spawn(
    field: &mut Battlefield,
    kind: EntityKind,
    pos: DVec2,
    team: u8,
    tick_rate: f64,
    armament: Vec<Weapon>,
) -> EntityId {
    let stats = chassis(kind);
    field.spawn_unit(|id| {
        let mut unit = Unit::new(Body::new(id, kind, pos, stats.radius, stats.height), team);
        unit.max_velocity = stats.speed / tick_rate;
        unit.turn_rate = stats.turn_rate_deg.to_radians() / tick_rate;
        unit.structure = stats.structure;
        unit.max_structure = stats.structure;
        unit.armor = stats.armor;
        unit.max_armor = stats.armor;
        unit.max_heat = stats.max_heat;
        unit.heat_dissipation = stats.dissipation / tick_rate;
        unit.armament = armament;
        unit.face(if team == 0 { 0.0 } else { PI });
        unit
    })
}

/// 48x32 arena with two blocks of buildings splitting the middle.
fn build_map(clip_distance: f64) -> BattleMap {
    let mut map = BattleMap::new(48, 32);
    for x in 21..27 {
        for y in (7..12).chain(20..25) {
            map.block_cell(x, y);
        }
    }
    for (x, y) in [(12, 4), (35, 27), (14, 26), (33, 5)] {
        map.block_cell(x, y);
    }
    map.set_clip_distance(clip_distance);
    map
}

fn setup_skirmish(
    mut map: ResMut<BattleMap>,
    mut field: ResMut<Battlefield>,
    mut templates: ResMut<ProjectileTemplates>,
    mut handler: ResMut<AiHandler>,
    mut skirmish: ResMut<Skirmish>,
    config: Res<SimConfig>,
    initial: Res<InitialConfig>,
) {
    let rate = config.tick_rate;
    *map = build_map(config.collision.clip_distance);
    register_templates(&mut templates);

    for pos in [DVec2::new(18.0, 13.0), DVec2::new(30.0, 19.0), DVec2::new(24.0, 3.0), DVec2::new(24.0, 29.0)] {
        field.spawn_prop(EntityKind::Prop, pos, 0.6, 4.0);
    }

    // West lance: an Inner Sphere command lance on patrol through the middle
    let home = Circle::new(DVec2::new(2.5, 16.0), 3.0);
    let leader = spawn(&mut field, EntityKind::Mech, DVec2::new(6.0, 16.0), 0, rate,
        vec![medium_laser(rate), medium_laser(rate), autocannon(rate)]);
    let orders = &mut handler.add(leader, combat_tree()).orders;
    orders.withdraw_area = Some(home);
    orders.patrol = vec![DVec2::new(16.0, 16.0), DVec2::new(32.0, 16.0)];

    for pos in [DVec2::new(5.0, 13.0), DVec2::new(5.0, 19.0)] {
        let wingman = spawn(&mut field, EntityKind::Mech, pos, 0, rate, vec![medium_laser(rate), autocannon(rate)]);
        let orders = &mut handler.add(wingman, combat_tree()).orders;
        orders.withdraw_area = Some(home);
        orders.guard_unit = Some(leader);
    }
    let tank = spawn(&mut field, EntityKind::Vehicle, DVec2::new(4.0, 16.0), 0, rate, vec![autocannon(rate)]);
    let orders = &mut handler.add(tank, combat_tree()).orders;
    orders.withdraw_area = Some(home);
    orders.guard_unit = Some(leader);

    // East lance: a Clan star holding its ground
    let home = Circle::new(DVec2::new(45.5, 16.0), 3.0);
    let hold = Circle::new(DVec2::new(38.0, 16.0), 6.0);
    for pos in [DVec2::new(42.0, 12.0), DVec2::new(42.0, 16.0), DVec2::new(42.0, 20.0)] {
        let mech = spawn(&mut field, EntityKind::Mech, pos, 1, rate, vec![er_large_laser(rate), lrm(rate)]);
        let orders = &mut handler.add(mech, combat_tree()).orders;
        orders.withdraw_area = Some(home);
        orders.guard_area = Some(hold);
    }
    let vtol = spawn(&mut field, EntityKind::Vtol, DVec2::new(44.0, 16.0), 1, rate, vec![medium_laser(rate)]);
    handler.add(vtol, combat_tree()).orders.withdraw_area = Some(home);

    skirmish.max_ticks = initial.skirmish_max_ticks;
    info!("[SKIRMISH] {} units deployed on a {}x{} map, {} AI behaviors, tick limit {}",
          field.units.len(), map.width(), map.height(), handler.len(), skirmish.max_ticks);
}

// ============================================================================
// Systems
// ============================================================================

fn tally_casualties(
    mut skirmish: ResMut<Skirmish>,
    mut destroyed: MessageReader<UnitDestroyed>,
    mut withdrawn: MessageReader<UnitWithdrawn>,
) {
    for message in destroyed.read() {
        if let Some(count) = skirmish.destroyed.get_mut(message.team as usize) {
            *count += 1;
        }
    }
    for message in withdrawn.read() {
        if let Some(count) = skirmish.withdrawn.get_mut(message.team as usize) {
            *count += 1;
        }
    }
}

fn check_skirmish_end(
    field: Res<Battlefield>,
    tick: Res<SimTick>,
    mut skirmish: ResMut<Skirmish>,
    mut exit: MessageWriter<AppExit>,
) {
    if skirmish.outcome.is_some() {
        return;
    }
    let Some(outcome) = decide(&field, tick.0, skirmish.max_ticks) else {
        return;
    };

    skirmish.outcome = Some(outcome);
    info!("[SKIRMISH] {:?} after {} ticks | destroyed {:?} | withdrawn {:?} | survivors {}/{}",
          outcome, tick.0, skirmish.destroyed, skirmish.withdrawn,
          field.team_strength(0), field.team_strength(1));
    exit.write(AppExit::Success);
}
