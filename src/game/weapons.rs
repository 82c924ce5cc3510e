use bevy::math::DVec3;
use bevy::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::game::simulation::{Anchor, Body, EntityId, EntityKind, Projectile};

/// Technology base a weapon belongs to. Same-named weapons differ per tech.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TechBase {
    InnerSphere,
    Clan,
}

/// Broad weapon family used to fire "similar" weapons together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponClass {
    Energy,
    Ballistic,
    Missile,
}

/// Registry key for a weapon's projectile template.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WeaponKey {
    pub tech: TechBase,
    pub name: String,
}

/// A weapon mounted on a unit.
#[derive(Clone, Debug)]
pub struct Weapon {
    pub name: String,
    pub tech: TechBase,
    pub class: WeaponClass,
    /// Ticks between shots
    pub cooldown: u32,
    pub cooldown_remaining: u32,
    /// Heat added to the unit per shot
    pub heat: f64,
    /// `None` for weapons that need no ammunition
    pub ammo: Option<u32>,
    pub range: f64,
    pub damage: f64,
    /// Units per tick
    pub projectile_speed: f64,
}

impl Weapon {
    pub fn new(name: &str, tech: TechBase, class: WeaponClass) -> Self {
        Self {
            name: name.to_string(),
            tech,
            class,
            cooldown: 60,
            cooldown_remaining: 0,
            heat: 0.0,
            ammo: None,
            range: 20.0,
            damage: 5.0,
            projectile_speed: 1.0,
        }
    }

    pub fn key(&self) -> WeaponKey {
        WeaponKey { tech: self.tech, name: self.name.clone() }
    }

    pub fn has_ammo(&self) -> bool {
        self.ammo.is_none_or(|rounds| rounds > 0)
    }

    /// Off cooldown with ammunition to spare.
    pub fn is_ready(&self) -> bool {
        self.cooldown_remaining == 0 && self.has_ammo()
    }

    pub fn in_range(&self, distance: f64) -> bool {
        distance <= self.range
    }

    /// Advance the cooldown by one tick.
    pub fn tick(&mut self) {
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(1);
    }

    /// Trigger the weapon. Readiness is checked again here, so a weapon that
    /// was ready when selected but is not any more simply does not fire.
    pub fn try_fire(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        if let Some(rounds) = self.ammo.as_mut() {
            *rounds -= 1;
        }
        self.cooldown_remaining = self.cooldown;
        true
    }

    /// Ticks a shot needs to cover the weapon's full range.
    pub fn flight_ticks(&self) -> u32 {
        if self.projectile_speed <= 0.0 {
            return 1;
        }
        (self.range / self.projectile_speed).ceil().max(1.0) as u32
    }
}

/// Collision shape of the projectile a weapon throws.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileTemplate {
    pub radius: f64,
    pub height: f64,
    /// Extra ticks of flight beyond the weapon's range
    pub overshoot_ticks: u32,
}

impl Default for ProjectileTemplate {
    fn default() -> Self {
        Self {
            radius: 0.05,
            height: 0.1,
            overshoot_ticks: 2,
        }
    }
}

/// Projectile templates keyed by tech base and weapon name.
///
/// Owned by whoever loads weapon content and handed by reference to the code
/// that builds projectiles, so tests can run against their own registry.
#[derive(Resource, Default, Debug, Clone)]
pub struct ProjectileTemplates {
    templates: FxHashMap<WeaponKey, ProjectileTemplate>,
}

impl ProjectileTemplates {
    pub fn register(&mut self, tech: TechBase, name: &str, template: ProjectileTemplate) {
        self.templates.insert(WeaponKey { tech, name: name.to_string() }, template);
    }

    pub fn get(&self, weapon: &Weapon) -> Option<&ProjectileTemplate> {
        self.templates.get(&weapon.key())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Build the projectile `weapon` would launch from `muzzle`.
    ///
    /// Returns `None` (and logs) when no template is registered for the weapon.
    pub fn build_projectile(
        &self,
        id: EntityId,
        weapon: &Weapon,
        muzzle: DVec3,
        heading: f64,
        pitch: f64,
        shooter: EntityId,
        team: u8,
    ) -> Option<Projectile> {
        let Some(template) = self.get(weapon) else {
            warn!("[WEAPONS] No projectile template for {:?} {}", weapon.tech, weapon.name);
            return None;
        };

        let body = Body::new(id, EntityKind::Projectile, muzzle.truncate(), template.radius, template.height)
            .with_anchor(Anchor::Center)
            .with_z(muzzle.z)
            .with_parent(shooter);

        Some(Projectile {
            body,
            heading,
            pitch,
            speed: weapon.projectile_speed,
            damage: weapon.damage,
            lifespan: weapon.flight_ticks() + template.overshoot_ticks,
            team,
        })
    }
}
