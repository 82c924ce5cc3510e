/// Messages emitted by the simulation.
///
/// Nothing inside the simulation reads these back. They exist for the
/// layers around it: audio, HUD, mission bookkeeping, logs.

use bevy::math::DVec3;
use bevy::prelude::*;

use super::components::EntityId;

/// A weapon launched a projectile.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct WeaponFired {
    pub shooter: EntityId,
    pub projectile: EntityId,
    pub weapon: String,
}

/// Something took damage from a projectile or a collision.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct EntityDamaged {
    pub entity: EntityId,
    /// `None` for collision damage
    pub source: Option<EntityId>,
    pub amount: f64,
}

/// A unit's structure reached zero.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct UnitDestroyed {
    pub entity: EntityId,
    pub team: u8,
}

/// A unit left the field by ejecting during forced withdrawal.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct UnitWithdrawn {
    pub entity: EntityId,
    pub team: u8,
}

/// A projectile stopped: against a body, a wall or the ground.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct ProjectileImpact {
    pub projectile: EntityId,
    /// The body hit, if any
    pub target: Option<EntityId>,
    pub position: DVec3,
}
