/// Entity records for the simulation layer.
///
/// Every simulated object shares a [`Body`]: the part the collision engine
/// reads. Units and projectiles wrap a body with their own state; props are
/// bare bodies. All of them live in the [`Battlefield`](super::Battlefield).

use bevy::math::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::game::weapons::Weapon;

// ============================================================================
// Identity
// ============================================================================

/// Stable handle for anything stored in the battlefield.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// What an entity is. Decides collision eligibility and some AI rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Static map object (rock, building, tree)
    Prop,
    Mech,
    Vehicle,
    Vtol,
    Infantry,
    /// Fixed turret; cannot move or withdraw
    Emplacement,
    Projectile,
    /// Visual-only sprite
    Effect,
}

impl EntityKind {
    /// Whether other movers can bump into this kind of entity.
    pub fn is_collision_target(self) -> bool {
        !matches!(self, EntityKind::Projectile | EntityKind::Effect)
    }

    pub fn is_unit(self) -> bool {
        matches!(
            self,
            EntityKind::Mech
                | EntityKind::Vehicle
                | EntityKind::Vtol
                | EntityKind::Infantry
                | EntityKind::Emplacement
        )
    }
}

/// Vertical reference point of an entity's Z position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anchor {
    #[default]
    Bottom,
    Center,
    Top,
}

// ============================================================================
// Body
// ============================================================================

/// Position and collision shape shared by every entity.
///
/// The collision volume is an upright cylinder of `radius` around `pos`,
/// spanning `height` vertically as placed by `anchor` relative to `z`.
/// A non-positive radius or height opts the entity out of collision.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pos: DVec2,
    pub z: f64,
    pub radius: f64,
    pub height: f64,
    pub anchor: Anchor,
    pub destroyed: bool,
    /// Entity that spawned this one (a projectile's shooter). Never collided with.
    pub parent: Option<EntityId>,
}

impl Body {
    pub fn new(id: EntityId, kind: EntityKind, pos: DVec2, radius: f64, height: f64) -> Self {
        Self {
            id,
            kind,
            pos,
            z: 0.0,
            radius,
            height,
            anchor: Anchor::Bottom,
            destroyed: false,
            parent: None,
        }
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self.z = self.floor_z();
        self
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.z = z;
        self
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Entities with non-positive dimensions never collide.
    pub fn is_collidable(&self) -> bool {
        self.radius > 0.0 && self.height > 0.0
    }

    /// Lowest Z this entity may occupy while its band stays above ground.
    pub fn floor_z(&self) -> f64 {
        match self.anchor {
            Anchor::Bottom => 0.0,
            Anchor::Center => self.height / 2.0,
            Anchor::Top => self.height,
        }
    }

    /// Z of the middle of the collision band.
    pub fn center_z(&self) -> f64 {
        match self.anchor {
            Anchor::Bottom => self.z + self.height / 2.0,
            Anchor::Center => self.z,
            Anchor::Top => self.z - self.height / 2.0,
        }
    }

    pub fn pos3(&self) -> DVec3 {
        self.pos.extend(self.z)
    }
}

// ============================================================================
// Units
// ============================================================================

/// A combat-capable entity.
///
/// Fields prefixed `target_` are intent written by the AI (or the player
/// controller); the motion updater turns the current state toward them at
/// the unit's rates each tick. The render layer reads both, never writes.
#[derive(Clone, Debug)]
pub struct Unit {
    pub body: Body,
    pub team: u8,

    pub heading: f64,
    pub turret_angle: f64,
    pub pitch: f64,
    /// Forward speed in units per tick
    pub velocity: f64,
    pub velocity_z: f64,
    pub max_velocity: f64,
    /// Radians per tick
    pub turn_rate: f64,

    pub target_heading: f64,
    pub target_velocity: f64,
    pub target_turret_angle: f64,
    pub target_pitch: f64,

    pub armament: Vec<Weapon>,
    pub heat: f64,
    pub max_heat: f64,
    /// Heat shed per tick
    pub heat_dissipation: f64,

    pub structure: f64,
    pub max_structure: f64,
    pub armor: f64,
    pub max_armor: f64,

    pub target: Option<EntityId>,
    pub powered: bool,
    /// Set when the unit left the field through withdrawal rather than destruction
    pub withdrawn: bool,
}

impl Unit {
    pub fn new(body: Body, team: u8) -> Self {
        Self {
            body,
            team,
            heading: 0.0,
            turret_angle: 0.0,
            pitch: 0.0,
            velocity: 0.0,
            velocity_z: 0.0,
            max_velocity: 0.0,
            turn_rate: 0.0,
            target_heading: 0.0,
            target_velocity: 0.0,
            target_turret_angle: 0.0,
            target_pitch: 0.0,
            armament: Vec::new(),
            heat: 0.0,
            max_heat: 0.0,
            heat_dissipation: 0.0,
            structure: 1.0,
            max_structure: 1.0,
            armor: 0.0,
            max_armor: 0.0,
            target: None,
            powered: true,
            withdrawn: false,
        }
    }

    pub fn id(&self) -> EntityId {
        self.body.id
    }

    pub fn kind(&self) -> EntityKind {
        self.body.kind
    }

    pub fn is_destroyed(&self) -> bool {
        self.body.destroyed
    }

    pub fn is_active(&self) -> bool {
        !self.body.destroyed && self.powered
    }

    pub fn face(&mut self, heading: f64) {
        self.heading = heading;
        self.target_heading = heading;
        self.turret_angle = heading;
        self.target_turret_angle = heading;
    }

    /// Ground-plane velocity vector.
    pub fn velocity_vector(&self) -> DVec2 {
        crate::game::geometry::direction(self.heading) * self.velocity
    }

    /// Fraction of structure left, `0.0..=1.0`.
    pub fn structure_ratio(&self) -> f64 {
        if self.max_structure <= 0.0 {
            return 0.0;
        }
        (self.structure / self.max_structure).clamp(0.0, 1.0)
    }

    /// Armor soaks damage first; whatever gets through comes off structure.
    /// Returns true if this hit destroyed the unit.
    pub fn apply_damage(&mut self, amount: f64) -> bool {
        if self.body.destroyed || amount <= 0.0 {
            return false;
        }

        let absorbed = amount.min(self.armor);
        self.armor -= absorbed;
        self.structure -= amount - absorbed;

        if self.structure <= 0.0 {
            self.structure = 0.0;
            self.body.destroyed = true;
            self.powered = false;
            self.velocity = 0.0;
            self.target_velocity = 0.0;
            return true;
        }
        false
    }
}

// ============================================================================
// Projectiles
// ============================================================================

/// A shot in flight.
#[derive(Clone, Debug)]
pub struct Projectile {
    pub body: Body,
    pub heading: f64,
    pub pitch: f64,
    /// Units per tick along the flight direction
    pub speed: f64,
    pub damage: f64,
    /// Ticks left before the shot fizzles
    pub lifespan: u32,
    pub team: u8,
}

impl Projectile {
    /// Displacement for one tick of flight.
    pub fn step(&self) -> DVec3 {
        let ground = crate::game::geometry::direction(self.heading) * self.speed * self.pitch.cos();
        ground.extend(self.speed * self.pitch.sin())
    }
}
