/// The set of live entities: units, props and projectiles.

use bevy::math::DVec2;
use bevy::prelude::*;
use rustc_hash::FxHashMap;

use super::components::*;

/// Where an id lives inside the battlefield.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Unit(usize),
    Prop(usize),
    Projectile(usize),
}

/// Owner of every simulated entity.
///
/// Entities are stored per kind in plain vectors so the motion updater can
/// borrow units and props immutably while projectiles are advanced mutably.
/// Destroyed entities stay in place (and stay inert to every query) until
/// [`Battlefield::sweep_destroyed`] runs at the end of the tick.
#[derive(Resource, Default, Debug, Clone)]
pub struct Battlefield {
    pub units: Vec<Unit>,
    pub props: Vec<Body>,
    pub projectiles: Vec<Projectile>,
    index: FxHashMap<EntityId, Slot>,
    next_id: u32,
}

impl Battlefield {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh id. Ids are never reused.
    pub fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId(self.next_id)
    }

    /// Add a unit built by `build` around a freshly allocated id.
    pub fn spawn_unit(&mut self, build: impl FnOnce(EntityId) -> Unit) -> EntityId {
        let id = self.allocate_id();
        let mut unit = build(id);
        unit.body.id = id;
        self.index.insert(id, Slot::Unit(self.units.len()));
        self.units.push(unit);
        id
    }

    pub fn spawn_prop(&mut self, kind: EntityKind, pos: DVec2, radius: f64, height: f64) -> EntityId {
        let id = self.allocate_id();
        self.index.insert(id, Slot::Prop(self.props.len()));
        self.props.push(Body::new(id, kind, pos, radius, height));
        id
    }

    /// Add a projectile whose id came from [`Battlefield::allocate_id`].
    pub fn add_projectile(&mut self, projectile: Projectile) -> EntityId {
        let id = projectile.body.id;
        self.index.insert(id, Slot::Projectile(self.projectiles.len()));
        self.projectiles.push(projectile);
        id
    }

    pub fn body(&self, id: EntityId) -> Option<&Body> {
        match self.index.get(&id)? {
            Slot::Unit(i) => self.units.get(*i).map(|u| &u.body),
            Slot::Prop(i) => self.props.get(*i),
            Slot::Projectile(i) => self.projectiles.get(*i).map(|p| &p.body),
        }
    }

    pub fn unit_index(&self, id: EntityId) -> Option<usize> {
        match self.index.get(&id)? {
            Slot::Unit(i) => Some(*i),
            _ => None,
        }
    }

    pub fn unit(&self, id: EntityId) -> Option<&Unit> {
        self.unit_index(id).and_then(|i| self.units.get(i))
    }

    pub fn unit_mut(&mut self, id: EntityId) -> Option<&mut Unit> {
        self.unit_index(id).and_then(|i| self.units.get_mut(i))
    }

    /// True if the id resolves to an entity that has not been destroyed.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.body(id).is_some_and(|b| !b.destroyed)
    }

    pub fn living_units(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.units.iter().filter(|u| !u.is_destroyed())
    }

    /// Count of non-destroyed units per team.
    pub fn team_strength(&self, team: u8) -> usize {
        self.living_units().filter(|u| u.team == team).count()
    }

    /// Damage whatever `id` is. Props and projectiles shrug it off.
    /// Returns true if the hit destroyed a unit.
    pub fn apply_damage(&mut self, id: EntityId, amount: f64) -> bool {
        self.unit_mut(id).is_some_and(|unit| unit.apply_damage(amount))
    }

    /// Drop destroyed units, props and projectiles and re-index survivors.
    /// Returns the ids of units removed.
    pub fn sweep_destroyed(&mut self) -> Vec<EntityId> {
        let removed: Vec<EntityId> = self.units.iter()
            .filter(|u| u.is_destroyed())
            .map(|u| u.id())
            .collect();

        let before = self.units.len() + self.props.len() + self.projectiles.len();
        self.units.retain(|u| !u.is_destroyed());
        self.props.retain(|b| !b.destroyed);
        self.projectiles.retain(|p| !p.body.destroyed);
        let after = self.units.len() + self.props.len() + self.projectiles.len();

        if after != before {
            self.rebuild_index();
        }
        removed
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, unit) in self.units.iter().enumerate() {
            self.index.insert(unit.id(), Slot::Unit(i));
        }
        for (i, prop) in self.props.iter().enumerate() {
            self.index.insert(prop.id, Slot::Prop(i));
        }
        for (i, projectile) in self.projectiles.iter().enumerate() {
            self.index.insert(projectile.body.id, Slot::Projectile(i));
        }
    }
}
