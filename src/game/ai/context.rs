use rand::rngs::StdRng;

use crate::game::map::BattleMap;
use crate::game::pathfinding::PathProvider;
use crate::game::simulation::{AiSettings, Battlefield, EntityId, Unit, UnitWithdrawn, WeaponFired};
use crate::game::weapons::ProjectileTemplates;

/// Messages produced while evaluating trees, written out by the system
/// once every scheduled unit has run.
#[derive(Default, Debug)]
pub struct AiOutbox {
    pub fired: Vec<WeaponFired>,
    pub withdrawn: Vec<UnitWithdrawn>,
}

/// What a leaf may read and write while one unit's tree runs.
pub struct AiContext<'a> {
    /// The unit being evaluated
    pub unit: EntityId,
    pub field: &'a mut Battlefield,
    pub map: &'a BattleMap,
    pub pathing: &'a dyn PathProvider,
    pub settings: &'a AiSettings,
    pub templates: &'a ProjectileTemplates,
    pub rng: &'a mut StdRng,
    pub tick: u64,
    pub outbox: &'a mut AiOutbox,
}

impl AiContext<'_> {
    pub fn me(&self) -> Option<&Unit> {
        self.field.unit(self.unit)
    }

    pub fn me_mut(&mut self) -> Option<&mut Unit> {
        self.field.unit_mut(self.unit)
    }

    /// The unit's current target, if it is still standing.
    pub fn target(&self) -> Option<&Unit> {
        let target = self.me()?.target?;
        self.field.unit(target).filter(|t| !t.is_destroyed())
    }
}
