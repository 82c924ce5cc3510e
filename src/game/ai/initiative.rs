use rand::Rng;

use crate::game::simulation::EntityId;

/// Number of groups the AI population is split into. One group runs per tick.
pub const INITIATIVE_SLOTS: usize = 4;

/// Time-slices AI evaluation across ticks.
///
/// Live AI units are shuffled by a random priority and dealt round-robin
/// into [`INITIATIVE_SLOTS`] groups. Each tick hands out the next group, so
/// every unit thinks once every four ticks. The deal is repeated every
/// `reroll_ticks` so no unit keeps first pick forever.
///
/// Ids of units that die between rolls stay in their slot until the next
/// roll; callers must skip them.
#[derive(Clone, Debug)]
pub struct InitiativeScheduler {
    slots: [Vec<EntityId>; INITIATIVE_SLOTS],
    counter: u32,
    reroll_ticks: u32,
    needs_roll: bool,
}

impl InitiativeScheduler {
    pub fn new(reroll_ticks: u32) -> Self {
        Self {
            slots: Default::default(),
            counter: 0,
            reroll_ticks: reroll_ticks.max(1),
            needs_roll: true,
        }
    }

    pub fn set_reroll_ticks(&mut self, reroll_ticks: u32) {
        self.reroll_ticks = reroll_ticks.max(1);
    }

    /// Force a fresh deal on the next call to [`InitiativeScheduler::next`].
    pub fn request_roll(&mut self) {
        self.needs_roll = true;
    }

    pub fn slots(&self) -> &[Vec<EntityId>; INITIATIVE_SLOTS] {
        &self.slots
    }

    /// Deal `live` into the slots by descending random priority.
    pub fn roll<R: Rng>(&mut self, live: &[EntityId], rng: &mut R) {
        let mut rolled: Vec<(f64, EntityId)> = live.iter().map(|id| (rng.random::<f64>(), *id)).collect();
        rolled.sort_by(|a, b| b.0.total_cmp(&a.0));

        for slot in self.slots.iter_mut() {
            slot.clear();
        }
        for (i, (_, id)) in rolled.into_iter().enumerate() {
            self.slots[i % INITIATIVE_SLOTS].push(id);
        }
        self.needs_roll = false;
    }

    /// Ids whose turn it is this tick.
    pub fn next<R: Rng>(&mut self, live: &[EntityId], rng: &mut R) -> Vec<EntityId> {
        if self.needs_roll || self.counter >= self.reroll_ticks {
            self.roll(live, rng);
            self.counter = 0;
            bevy::log::debug!("[INITIATIVE] Rolled {} units: {:?}", live.len(),
                self.slots.iter().map(Vec::len).collect::<Vec<_>>());
        }

        let slot = self.slots[self.counter as usize % INITIATIVE_SLOTS].clone();
        self.counter += 1;
        slot
    }
}
