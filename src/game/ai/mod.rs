/// AI decision engine.
///
/// This module is organized into:
/// - **behavior**: Behavior tree nodes, leaves and the stock trees
/// - **state**: Per-unit memory the trees read and write
/// - **context**: What a leaf sees while it runs
/// - **initiative**: Time-slicing of AI evaluation across ticks
/// - **gunnery**: Targeting, aiming and firing leaves
/// - **piloting**: Movement, withdrawal and standing-order leaves

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use strider_macros::profile;

pub mod behavior;
pub mod context;
pub mod gunnery;
pub mod initiative;
pub mod piloting;
pub mod state;

pub use behavior::{combat_tree, withdrawal_tree, BehaviorNode, Leaf, Status};
pub use context::{AiContext, AiOutbox};
pub use initiative::{InitiativeScheduler, INITIATIVE_SLOTS};
pub use state::{AiState, GunneryState, Orders, PilotingState};

use crate::game::map::BattleMap;
use crate::game::simulation::{
    AiSettings, Battlefield, EntityId, SimConfig, SimPerformance, SimSet, SimTick, UnitWithdrawn, WeaponFired,
};
use crate::game::weapons::ProjectileTemplates;

/// One AI-controlled unit: its tree and its memory.
#[derive(Clone, Debug)]
pub struct AiBehavior {
    pub unit: EntityId,
    pub tree: BehaviorNode,
    pub state: AiState,
}

/// Owner of every AI behavior, the initiative schedule and the seeded RNG
/// all AI randomness is drawn from.
#[derive(Resource)]
pub struct AiHandler {
    behaviors: Vec<AiBehavior>,
    index: FxHashMap<EntityId, usize>,
    scheduler: InitiativeScheduler,
    rng: StdRng,
}

impl Default for AiHandler {
    fn default() -> Self {
        Self::new(&SimConfig::default().ai)
    }
}

impl AiHandler {
    pub fn new(settings: &AiSettings) -> Self {
        Self {
            behaviors: Vec::new(),
            index: FxHashMap::default(),
            scheduler: InitiativeScheduler::new(settings.initiative_reroll_ticks),
            rng: StdRng::seed_from_u64(settings.seed),
        }
    }

    /// Re-seed and re-time the handler from fresh settings. Registered
    /// behaviors are kept.
    pub fn configure(&mut self, settings: &AiSettings) {
        self.rng = StdRng::seed_from_u64(settings.seed);
        self.scheduler.set_reroll_ticks(settings.initiative_reroll_ticks);
        self.scheduler.request_roll();
    }

    /// Put `unit` under AI control. Returns its state so orders can be set.
    pub fn add(&mut self, unit: EntityId, tree: BehaviorNode) -> &mut AiState {
        let slot = match self.index.get(&unit) {
            Some(&slot) => {
                self.behaviors[slot].tree = tree;
                slot
            }
            None => {
                self.index.insert(unit, self.behaviors.len());
                self.behaviors.push(AiBehavior { unit, tree, state: AiState::default() });
                self.behaviors.len() - 1
            }
        };
        self.scheduler.request_roll();
        &mut self.behaviors[slot].state
    }

    pub fn state(&self, unit: EntityId) -> Option<&AiState> {
        self.index.get(&unit).map(|&i| &self.behaviors[i].state)
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    pub fn scheduler(&self) -> &InitiativeScheduler {
        &self.scheduler
    }

    fn reindex(&mut self) {
        self.index = self.behaviors.iter().enumerate().map(|(i, b)| (b.unit, i)).collect();
    }

    /// Run one tick: age every behavior's timers, then evaluate the trees of
    /// the units whose initiative slot is up. Returns how many trees ran.
    pub fn tick(
        &mut self,
        field: &mut Battlefield,
        map: &BattleMap,
        settings: &AiSettings,
        templates: &ProjectileTemplates,
        tick: u64,
        outbox: &mut AiOutbox,
    ) -> usize {
        for behavior in self.behaviors.iter_mut() {
            let state = &mut behavior.state;
            state.gunnery.ticks_since_fired = state.gunnery.ticks_since_fired.saturating_add(1);
            state.piloting.ticks_since_path = state.piloting.ticks_since_path.saturating_add(1);
        }

        let live: Vec<EntityId> = self
            .behaviors
            .iter()
            .map(|b| b.unit)
            .filter(|id| field.is_alive(*id))
            .collect();
        let active = self.scheduler.next(&live, &mut self.rng);

        let mut evaluated = 0;
        for id in active {
            let Some(&slot) = self.index.get(&id) else {
                continue;
            };
            // Stale slot entries and shut-down units sit this one out
            if !field.unit(id).is_some_and(|u| u.is_active()) {
                continue;
            }

            let AiBehavior { tree, state, .. } = &mut self.behaviors[slot];
            let mut ctx = AiContext {
                unit: id,
                field: &mut *field,
                map,
                pathing: map,
                settings,
                templates,
                rng: &mut self.rng,
                tick,
                outbox: &mut *outbox,
            };
            tree.evaluate(&mut ctx, state);
            evaluated += 1;
        }
        evaluated
    }

    /// Drop behaviors whose unit is gone or destroyed.
    pub fn prune(&mut self, field: &Battlefield) -> usize {
        let before = self.behaviors.len();
        self.behaviors.retain(|b| field.is_alive(b.unit));
        let removed = before - self.behaviors.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }
}

// ============================================================================
// Systems
// ============================================================================

pub fn configure_ai_handler(mut handler: ResMut<AiHandler>, config: Res<SimConfig>) {
    handler.configure(&config.ai);
    info!("[AI] Handler seeded with {:#x}, {} behaviors registered", config.ai.seed, handler.len());
}

#[profile(8)]
pub fn run_ai(
    mut handler: ResMut<AiHandler>,
    mut field: ResMut<Battlefield>,
    map: Res<BattleMap>,
    config: Res<SimConfig>,
    templates: Res<ProjectileTemplates>,
    tick: Res<SimTick>,
    mut perf: ResMut<SimPerformance>,
    mut fired: MessageWriter<WeaponFired>,
    mut withdrawn: MessageWriter<UnitWithdrawn>,
) {
    let mut outbox = AiOutbox::default();
    perf.ai_evaluated_last_tick = handler.tick(&mut field, &map, &config.ai, &templates, tick.0, &mut outbox);

    for message in outbox.fired {
        fired.write(message);
    }
    for message in outbox.withdrawn {
        withdrawn.write(message);
    }
}

pub fn prune_behaviors(mut handler: ResMut<AiHandler>, field: Res<Battlefield>) {
    let removed = handler.prune(&field);
    if removed > 0 {
        debug!("[AI] Dropped {} behaviors of destroyed units", removed);
    }
}

pub struct AiPlugin;

impl Plugin for AiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AiHandler>();

        app.add_systems(Startup, configure_ai_handler.after(crate::game::config::init_sim_config_from_initial));
        app.add_systems(FixedUpdate, (
            run_ai.in_set(SimSet::Behavior),
            prune_behaviors
                .in_set(SimSet::Cleanup)
                .before(crate::game::simulation::systems::cleanup_destroyed),
        ));
    }
}

// ============================================================================
// Test support
// ============================================================================
