use bevy::prelude::*;
use strider_macros::profile;

use super::battlefield::Battlefield;
use super::resources::*;

// ============================================================================
// Tick Bookkeeping
// ============================================================================

/// Increment the simulation tick counter.
/// Runs first in FixedUpdate so every later system sees the current tick.
pub fn increment_sim_tick(mut tick: ResMut<SimTick>) {
    tick.increment();
}

pub fn sim_start(
    #[allow(unused_variables)] stats: Res<SimPerformance>,
    #[allow(unused_variables)] tick: Res<SimTick>,
    #[allow(unused_variables)] field: Res<Battlefield>,
) {
    use crate::profile_log;

    profile_log!(tick, "[SIM STATUS] Tick: {} | Units: {} | Projectiles: {} | AI evaluated: {} | Last sim duration: {:?}",
          tick.0, field.units.len(), stats.projectiles_in_flight, stats.ai_evaluated_last_tick, stats.last_duration);
}

/// Update simulation performance stats
#[profile(16)]  // Warn if entire simulation tick > 16ms
pub fn sim_end(mut stats: ResMut<SimPerformance>, time: Res<Time<Fixed>>) {
    stats.last_duration = time.delta();
}

// ============================================================================
// Cleanup
// ============================================================================

/// Remove destroyed units, props and spent projectiles.
pub fn cleanup_destroyed(mut field: ResMut<Battlefield>, tick: Res<SimTick>) {
    let removed = field.sweep_destroyed();
    if !removed.is_empty() {
        debug!("[CLEANUP] Tick {}: removed {} units ({:?})", tick.0, removed.len(), removed);
    }
}
