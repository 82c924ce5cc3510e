use bevy::math::{DVec2, DVec3};

use crate::game::geometry::Circle;
use crate::game::simulation::EntityId;

/// Aiming memory between evaluations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GunneryState {
    pub ticks_since_fired: u32,
    /// Where the last aim solution expected the target to be
    pub lead: Option<DVec3>,
    /// 0.0 (no lock) to 1.0 (fully locked)
    pub lock: f64,
}

/// Route memory between evaluations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PilotingState {
    /// Remaining waypoints, next one last
    pub waypoints: Vec<DVec2>,
    pub ticks_since_path: u32,
    pub destination: Option<DVec2>,
    /// Chosen distance to hold from the current target
    pub standoff: Option<f64>,
}

impl PilotingState {
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.destination = None;
        self.standoff = None;
    }

    pub fn next_waypoint(&self) -> Option<DVec2> {
        self.waypoints.last().copied()
    }
}

/// Standing orders. Whoever sets up the mission writes these.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Orders {
    pub guard_area: Option<Circle>,
    /// Formation leader to stay close to
    pub guard_unit: Option<EntityId>,
    pub patrol: Vec<DVec2>,
    pub patrol_cursor: usize,
    pub withdraw_area: Option<Circle>,
}

/// Everything a behavior tree remembers about one unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AiState {
    pub gunnery: GunneryState,
    pub piloting: PilotingState,
    pub orders: Orders,
}
