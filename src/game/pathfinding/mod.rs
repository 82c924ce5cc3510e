mod astar;


use bevy::math::DVec2;
use bevy::prelude::*;

use crate::game::map::BattleMap;

pub use astar::Node;

/// Anything that can route a unit across the map.
///
/// Routes are waypoint lists ending exactly at the requested destination.
/// The starting position is never included.
pub trait PathProvider {
    fn find_path(&self, from: DVec2, to: DVec2) -> Option<Vec<DVec2>>;
}

impl PathProvider for BattleMap {
    fn find_path(&self, from: DVec2, to: DVec2) -> Option<Vec<DVec2>> {
        let (Some((sx, sy)), Some((gx, gy))) = (self.world_to_cell(from), self.world_to_cell(to)) else {
            debug!("[PATHFINDING] Off-map request {:?} -> {:?}", from, to);
            return None;
        };
        if !self.is_walkable(gx, gy) {
            return None;
        }

        let start = Node { x: sx, y: sy };
        let goal = Node { x: gx, y: gy };
        if start == goal {
            return Some(vec![to]);
        }

        let cells = astar::find_cell_path(self, start, goal)?;
        let simplified = astar::simplify(&cells);

        // Interior turns become cell centres; the goal cell is replaced by the exact target
        let mut waypoints: Vec<DVec2> = simplified[1..simplified.len() - 1]
            .iter()
            .map(|n| self.cell_center(n.x, n.y))
            .collect();
        waypoints.push(to);
        Some(waypoints)
    }
}
