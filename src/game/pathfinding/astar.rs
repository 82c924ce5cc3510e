use bevy::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use crate::game::map::BattleMap;

/// Safety limit on expanded nodes.
const MAX_ITERATIONS: usize = 20_000;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct Node {
    pub x: usize,
    pub y: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct State {
    cost: u32,
    node: Node,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.cmp(&self.cost)
            .then_with(|| self.node.x.cmp(&other.node.x))
            .then_with(|| self.node.y.cmp(&other.node.y))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn heuristic(a: Node, b: Node) -> u32 {
    (a.x.abs_diff(b.x) + a.y.abs_diff(b.y)) as u32
}

fn reconstruct_path(came_from: &BTreeMap<Node, Node>, mut current: Node) -> Vec<Node> {
    let mut path = vec![current];
    while let Some(prev) = came_from.get(&current) {
        current = *prev;
        path.push(current);
    }
    path.reverse();
    path
}

/// 4-neighbour A* over walkable cells. The start cell itself may be blocked
/// (a unit pressed against a wall), every other cell on the path may not.
pub(super) fn find_cell_path(map: &BattleMap, start: Node, goal: Node) -> Option<Vec<Node>> {
    let mut iterations = 0;

    let mut open_set = BinaryHeap::new();
    open_set.push(State { cost: heuristic(start, goal), node: start });

    let mut came_from: BTreeMap<Node, Node> = BTreeMap::new();
    let mut g_score: BTreeMap<Node, u32> = BTreeMap::new();
    g_score.insert(start, 0);

    while let Some(State { cost: _, node: current }) = open_set.pop() {
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            error!("[PATHFINDING] A* exceeded max iterations ({}) - Start: {:?}, Goal: {:?}",
                   MAX_ITERATIONS, start, goal);
            return None;
        }

        if current == goal {
            return Some(reconstruct_path(&came_from, current));
        }

        let current_g = g_score.get(&current).copied().unwrap_or(u32::MAX);
        let neighbors = [
            (current.x.wrapping_sub(1), current.y),
            (current.x + 1, current.y),
            (current.x, current.y.wrapping_sub(1)),
            (current.x, current.y + 1),
        ];

        for (nx, ny) in neighbors {
            // Off-map (including wrapped) cells report unwalkable
            if !map.is_walkable(nx, ny) {
                continue;
            }

            let neighbor = Node { x: nx, y: ny };
            let tentative = current_g.saturating_add(1);
            if tentative < g_score.get(&neighbor).copied().unwrap_or(u32::MAX) {
                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative);
                open_set.push(State { cost: tentative + heuristic(neighbor, goal), node: neighbor });
            }
        }
    }
    None
}

/// Drop interior nodes that continue in the same direction as the step
/// before them.
pub(super) fn simplify(path: &[Node]) -> Vec<Node> {
    if path.len() < 3 {
        return path.to_vec();
    }

    let step = |a: Node, b: Node| (b.x as isize - a.x as isize, b.y as isize - a.y as isize);
    let mut simplified = vec![path[0]];
    for window in path.windows(3) {
        if step(window[0], window[1]) != step(window[1], window[2]) {
            simplified.push(window[1]);
        }
    }
    simplified.push(path[path.len() - 1]);
    simplified
}
