use bevy::math::DVec2;
use bevy::prelude::*;
use fixedbitset::FixedBitSet;

use crate::game::geometry::{segment_intersection, Segment};

/// Default margin kept between movers and walls, in grid units.
pub const DEFAULT_CLIP_DISTANCE: f64 = 0.1;

/// Static battlefield geometry: a grid of walkable / blocked cells plus the
/// collision segments derived from it.
///
/// One grid cell is one world unit. Cell `(x, y)` covers
/// `[x, x + 1) × [y, y + 1)` and its centre is `(x + 0.5, y + 0.5)`.
///
/// # Collision segments
///
/// Only edges between a blocked cell and a walkable (or off-map) cell become
/// segments, and each is pushed `clip_distance` outward so movers stop short
/// of the wall face. Free-standing segments added with [`BattleMap::add_wall`]
/// are kept as-is. Call [`BattleMap::rebuild_walls`] after editing cells.
///
/// ```rust
/// use bevy::math::DVec2;
/// use strider::game::map::BattleMap;
///
/// let mut map = BattleMap::new(20, 20);
/// map.block_cell(10, 5);
/// map.rebuild_walls();
///
/// assert!(!map.is_walkable(10, 5));
/// assert!(map.segment_blocked(DVec2::new(5.0, 5.5), DVec2::new(15.0, 5.5)));
/// ```
#[derive(Resource, Clone, Debug)]
pub struct BattleMap {
    width: usize,
    height: usize,
    clip_distance: f64,
    blocked: FixedBitSet,
    cell_walls: Vec<Segment>,
    free_walls: Vec<Segment>,
}

impl Default for BattleMap {
    fn default() -> Self {
        Self::new(64, 64)
    }
}

impl BattleMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            clip_distance: DEFAULT_CLIP_DISTANCE,
            blocked: FixedBitSet::with_capacity(width * height),
            cell_walls: Vec::new(),
            free_walls: Vec::new(),
        }
    }

    /// Builds a map from rows of characters, `#` marking a blocked cell.
    /// The first row is `y = 0`.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut map = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                if c == '#' {
                    map.block_cell(x, y);
                }
            }
        }
        map.rebuild_walls();
        map
    }

    /// Changes the wall margin and regenerates the cell walls with it.
    pub fn set_clip_distance(&mut self, clip_distance: f64) {
        self.clip_distance = clip_distance;
        self.rebuild_walls();
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clip_distance(&self) -> f64 {
        self.clip_distance
    }

    /// Map extent in world units.
    pub fn size(&self) -> DVec2 {
        DVec2::new(self.width as f64, self.height as f64)
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn block_cell(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.blocked.insert(idx);
        }
    }

    /// Off-map cells are never walkable.
    pub fn is_walkable(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && !self.blocked.contains(self.index(x, y))
    }

    pub fn world_to_cell(&self, pos: DVec2) -> Option<(usize, usize)> {
        if pos.x < 0.0 || pos.y < 0.0 {
            return None;
        }
        let (x, y) = (pos.x as usize, pos.y as usize);
        (x < self.width && y < self.height).then_some((x, y))
    }

    pub fn cell_center(&self, x: usize, y: usize) -> DVec2 {
        DVec2::new(x as f64 + 0.5, y as f64 + 0.5)
    }

    pub fn is_walkable_at(&self, pos: DVec2) -> bool {
        self.world_to_cell(pos)
            .is_some_and(|(x, y)| self.is_walkable(x, y))
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.count_ones(..)
    }

    /// Adds a free-standing wall segment.
    pub fn add_wall(&mut self, wall: Segment) {
        self.free_walls.push(wall);
    }

    /// All collision segments: cell boundaries first, then free walls.
    pub fn walls(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.cell_walls.iter().chain(self.free_walls.iter())
    }

    pub fn wall_count(&self) -> usize {
        self.cell_walls.len() + self.free_walls.len()
    }

    /// Regenerates the boundary segments of blocked cells.
    pub fn rebuild_walls(&mut self) {
        let clip = self.clip_distance;
        let mut walls = Vec::new();

        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_walkable(x, y) {
                    continue;
                }

                let (x0, y0) = (x as f64 - clip, y as f64 - clip);
                let (x1, y1) = (x as f64 + 1.0 + clip, y as f64 + 1.0 + clip);

                // An edge is only a wall when the neighbour across it can be stood in
                if x == 0 || self.is_walkable(x - 1, y) {
                    walls.push(Segment::new(DVec2::new(x0, y0), DVec2::new(x0, y1)));
                }
                if self.is_walkable(x + 1, y) || x + 1 >= self.width {
                    walls.push(Segment::new(DVec2::new(x1, y0), DVec2::new(x1, y1)));
                }
                if y == 0 || self.is_walkable(x, y - 1) {
                    walls.push(Segment::new(DVec2::new(x0, y0), DVec2::new(x1, y0)));
                }
                if self.is_walkable(x, y + 1) || y + 1 >= self.height {
                    walls.push(Segment::new(DVec2::new(x0, y1), DVec2::new(x1, y1)));
                }
            }
        }

        debug!("[MAP] Rebuilt {} wall segments for {}x{} map ({} blocked cells)",
               walls.len(), self.width, self.height, self.blocked_count());
        self.cell_walls = walls;
    }

    /// True if any wall segment crosses the segment from `a` to `b`.
    pub fn segment_blocked(&self, a: DVec2, b: DVec2) -> bool {
        let sight = Segment::new(a, b);
        self.walls().any(|wall| segment_intersection(&sight, wall).is_some())
    }
}
