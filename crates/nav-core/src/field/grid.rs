//! Grid Geometry
//!
//! Cell addressing for the coarse navigation grid.

use serde::{Deserialize, Serialize};

use nav_events::Vec2;

/// Integer cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub cx: i32,
    pub cy: i32,
}

impl GridCell {
    pub const fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> GridCell {
        GridCell::new(self.cx + dx, self.cy + dy)
    }
}

/// 8-connected neighbour offsets in scan order: E, N, W, S, NE, NW, SW, SE.
///
/// Ties between equally good neighbours go to the first in this order.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
    (1, -1),
];

/// Grid dimensions in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    pub width: u32,
    pub height: u32,
}

impl GridBounds {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(&self, cell: GridCell) -> bool {
        cell.cx >= 0 && cell.cy >= 0 && (cell.cx as u32) < self.width && (cell.cy as u32) < self.height
    }

    /// Row-major index of an in-bounds cell.
    pub fn index(&self, cell: GridCell) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.cy as usize * self.width as usize + cell.cx as usize)
        } else {
            None
        }
    }

    pub fn cell_of(&self, index: usize) -> GridCell {
        let width = self.width as usize;
        GridCell::new((index % width) as i32, (index / width) as i32)
    }

    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (0..self.cell_count()).map(move |i| self.cell_of(i))
    }
}

/// Mapping between world positions and grid cells
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub bounds: GridBounds,
    pub cell_size: f32,
}

impl GridSpec {
    pub fn new(bounds: GridBounds, cell_size: f32) -> Self {
        Self { bounds, cell_size }
    }

    /// Cell containing a world position, if inside the grid.
    pub fn cell_at(&self, position: Vec2) -> Option<GridCell> {
        if !position.is_finite() || self.cell_size <= 0.0 {
            return None;
        }
        let cell = GridCell::new(
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        );
        self.bounds.contains(cell).then_some(cell)
    }

    /// World position of a cell's centre.
    pub fn cell_center(&self, cell: GridCell) -> Vec2 {
        Vec2::new(
            (cell.cx as f32 + 0.5) * self.cell_size,
            (cell.cy as f32 + 0.5) * self.cell_size,
        )
    }

    /// World extent of the grid.
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(
            self.bounds.width as f32 * self.cell_size,
            self.bounds.height as f32 * self.cell_size,
        )
    }
}
