//! Flow Fields
//!
//! Shared vector fields over the coarse grid. Each field points every
//! reachable cell along a locally shortest path toward its goal set; agents
//! never hold a field, they only sample it by position through the cache.

pub mod cache;
pub mod generator;
pub mod grid;
pub mod inputs;

pub use cache::{FlowFieldCache, RegenerationPolicy};
pub use generator::FlowFieldGenerator;
pub use grid::{GridBounds, GridCell, GridSpec, NEIGHBOR_OFFSETS};
pub use inputs::{ExplorationMap, FieldInputs, ResourceSightings};

use nav_events::{FieldSnapshot, ResourceType, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a field leads toward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Unexplored cells
    Exploration,
    /// The settlement centre
    Home,
    /// Uncrowded cells
    Dispersion,
    /// Aggregated sightings of one resource
    Resource(ResourceType),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Exploration => f.write_str("exploration"),
            FieldKind::Home => f.write_str("home"),
            FieldKind::Dispersion => f.write_str("dispersion"),
            FieldKind::Resource(r) => write!(f, "resource:{}", r),
        }
    }
}

/// A complete, immutable flow field generation
#[derive(Debug, Clone, PartialEq)]
pub struct FlowField {
    kind: FieldKind,
    spec: GridSpec,
    /// Distance to the nearest goal in steps, `f32::INFINITY` when unreachable
    costs: Vec<f32>,
    /// Unit direction per cell, zero on goals and unreachable cells
    vectors: Vec<Vec2>,
    last_updated_tick: u64,
    generation: u64,
}

impl FlowField {
    pub(crate) fn from_parts(
        kind: FieldKind,
        spec: GridSpec,
        costs: Vec<f32>,
        vectors: Vec<Vec2>,
        last_updated_tick: u64,
    ) -> Self {
        debug_assert_eq!(costs.len(), spec.bounds.cell_count());
        debug_assert_eq!(vectors.len(), spec.bounds.cell_count());
        Self {
            kind,
            spec,
            costs,
            vectors,
            last_updated_tick,
            generation: 0,
        }
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn spec(&self) -> GridSpec {
        self.spec
    }

    pub fn bounds(&self) -> GridBounds {
        self.spec.bounds
    }

    pub fn cell_size(&self) -> f32 {
        self.spec.cell_size
    }

    pub fn last_updated_tick(&self) -> u64 {
        self.last_updated_tick
    }

    /// Monotonic build counter assigned by the cache.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cost(&self, cell: GridCell) -> f32 {
        self.spec
            .bounds
            .index(cell)
            .map(|i| self.costs[i])
            .unwrap_or(f32::INFINITY)
    }

    pub fn vector(&self, cell: GridCell) -> Vec2 {
        self.spec
            .bounds
            .index(cell)
            .map(|i| self.vectors[i])
            .unwrap_or(Vec2::ZERO)
    }

    pub fn is_reachable(&self, cell: GridCell) -> bool {
        self.cost(cell).is_finite()
    }

    /// Whether the cell under a world position has a finite cost.
    pub fn is_reachable_at(&self, position: Vec2) -> bool {
        self.spec
            .cell_at(position)
            .map(|cell| self.is_reachable(cell))
            .unwrap_or(false)
    }

    /// The cell an agent at `position` steers from: its own cell when that
    /// is reachable, else the reachable neighbour whose centre is closest.
    ///
    /// Obstacles block whole cells by their centres, so an agent can stand
    /// on the free rim of a blocked cell.
    pub fn nearest_reachable(&self, position: Vec2) -> Option<GridCell> {
        let cell = self.spec.cell_at(position)?;
        if self.is_reachable(cell) {
            return Some(cell);
        }
        NEIGHBOR_OFFSETS
            .iter()
            .map(|&(dx, dy)| cell.offset(dx, dy))
            .filter(|n| self.is_reachable(*n))
            .min_by(|a, b| {
                let da = self.spec.cell_center(*a).distance(position);
                let db = self.spec.cell_center(*b).distance(position);
                da.total_cmp(&db)
            })
    }

    /// Steering direction under a world position; zero when out of bounds.
    ///
    /// On a blocked cell this points into the nearest reachable neighbour.
    pub fn sample(&self, position: Vec2) -> Vec2 {
        match self.nearest_reachable(position) {
            Some(cell) if self.spec.cell_at(position) == Some(cell) => self.vector(cell),
            Some(cell) => (self.spec.cell_center(cell) - position).normalize_or_zero(),
            None => Vec2::ZERO,
        }
    }

    pub fn reachable_cells(&self) -> usize {
        self.costs.iter().filter(|c| c.is_finite()).count()
    }

    pub fn costs(&self) -> &[f32] {
        &self.costs
    }

    pub fn vectors(&self) -> &[Vec2] {
        &self.vectors
    }

    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            kind: self.kind.to_string(),
            generation: self.generation,
            last_updated_tick: self.last_updated_tick,
            reachable_cells: self.reachable_cells(),
        }
    }
}
