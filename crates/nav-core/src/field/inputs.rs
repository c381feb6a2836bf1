//! Field Inputs
//!
//! Shared world knowledge that flow field goal sets are derived from.

use bevy_ecs::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use nav_events::{ResourceType, Vec2};

use super::grid::{GridCell, GridSpec};

/// Resource: which grid cells have been visited by any agent
#[derive(Resource, Debug, Clone)]
pub struct ExplorationMap {
    spec: GridSpec,
    explored: Vec<bool>,
    explored_count: usize,
}

impl ExplorationMap {
    pub fn new(spec: GridSpec) -> Self {
        Self {
            spec,
            explored: vec![false; spec.bounds.cell_count()],
            explored_count: 0,
        }
    }

    /// Mark the cell under `position`; returns the cell if it was newly explored.
    pub fn mark(&mut self, position: Vec2) -> Option<GridCell> {
        let cell = self.spec.cell_at(position)?;
        let i = self.spec.bounds.index(cell)?;
        if self.explored[i] {
            return None;
        }
        self.explored[i] = true;
        self.explored_count += 1;
        Some(cell)
    }

    pub fn is_explored(&self, cell: GridCell) -> bool {
        self.spec
            .bounds
            .index(cell)
            .map(|i| self.explored[i])
            .unwrap_or(false)
    }

    pub fn unexplored_cells(&self) -> Vec<GridCell> {
        self.spec
            .bounds
            .cells()
            .filter(|cell| !self.is_explored(*cell))
            .collect()
    }

    pub fn explored_count(&self) -> usize {
        self.explored_count
    }

    /// Fraction of the grid explored, 0.0 to 1.0.
    pub fn coverage(&self) -> f32 {
        let total = self.spec.bounds.cell_count();
        if total == 0 {
            0.0
        } else {
            self.explored_count as f32 / total as f32
        }
    }
}

/// Resource: aggregated resource sightings, one entry per distinct cell
#[derive(Resource, Debug, Clone)]
pub struct ResourceSightings {
    spec: GridSpec,
    cells: BTreeMap<ResourceType, BTreeSet<GridCell>>,
}

impl ResourceSightings {
    pub fn new(spec: GridSpec) -> Self {
        Self {
            spec,
            cells: BTreeMap::new(),
        }
    }

    /// Aggregate a sighting; returns true when it adds a new cell for the resource.
    pub fn record(&mut self, resource: ResourceType, position: Vec2) -> bool {
        match self.spec.cell_at(position) {
            Some(cell) => self.cells.entry(resource).or_default().insert(cell),
            None => false,
        }
    }

    /// Drop a sighting after it turned out to be empty; returns true if one was removed.
    pub fn forget(&mut self, resource: ResourceType, position: Vec2) -> bool {
        match (self.spec.cell_at(position), self.cells.get_mut(&resource)) {
            (Some(cell), Some(cells)) => cells.remove(&cell),
            _ => false,
        }
    }

    pub fn cells(&self, resource: ResourceType) -> Vec<GridCell> {
        self.cells
            .get(&resource)
            .map(|cells| cells.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Resources with at least one sighting.
    pub fn known_resources(&self) -> Vec<ResourceType> {
        self.cells
            .iter()
            .filter(|(_, cells)| !cells.is_empty())
            .map(|(resource, _)| *resource)
            .collect()
    }
}

/// Everything the cache needs to derive goal sets for one refresh
#[derive(Debug, Clone, Copy)]
pub struct FieldInputs<'a> {
    pub exploration: &'a ExplorationMap,
    pub sightings: &'a ResourceSightings,
    /// Current settlement centre
    pub home: Vec2,
    /// Live agent positions, for dispersion
    pub agent_positions: &'a [Vec2],
}
