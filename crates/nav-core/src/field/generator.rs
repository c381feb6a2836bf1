//! Flow Field Generator
//!
//! Multi-source flood fill over a uniform-cost 8-connected grid. With every
//! step costing 1 the Dijkstra frontier is a plain FIFO queue, so a field
//! costs O(W·H) to build no matter how many goals it has.

use std::collections::VecDeque;

use nav_events::Vec2;

use super::grid::{GridBounds, GridCell, GridSpec, NEIGHBOR_OFFSETS};
use super::{FieldKind, FlowField};
use crate::components::Obstacle;

/// Builds flow fields over a fixed grid with fixed blocked cells
#[derive(Debug, Clone)]
pub struct FlowFieldGenerator {
    spec: GridSpec,
    blocked: Vec<bool>,
}

impl FlowFieldGenerator {
    pub fn new(bounds: GridBounds, cell_size: f32) -> Self {
        Self {
            spec: GridSpec::new(bounds, cell_size),
            blocked: vec![false; bounds.cell_count()],
        }
    }

    /// Block every cell whose centre lies inside one of the obstacles.
    pub fn with_obstacles(mut self, obstacles: &[Obstacle]) -> Self {
        let spec = self.spec;
        for cell in spec.bounds.cells() {
            let center = spec.cell_center(cell);
            if obstacles.iter().any(|o| o.contains(center)) {
                self.block(cell);
            }
        }
        self
    }

    pub fn block(&mut self, cell: GridCell) {
        if let Some(i) = self.spec.bounds.index(cell) {
            self.blocked[i] = true;
        }
    }

    pub fn spec(&self) -> GridSpec {
        self.spec
    }

    /// In bounds and not blocked.
    pub fn is_passable(&self, cell: GridCell) -> bool {
        self.spec
            .bounds
            .index(cell)
            .map(|i| !self.blocked[i])
            .unwrap_or(false)
    }

    /// Whether one 8-connected step is allowed. Diagonals may not cut a blocked corner.
    fn can_step(&self, from: GridCell, dx: i32, dy: i32) -> bool {
        let to = from.offset(dx, dy);
        if !self.is_passable(to) {
            return false;
        }
        if dx != 0 && dy != 0 {
            return self.is_passable(from.offset(dx, 0)) && self.is_passable(from.offset(0, dy));
        }
        true
    }

    /// Build a complete field toward `goals`.
    ///
    /// Blocked or out-of-bounds goals are ignored; an empty goal set yields a
    /// field of zero vectors with every cost infinite.
    pub fn generate(&self, kind: FieldKind, goals: &[GridCell], tick: u64) -> FlowField {
        let bounds = self.spec.bounds;
        let mut costs = vec![f32::INFINITY; bounds.cell_count()];
        let mut frontier = VecDeque::new();

        for &goal in goals {
            if !self.is_passable(goal) {
                continue;
            }
            if let Some(i) = bounds.index(goal) {
                if costs[i] != 0.0 {
                    costs[i] = 0.0;
                    frontier.push_back(goal);
                }
            }
        }

        while let Some(cell) = frontier.pop_front() {
            let next_cost = costs[bounds.index(cell).unwrap_or_default()] + 1.0;
            for &(dx, dy) in NEIGHBOR_OFFSETS.iter() {
                if !self.can_step(cell, dx, dy) {
                    continue;
                }
                let neighbor = cell.offset(dx, dy);
                if let Some(j) = bounds.index(neighbor) {
                    if next_cost < costs[j] {
                        costs[j] = next_cost;
                        frontier.push_back(neighbor);
                    }
                }
            }
        }

        let vectors = bounds
            .cells()
            .map(|cell| self.direction_for(cell, &costs))
            .collect();

        FlowField::from_parts(kind, self.spec, costs, vectors, tick)
    }

    /// Direction toward the lowest strictly-cheaper neighbour, first found on ties.
    fn direction_for(&self, cell: GridCell, costs: &[f32]) -> Vec2 {
        let bounds = self.spec.bounds;
        let own = match bounds.index(cell) {
            Some(i) => costs[i],
            None => return Vec2::ZERO,
        };
        if !own.is_finite() || own == 0.0 {
            return Vec2::ZERO;
        }

        let mut best: Option<((i32, i32), f32)> = None;
        for &(dx, dy) in NEIGHBOR_OFFSETS.iter() {
            if !self.can_step(cell, dx, dy) {
                continue;
            }
            let Some(j) = bounds.index(cell.offset(dx, dy)) else {
                continue;
            };
            let cost = costs[j];
            if cost < own && best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some(((dx, dy), cost));
            }
        }

        match best {
            Some(((dx, dy), _)) => Vec2::new(dx as f32, dy as f32).normalize_or_zero(),
            None => Vec2::ZERO,
        }
    }
}
