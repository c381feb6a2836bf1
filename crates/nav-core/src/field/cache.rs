//! Flow Field Cache
//!
//! Owns at most one field per kind and decides when each must be rebuilt.
//! A rebuild produces a brand-new `FlowField` and only then swaps the shared
//! handle, so a reader sees either the previous or the next complete
//! generation and never a partially written one.

use bevy_ecs::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use nav_events::{FieldSnapshot, Vec2};

use super::generator::FlowFieldGenerator;
use super::grid::GridCell;
use super::inputs::FieldInputs;
use super::{FieldKind, FlowField};
use crate::config::FieldConfig;

/// When each field kind is due for regeneration
#[derive(Debug, Clone, PartialEq)]
pub struct RegenerationPolicy {
    pub home_move_threshold: f32,
    pub dispersion_interval: u64,
    pub max_regenerations_per_tick: usize,
    pub crowd_threshold: u32,
}

impl From<&FieldConfig> for RegenerationPolicy {
    fn from(config: &FieldConfig) -> Self {
        Self {
            home_move_threshold: config.home_move_threshold,
            dispersion_interval: config.dispersion_interval.max(1),
            max_regenerations_per_tick: config.max_regenerations_per_tick.max(1),
            crowd_threshold: config.crowd_threshold,
        }
    }
}

/// Resource: the shared flow fields
#[derive(Resource, Debug)]
pub struct FlowFieldCache {
    generator: FlowFieldGenerator,
    policy: RegenerationPolicy,
    fields: BTreeMap<FieldKind, Arc<FlowField>>,
    /// Kinds the cache keeps built
    tracked: BTreeSet<FieldKind>,
    /// Kinds invalidated by an event since their last build
    dirty: BTreeSet<FieldKind>,
    /// Settlement centre the current home field was built for
    home_anchor: Option<Vec2>,
    generations: u64,
}

impl FlowFieldCache {
    pub fn new(generator: FlowFieldGenerator, policy: RegenerationPolicy) -> Self {
        let tracked = [FieldKind::Exploration, FieldKind::Home, FieldKind::Dispersion]
            .into_iter()
            .collect();
        Self {
            generator,
            policy,
            fields: BTreeMap::new(),
            tracked,
            dirty: BTreeSet::new(),
            home_anchor: None,
            generations: 0,
        }
    }

    pub fn generator(&self) -> &FlowFieldGenerator {
        &self.generator
    }

    /// Keep a field of this kind built from now on.
    pub fn track(&mut self, kind: FieldKind) {
        self.tracked.insert(kind);
    }

    /// Event-driven invalidation (new sector explored, new sighting aggregated).
    pub fn invalidate(&mut self, kind: FieldKind) {
        self.tracked.insert(kind);
        self.dirty.insert(kind);
    }

    pub fn is_dirty(&self, kind: FieldKind) -> bool {
        self.dirty.contains(&kind)
    }

    /// Whether `kind` needs a rebuild at `tick` under its policy.
    pub fn is_due(&self, kind: FieldKind, tick: u64, inputs: &FieldInputs<'_>) -> bool {
        let Some(field) = self.fields.get(&kind) else {
            return true;
        };
        if self.dirty.contains(&kind) {
            return true;
        }
        match kind {
            FieldKind::Exploration | FieldKind::Resource(_) => false,
            FieldKind::Home => self
                .home_anchor
                .map_or(true, |anchor| anchor.distance(inputs.home) > self.policy.home_move_threshold),
            FieldKind::Dispersion => {
                tick.saturating_sub(field.last_updated_tick()) >= self.policy.dispersion_interval
            }
        }
    }

    /// Tracked kinds due for a rebuild, in a stable order.
    pub fn due_kinds(&self, tick: u64, inputs: &FieldInputs<'_>) -> Vec<FieldKind> {
        self.tracked
            .iter()
            .copied()
            .filter(|kind| self.is_due(*kind, tick, inputs))
            .collect()
    }

    /// The regeneration slot: rebuild due fields up to the per-tick budget.
    ///
    /// Kinds left over stay due and are picked up by the next slot.
    pub fn refresh(&mut self, tick: u64, inputs: &FieldInputs<'_>) -> Vec<FieldKind> {
        for resource in inputs.sightings.known_resources() {
            self.track(FieldKind::Resource(resource));
        }

        let mut due = self.due_kinds(tick, inputs);
        // Missing fields first so every tracked kind exists as soon as possible.
        due.sort_by_key(|kind| self.fields.contains_key(kind));
        due.truncate(self.policy.max_regenerations_per_tick);

        for kind in &due {
            self.regenerate(*kind, tick, inputs);
        }
        if !due.is_empty() {
            tracing::debug!("Regenerated {} flow field(s) at tick {}: {:?}", due.len(), tick, due);
        }
        due
    }

    /// Build a fresh field for `kind` and swap it in.
    pub fn regenerate(&mut self, kind: FieldKind, tick: u64, inputs: &FieldInputs<'_>) -> Arc<FlowField> {
        let goals = self.goals_for(kind, inputs);
        self.generations += 1;
        let field = Arc::new(
            self.generator
                .generate(kind, &goals, tick)
                .with_generation(self.generations),
        );

        self.fields.insert(kind, Arc::clone(&field));
        self.tracked.insert(kind);
        self.dirty.remove(&kind);
        if kind == FieldKind::Home {
            self.home_anchor = Some(inputs.home);
        }

        tracing::trace!(
            "Field {} generation {} has {} goal cells",
            kind,
            field.generation(),
            goals.len()
        );
        field
    }

    /// Goal cells for a kind, derived from the current inputs.
    pub fn goals_for(&self, kind: FieldKind, inputs: &FieldInputs<'_>) -> Vec<GridCell> {
        let spec = self.generator.spec();
        match kind {
            FieldKind::Exploration => inputs
                .exploration
                .unexplored_cells()
                .into_iter()
                .filter(|cell| self.generator.is_passable(*cell))
                .collect(),
            FieldKind::Home => spec.cell_at(inputs.home).into_iter().collect(),
            FieldKind::Dispersion => self.uncrowded_cells(inputs.agent_positions),
            FieldKind::Resource(resource) => inputs.sightings.cells(resource),
        }
    }

    /// Passable cells whose 3x3 neighbourhood holds few enough agents.
    fn uncrowded_cells(&self, positions: &[Vec2]) -> Vec<GridCell> {
        let spec = self.generator.spec();
        let bounds = spec.bounds;
        let mut counts = vec![0u32; bounds.cell_count()];
        for position in positions {
            if let Some(i) = spec.cell_at(*position).and_then(|cell| bounds.index(cell)) {
                counts[i] += 1;
            }
        }

        bounds
            .cells()
            .filter(|cell| self.generator.is_passable(*cell))
            .filter(|cell| {
                let mut crowd = 0;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if let Some(i) = bounds.index(cell.offset(dx, dy)) {
                            crowd += counts[i];
                        }
                    }
                }
                crowd <= self.policy.crowd_threshold
            })
            .collect()
    }

    /// O(1) sample; zero when the kind has no field or the position is outside the grid.
    pub fn sample(&self, kind: FieldKind, position: Vec2) -> Vec2 {
        self.fields
            .get(&kind)
            .map(|field| field.sample(position))
            .unwrap_or(Vec2::ZERO)
    }

    /// Shared handle to the current complete generation of a field.
    pub fn handle(&self, kind: FieldKind) -> Option<Arc<FlowField>> {
        self.fields.get(&kind).cloned()
    }

    pub fn get(&self, kind: FieldKind) -> Option<&FlowField> {
        self.fields.get(&kind).map(|field| field.as_ref())
    }

    pub fn snapshots(&self) -> Vec<FieldSnapshot> {
        self.fields.values().map(|field| field.snapshot()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::grid::{GridBounds, GridSpec};
    use crate::field::inputs::{ExplorationMap, ResourceSightings};
    use nav_events::ResourceType;

    struct Inputs {
        exploration: ExplorationMap,
        sightings: ResourceSightings,
        home: Vec2,
        agents: Vec<Vec2>,
    }

    impl Inputs {
        fn new(spec: GridSpec) -> Self {
            Self {
                exploration: ExplorationMap::new(spec),
                sightings: ResourceSightings::new(spec),
                home: Vec2::new(1.0, 1.0),
                agents: Vec::new(),
            }
        }

        fn view(&self) -> FieldInputs<'_> {
            FieldInputs {
                exploration: &self.exploration,
                sightings: &self.sightings,
                home: self.home,
                agent_positions: &self.agents,
            }
        }
    }

    fn cache(policy: RegenerationPolicy) -> (FlowFieldCache, Inputs) {
        let bounds = GridBounds::new(6, 6);
        let generator = FlowFieldGenerator::new(bounds, 2.0);
        let spec = generator.spec();
        (FlowFieldCache::new(generator, policy), Inputs::new(spec))
    }

    fn policy() -> RegenerationPolicy {
        RegenerationPolicy {
            home_move_threshold: 3.0,
            dispersion_interval: 5,
            max_regenerations_per_tick: 8,
            crowd_threshold: 1,
        }
    }

    #[test]
    fn test_first_refresh_builds_tracked_kinds() {
        let (mut cache, inputs) = cache(policy());
        let built = cache.refresh(0, &inputs.view());
        assert_eq!(built.len(), 3);
        assert!(cache.get(FieldKind::Exploration).is_some());
        assert!(cache.get(FieldKind::Home).is_some());
        assert!(cache.get(FieldKind::Dispersion).is_some());
        assert!(cache.refresh(1, &inputs.view()).is_empty());
    }

    #[test]
    fn test_exploration_waits_for_invalidation() {
        let (mut cache, mut inputs) = cache(policy());
        cache.refresh(0, &inputs.view());

        inputs.exploration.mark(Vec2::new(5.0, 5.0));
        assert!(!cache.is_due(FieldKind::Exploration, 50, &inputs.view()));

        cache.invalidate(FieldKind::Exploration);
        assert!(cache.is_due(FieldKind::Exploration, 50, &inputs.view()));
        let built = cache.refresh(50, &inputs.view());
        assert!(built.contains(&FieldKind::Exploration));
        assert!(!cache.is_dirty(FieldKind::Exploration));
    }

    #[test]
    fn test_home_follows_threshold() {
        let (mut cache, mut inputs) = cache(policy());
        cache.refresh(0, &inputs.view());

        inputs.home = Vec2::new(3.0, 1.0);
        assert!(!cache.is_due(FieldKind::Home, 1, &inputs.view()));

        inputs.home = Vec2::new(9.0, 9.0);
        assert!(cache.is_due(FieldKind::Home, 1, &inputs.view()));
    }

    #[test]
    fn test_dispersion_on_cadence() {
        let (mut cache, inputs) = cache(policy());
        cache.refresh(0, &inputs.view());
        assert!(!cache.is_due(FieldKind::Dispersion, 4, &inputs.view()));
        assert!(cache.is_due(FieldKind::Dispersion, 5, &inputs.view()));
        assert_eq!(cache.refresh(5, &inputs.view()), vec![FieldKind::Dispersion]);
    }

    #[test]
    fn test_budget_defers_remaining_kinds() {
        let (mut cache, inputs) = cache(RegenerationPolicy {
            max_regenerations_per_tick: 1,
            ..policy()
        });
        assert_eq!(cache.refresh(0, &inputs.view()).len(), 1);
        assert_eq!(cache.refresh(0, &inputs.view()).len(), 1);
        assert_eq!(cache.refresh(0, &inputs.view()).len(), 1);
        assert!(cache.refresh(0, &inputs.view()).is_empty());
    }

    #[test]
    fn test_sighting_tracks_resource_field() {
        let (mut cache, mut inputs) = cache(policy());
        inputs.sightings.record(ResourceType::Wood, Vec2::new(9.0, 9.0));
        cache.refresh(0, &inputs.view());

        let field = cache.get(FieldKind::Resource(ResourceType::Wood)).unwrap();
        assert_eq!(field.cost(GridCell::new(4, 4)), 0.0);
        let toward = cache.sample(FieldKind::Resource(ResourceType::Wood), Vec2::new(1.0, 1.0));
        assert!(toward.x > 0.0 && toward.y > 0.0);
        assert_eq!(cache.sample(FieldKind::Resource(ResourceType::Stone), Vec2::new(1.0, 1.0)), Vec2::ZERO);
    }

    #[test]
    fn test_dispersion_pushes_out_of_crowds() {
        let (mut cache, mut inputs) = cache(policy());
        inputs.agents = vec![Vec2::new(5.0, 5.0), Vec2::new(5.5, 5.5), Vec2::new(6.5, 5.0)];
        cache.refresh(0, &inputs.view());

        let goals = cache.goals_for(FieldKind::Dispersion, &inputs.view());
        assert!(!goals.contains(&GridCell::new(2, 2)));
        assert!(goals.contains(&GridCell::new(5, 5)));
        assert!(!cache.sample(FieldKind::Dispersion, Vec2::new(5.0, 5.0)).is_zero());
    }

    #[test]
    fn test_swap_keeps_old_handle_whole() {
        let (mut cache, mut inputs) = cache(policy());
        cache.refresh(0, &inputs.view());
        let old = cache.handle(FieldKind::Home).unwrap();
        let old_vectors = old.vectors().to_vec();

        inputs.home = Vec2::new(11.0, 11.0);
        let new = cache.regenerate(FieldKind::Home, 1, &inputs.view());

        assert_eq!(old.vectors(), old_vectors.as_slice());
        assert!(new.generation() > old.generation());
        assert_ne!(new.vectors(), old.vectors());
        let point = Vec2::new(7.0, 7.0);
        assert_eq!(cache.sample(FieldKind::Home, point), new.sample(point));
    }
}
