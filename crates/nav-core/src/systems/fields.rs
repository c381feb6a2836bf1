//! Field Systems
//!
//! Keeps the shared flow field inputs current and runs the one
//! regeneration slot per tick.

use bevy_ecs::prelude::*;

use nav_events::Vec2;

use crate::components::{Position, Settlement, SimClock};
use crate::field::{ExplorationMap, FieldInputs, FieldKind, FlowFieldCache, ResourceSightings};
use crate::orchestrator::NavAgent;

/// System: mark the cells agents stand in as explored
///
/// Any newly explored cell invalidates the exploration field.
pub fn record_exploration(
    mut exploration: ResMut<ExplorationMap>,
    mut cache: ResMut<FlowFieldCache>,
    query: Query<&Position, With<NavAgent>>,
) {
    let newly_explored = query
        .iter()
        .filter(|position| exploration.mark(position.0).is_some())
        .count();

    if newly_explored > 0 {
        cache.invalidate(FieldKind::Exploration);
    }
}

/// System: rebuild due fields within the per-tick budget
///
/// This is the only place fields are written; every reader this tick sees
/// the generation swapped in here.
pub fn refresh_flow_fields(
    clock: Res<SimClock>,
    settlement: Res<Settlement>,
    exploration: Res<ExplorationMap>,
    sightings: Res<ResourceSightings>,
    mut cache: ResMut<FlowFieldCache>,
    query: Query<&Position, With<NavAgent>>,
) {
    let positions: Vec<Vec2> = query.iter().map(|p| p.0).collect();
    let inputs = FieldInputs {
        exploration: &exploration,
        sightings: &sightings,
        home: settlement.center,
        agent_positions: &positions,
    };
    cache.refresh(clock.tick, &inputs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{AgentId, NavAgentBundle};
    use crate::field::{FlowFieldGenerator, GridBounds, RegenerationPolicy};
    use crate::config::FieldConfig;
    use crate::social::{SocialGradientStore, TrustLedger};

    fn setup_world() -> World {
        let mut world = World::new();
        let generator = FlowFieldGenerator::new(GridBounds::new(8, 8), 4.0);
        let spec = generator.spec();

        world.insert_resource(SimClock::default());
        world.insert_resource(Settlement {
            center: Vec2::new(16.0, 16.0),
        });
        world.insert_resource(ExplorationMap::new(spec));
        world.insert_resource(ResourceSightings::new(spec));
        world.insert_resource(FlowFieldCache::new(
            generator,
            RegenerationPolicy::from(&FieldConfig::default()),
        ));

        for (i, position) in [Vec2::new(2.0, 2.0), Vec2::new(2.5, 2.5), Vec2::new(30.0, 30.0)]
            .into_iter()
            .enumerate()
        {
            world.spawn(NavAgentBundle::new(
                AgentId::numbered(i + 1),
                position,
                SocialGradientStore::default(),
                TrustLedger::new(AgentId::numbered(i + 1).0, 0.5, 8),
            ));
        }
        world
    }

    #[test]
    fn test_exploration_marks_occupied_cells() {
        let mut world = setup_world();
        let mut schedule = Schedule::default();
        schedule.add_systems(record_exploration);
        schedule.run(&mut world);

        // Two agents share a cell.
        assert_eq!(world.resource::<ExplorationMap>().explored_count(), 2);
        assert!(world.resource::<FlowFieldCache>().is_dirty(FieldKind::Exploration));
    }

    #[test]
    fn test_refresh_builds_fields_within_budget() {
        let mut world = setup_world();
        let mut schedule = Schedule::default();
        schedule.add_systems((record_exploration, refresh_flow_fields).chain());

        schedule.run(&mut world);
        {
            let cache = world.resource::<FlowFieldCache>();
            assert!(cache.get(FieldKind::Exploration).is_some());
            assert!(cache.get(FieldKind::Home).is_some());
            assert!(cache.get(FieldKind::Dispersion).is_none());
            assert!(!cache.is_dirty(FieldKind::Exploration));
        }

        schedule.run(&mut world);
        let cache = world.resource::<FlowFieldCache>();
        assert!(cache.get(FieldKind::Dispersion).is_some());
        assert_eq!(cache.snapshots().len(), 3);
    }

    #[test]
    fn test_resource_field_follows_sightings() {
        let mut world = setup_world();
        world
            .resource_mut::<ResourceSightings>()
            .record(nav_events::ResourceType::Stone, Vec2::new(20.0, 20.0));

        let mut schedule = Schedule::default();
        schedule.add_systems(refresh_flow_fields);
        for _ in 0..2 {
            schedule.run(&mut world);
        }

        let cache = world.resource::<FlowFieldCache>();
        let field = cache
            .get(FieldKind::Resource(nav_events::ResourceType::Stone))
            .unwrap();
        assert_eq!(field.reachable_cells(), 64);
    }
}
