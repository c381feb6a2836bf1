//! World Setup
//!
//! Lays out the demo world: the settlement, scattered obstacles and resource
//! deposits, and the shared resources the navigation systems run on.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::Rng;

use nav_events::{ResourceType, Vec2};

use crate::components::{Obstacle, ObstacleSet, ResourceDeposit, ResourceMap, Settlement, SimClock};
use crate::config::{NavConfig, NavSettings};
use crate::events::{EventLogger, PendingEvents};
use crate::field::{ExplorationMap, FlowFieldCache, FlowFieldGenerator, GridBounds, RegenerationPolicy, ResourceSightings};
use crate::orchestrator::NavigationOrchestrator;
use crate::telemetry::NavStats;

/// Obstacles and deposits keep at least this far from the settlement centre
const SETTLEMENT_CLEARANCE: f32 = 10.0;

/// Placement attempts per object before it is skipped
const MAX_PLACEMENT_ATTEMPTS: usize = 32;

/// Where everything is in a freshly generated world
#[derive(Debug, Clone, PartialEq)]
pub struct WorldLayout {
    pub size: Vec2,
    pub settlement: Settlement,
    pub obstacles: Vec<Obstacle>,
    pub deposits: Vec<ResourceDeposit>,
}

impl WorldLayout {
    pub fn is_blocked(&self, point: Vec2) -> bool {
        self.obstacles.iter().any(|o| o.contains(point))
    }
}

fn random_point(rng: &mut SmallRng, size: Vec2) -> Vec2 {
    Vec2::new(rng.gen_range(0.0..size.x.max(1.0)), rng.gen_range(0.0..size.y.max(1.0)))
}

/// Generate a world layout from the grid and simulation sections of `config`.
pub fn generate_layout(config: &NavConfig, rng: &mut SmallRng) -> WorldLayout {
    let size = Vec2::new(
        config.grid.width as f32 * config.grid.cell_size,
        config.grid.height as f32 * config.grid.cell_size,
    );
    let settlement = Settlement { center: size * 0.5 };
    let mut layout = WorldLayout {
        size,
        settlement,
        obstacles: Vec::new(),
        deposits: Vec::new(),
    };

    let max_radius = (config.grid.cell_size * 1.5).max(1.5);
    for _ in 0..config.simulation.obstacles {
        let radius = rng.gen_range(1.0..max_radius);
        let placed = (0..MAX_PLACEMENT_ATTEMPTS)
            .map(|_| random_point(rng, size))
            .find(|p| p.distance(settlement.center) > SETTLEMENT_CLEARANCE + radius);
        if let Some(center) = placed {
            layout.obstacles.push(Obstacle::new(center, radius));
        }
    }

    for resource in ResourceType::all() {
        for _ in 0..config.simulation.deposits_per_resource {
            let placed = (0..MAX_PLACEMENT_ATTEMPTS)
                .map(|_| random_point(rng, size))
                .find(|p| p.distance(settlement.center) > SETTLEMENT_CLEARANCE && !layout.is_blocked(*p));
            if let Some(position) = placed {
                layout.deposits.push(ResourceDeposit {
                    resource: *resource,
                    position,
                    amount: rng.gen_range(5..=20),
                });
            }
        }
    }

    layout
}

/// Insert every shared resource the navigation schedule needs.
///
/// The event logger starts as a null logger; callers that want a JSONL log
/// replace it.
pub fn insert_world_resources(world: &mut World, config: &NavConfig, layout: WorldLayout) {
    let generator = FlowFieldGenerator::new(
        GridBounds::new(config.grid.width, config.grid.height),
        config.grid.cell_size,
    )
    .with_obstacles(&layout.obstacles);
    let spec = generator.spec();

    world.insert_resource(SimClock::default());
    world.insert_resource(NavSettings(config.clone()));
    world.insert_resource(NavigationOrchestrator::new(config));
    world.insert_resource(layout.settlement);
    world.insert_resource(ObstacleSet::new(layout.obstacles));
    world.insert_resource(ResourceMap::new(layout.deposits));
    world.insert_resource(FlowFieldCache::new(generator, RegenerationPolicy::from(&config.fields)));
    world.insert_resource(ExplorationMap::new(spec));
    world.insert_resource(ResourceSightings::new(spec));
    world.insert_resource(PendingEvents::new());
    world.insert_resource(EventLogger::null());
    world.insert_resource(NavStats::new());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_layout_respects_clearance() {
        let config = NavConfig::default();
        let mut rng = SmallRng::seed_from_u64(42);
        let layout = generate_layout(&config, &mut rng);

        assert_eq!(layout.settlement.center, Vec2::new(96.0, 96.0));
        assert!(!layout.obstacles.is_empty());
        assert!(layout
            .obstacles
            .iter()
            .all(|o| o.center.distance(layout.settlement.center) > SETTLEMENT_CLEARANCE));
        for deposit in &layout.deposits {
            assert!(!layout.is_blocked(deposit.position));
            assert!(deposit.position.x < layout.size.x && deposit.position.y < layout.size.y);
            assert!(deposit.amount >= 5);
        }
    }

    #[test]
    fn test_layout_is_seeded() {
        let config = NavConfig::default();
        let a = generate_layout(&config, &mut SmallRng::seed_from_u64(7));
        let b = generate_layout(&config, &mut SmallRng::seed_from_u64(7));
        assert_eq!(a, b);
    }
}
