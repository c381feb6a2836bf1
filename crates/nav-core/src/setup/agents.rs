//! Agent Spawning
//!
//! Spawns navigating agents around the settlement with their own gradient
//! stores, trust ledgers and an honesty level.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::Rng;

use nav_events::Vec2;

use crate::components::{AgentId, Honesty, NavAgentBundle, ObstacleSet, Settlement};
use crate::config::NavConfig;
use crate::orchestrator::NavAgent;
use crate::social::{SocialGradientStore, TrustLedger};

/// Agents start within this distance of the settlement centre
const SPAWN_RADIUS: f32 = 8.0;

/// Spawn `count` agents; a `simulation.dishonest_fraction` share of them lie.
pub fn spawn_agents(world: &mut World, config: &NavConfig, count: usize, rng: &mut SmallRng) -> Vec<Entity> {
    let home = world
        .get_resource::<Settlement>()
        .map_or(Vec2::ZERO, |settlement| settlement.center);
    let obstacles = world.get_resource::<ObstacleSet>().cloned().unwrap_or_default();

    let mut entities = Vec::with_capacity(count);
    for i in 0..count {
        let id = AgentId::numbered(i + 1);
        let offset = Vec2::from_angle_degrees(rng.gen_range(0.0..360.0)) * rng.gen_range(0.0..SPAWN_RADIUS);
        let position = obstacles.resolve(home + offset);

        let honesty = if rng.gen::<f32>() < config.simulation.dishonest_fraction {
            rng.gen_range(0.0..0.4)
        } else {
            rng.gen_range(0.6..=1.0)
        };

        let nav = NavAgent::new(config).with_wander_heading(rng.gen_range(0.0..360.0));

        let mut bundle = NavAgentBundle::new(
            id.clone(),
            position,
            SocialGradientStore::from_config(&config.social),
            TrustLedger::from_config(id.0, &config.trust),
        )
        .with_honesty(honesty);
        bundle.nav = nav;
        entities.push(world.spawn(bundle).id());
    }

    tracing::debug!("Spawned {} agents around ({:.1}, {:.1})", count, home.x, home.y);
    entities
}

/// Summary of spawned agents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnSummary {
    pub total_agents: usize,
    pub dishonest_agents: usize,
}

pub fn get_spawn_summary(world: &mut World) -> SpawnSummary {
    let mut query = world.query::<(&AgentId, &Honesty)>();
    let mut summary = SpawnSummary::default();
    for (_, honesty) in query.iter(world) {
        summary.total_agents += 1;
        if honesty.is_dishonest() {
            summary.dishonest_agents += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Position;
    use rand::SeedableRng;

    #[test]
    fn test_spawn_around_settlement() {
        let mut world = World::new();
        world.insert_resource(Settlement {
            center: Vec2::new(50.0, 50.0),
        });
        let mut config = NavConfig::default();
        config.simulation.dishonest_fraction = 0.5;
        let mut rng = SmallRng::seed_from_u64(12345);

        let entities = spawn_agents(&mut world, &config, 40, &mut rng);
        assert_eq!(entities.len(), 40);

        for entity in &entities {
            let position = world.get::<Position>(*entity).unwrap().0;
            assert!(position.distance(Vec2::new(50.0, 50.0)) <= SPAWN_RADIUS);
        }
        let first = world.get::<AgentId>(entities[0]).unwrap();
        assert_eq!(first.as_str(), "agent_0001");

        let summary = get_spawn_summary(&mut world);
        assert_eq!(summary.total_agents, 40);
        assert!(summary.dishonest_agents > 0 && summary.dishonest_agents < 40);
    }

    #[test]
    fn test_no_liars_by_default_fraction_zero() {
        let mut world = World::new();
        let mut config = NavConfig::default();
        config.simulation.dishonest_fraction = 0.0;
        spawn_agents(&mut world, &config, 10, &mut SmallRng::seed_from_u64(1));
        assert_eq!(get_spawn_summary(&mut world).dishonest_agents, 0);
    }
}
