//! World Setup
//!
//! World layout, shared resources and agent spawning for a seeded run.

pub mod agents;
pub mod world;

pub use agents::*;
pub use world::*;

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::NavConfig;
use crate::SimRng;

/// Build a complete, seeded world ready for the navigation schedule.
///
/// `agents` overrides `simulation.agents` when given.
pub fn create_world(config: &NavConfig, seed: u64, agents: Option<usize>) -> World {
    let mut world = World::new();
    let mut rng = SmallRng::seed_from_u64(seed);

    let layout = generate_layout(config, &mut rng);
    insert_world_resources(&mut world, config, layout);
    spawn_agents(&mut world, config, agents.unwrap_or(config.simulation.agents), &mut rng);

    world.insert_resource(SimRng(rng));
    world
}
