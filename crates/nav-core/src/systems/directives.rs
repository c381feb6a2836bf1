//! Directive System
//!
//! Scripted stand-in for the decision layer: idle agents are handed a new
//! goal now and then, so the demo world keeps moving.

use bevy_ecs::prelude::*;
use rand::Rng;

use nav_events::{ResourceType, Vec2};

use crate::components::{AgentId, Velocity};
use crate::config::NavSettings;
use crate::field::FlowFieldCache;
use crate::orchestrator::{AgentNavMut, NavAgent, NavGoal, NavigationOrchestrator};
use crate::social::{SocialGradientStore, TrustLedger};
use crate::SimRng;

/// Roll a goal: mostly resource searches, sometimes exploring, going home
/// or walking to a random point inside `world_size`.
pub fn pick_directive<R: Rng>(rng: &mut R, world_size: Vec2) -> NavGoal {
    let roll: f32 = rng.gen();
    if roll < 0.5 {
        let resources = ResourceType::all();
        NavGoal::SearchFor(resources[rng.gen_range(0..resources.len())])
    } else if roll < 0.75 {
        NavGoal::Explore
    } else if roll < 0.9 {
        NavGoal::ReturnHome
    } else {
        NavGoal::Target(Vec2::new(
            rng.gen_range(0.0..world_size.x.max(1.0)),
            rng.gen_range(0.0..world_size.y.max(1.0)),
        ))
    }
}

/// System: give idle agents a goal, on average every `idle_patience` ticks
pub fn assign_directives(
    settings: Res<NavSettings>,
    orchestrator: Res<NavigationOrchestrator>,
    cache: Res<FlowFieldCache>,
    mut rng: ResMut<SimRng>,
    mut query: Query<(
        &AgentId,
        &mut Velocity,
        &mut NavAgent,
        &mut SocialGradientStore,
        &mut TrustLedger,
    )>,
) {
    let chance = 1.0 / settings.0.simulation.idle_patience.max(1) as f64;
    let world_size = cache.generator().spec().world_size();

    for (id, mut velocity, mut nav, mut gradients, mut trust) in query.iter_mut() {
        if !nav.is_idle() || !rng.0.gen_bool(chance) {
            continue;
        }
        let goal = pick_directive(&mut rng.0, world_size);
        orchestrator.set_goal(
            AgentNavMut {
                id: id.as_str(),
                nav: &mut *nav,
                gradients: &mut *gradients,
                trust: &mut *trust,
            },
            goal,
        );
        velocity.0 = Vec2::ZERO;
    }
}
