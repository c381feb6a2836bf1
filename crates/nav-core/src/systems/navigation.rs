//! Navigation Systems
//!
//! Runs the orchestrator for every agent, folds what the agents perceived
//! back into the shared field inputs, and integrates velocities.

use bevy_ecs::prelude::*;
use std::collections::BTreeSet;

use nav_events::Vec2;

use crate::components::{AgentId, ObstacleSet, Position, ResourceMap, Settlement, SimClock, Velocity};
use crate::config::NavSettings;
use crate::events::PendingEvents;
use crate::field::{FieldKind, FlowFieldCache, ResourceSightings};
use crate::orchestrator::{AgentNavMut, NavAgent, NavContext, NavGoal, NavNotice, NavigationOrchestrator};
use crate::social::{SocialGradientStore, TrustLedger};
use crate::telemetry::NavStats;
use crate::SimRng;

/// Agents are kept this far inside the world edge
const EDGE_MARGIN: f32 = 0.01;

/// System: one orchestrator tick per agent
///
/// Fields are only read here. Sightings that change a resource field's goal
/// set invalidate it once all agents are done, and searches that ended at a
/// deposit take one unit from it.
#[allow(clippy::too_many_arguments)]
pub fn navigate_agents(
    clock: Res<SimClock>,
    settings: Res<NavSettings>,
    orchestrator: Res<NavigationOrchestrator>,
    settlement: Res<Settlement>,
    obstacles: Res<ObstacleSet>,
    mut deposits: ResMut<ResourceMap>,
    mut cache: ResMut<FlowFieldCache>,
    mut sightings: ResMut<ResourceSightings>,
    mut pending: ResMut<PendingEvents>,
    mut stats: ResMut<NavStats>,
    mut rng: ResMut<SimRng>,
    mut query: Query<(
        &AgentId,
        &Position,
        &mut Velocity,
        &mut NavAgent,
        &mut SocialGradientStore,
        &mut TrustLedger,
    )>,
) {
    let tick = clock.tick;
    let mut invalidated = BTreeSet::new();
    let mut harvests = Vec::new();

    {
        let fields: &FlowFieldCache = &cache;
        for (id, position, mut velocity, mut nav, mut gradients, mut trust) in query.iter_mut() {
            let searching = match nav.goal() {
                Some(NavGoal::SearchFor(resource)) => Some(resource),
                _ => None,
            };

            let ctx = NavContext {
                tick,
                position: position.0,
                velocity: velocity.0,
                home: settlement.center,
                obstacles: &obstacles.obstacles,
                fields,
                ground_truth: &*deposits,
            };
            let decision = orchestrator.tick(
                AgentNavMut {
                    id: id.as_str(),
                    nav: &mut *nav,
                    gradients: &mut *gradients,
                    trust: &mut *trust,
                },
                &ctx,
                &mut rng.0,
            );
            velocity.0 = decision.velocity;

            for seen in &decision.sightings {
                if sightings.record(seen.resource, seen.position) {
                    invalidated.insert(FieldKind::Resource(seen.resource));
                }
            }
            let mut gave_up = false;
            for notice in &decision.notices {
                match notice {
                    NavNotice::SightingEmpty { resource, position } => {
                        if sightings.forget(*resource, *position) {
                            invalidated.insert(FieldKind::Resource(*resource));
                        }
                    }
                    NavNotice::GaveUp { .. } => gave_up = true,
                    _ => {}
                }
            }
            if let Some(resource) = searching {
                if nav.is_idle() && !gave_up {
                    harvests.push((id.0.clone(), resource, position.0));
                }
            }

            stats.record_decision(&decision);
            for event in decision.events {
                pending.push(tick, id.as_str(), event);
            }
        }
    }

    let radius = settings.0.perception.radius;
    for (agent, resource, at) in harvests {
        if deposits.harvest(resource, at, radius) {
            stats.harvests += 1;
            tracing::debug!("{} harvested {} at tick {}", agent, resource, tick);
        }
    }
    for kind in invalidated {
        cache.invalidate(kind);
    }
}

/// System: move agents by their velocity, inside the world and outside obstacles
pub fn integrate_motion(
    cache: Res<FlowFieldCache>,
    obstacles: Res<ObstacleSet>,
    mut query: Query<(&mut Position, &Velocity)>,
) {
    let size = cache.generator().spec().world_size();
    let clamp = |p: Vec2| {
        Vec2::new(
            p.x.clamp(0.0, (size.x - EDGE_MARGIN).max(0.0)),
            p.y.clamp(0.0, (size.y - EDGE_MARGIN).max(0.0)),
        )
    };

    for (mut position, velocity) in query.iter_mut() {
        if velocity.0.is_zero() {
            continue;
        }
        position.0 = clamp(obstacles.resolve(clamp(position.0 + velocity.0)));
    }
}
