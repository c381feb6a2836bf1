//! Social Systems
//!
//! The claim/parse boundary between agents. Discovery broadcasts queued
//! this tick are turned into structured claims and parsed by every listener
//! in earshot; nothing else moves knowledge from one agent to another.

use bevy_ecs::prelude::*;
use rand::Rng;

use nav_events::{DiscoveryBroadcast, NavEvent, Polarity, ResourceType, Vec2};

use crate::components::{AgentId, Honesty, Position, SimClock};
use crate::config::NavSettings;
use crate::events::PendingEvents;
use crate::field::FlowFieldCache;
use crate::social::{SocialGradientStore, SpatialClaimParser};
use crate::telemetry::NavStats;
use crate::SimRng;

/// System: let agents in earshot hear this tick's discovery broadcasts
///
/// A broadcast is heard by every agent other than the speaker within
/// `social.hearing_radius` of where the speaker stood.
pub fn deliver_broadcasts(
    clock: Res<SimClock>,
    settings: Res<NavSettings>,
    pending: Res<PendingEvents>,
    mut stats: ResMut<NavStats>,
    mut query: Query<(&AgentId, &Position, &mut SocialGradientStore)>,
) {
    let parser = SpatialClaimParser::new(&settings.0.social);
    let hearing_radius = settings.0.social.hearing_radius;

    for record in pending.records() {
        let NavEvent::Discovery(broadcast) = &record.event else {
            continue;
        };
        let claim = broadcast.to_claim(record.agent_id.as_str(), record.tick);

        for (id, position, mut gradients) in query.iter_mut() {
            if id.0 == record.agent_id || position.0.distance(broadcast.origin) > hearing_radius {
                continue;
            }
            match parser.try_parse(&claim, position.0, clock.tick) {
                Ok(parsed) => {
                    if gradients.insert(parsed, clock.tick).is_some() {
                        stats.claims_delivered += 1;
                    }
                }
                Err(failure) => {
                    stats.claims_rejected += 1;
                    tracing::trace!("{} rejected claim from {}: {}", id.0, record.agent_id, failure);
                }
            }
        }
    }
}

/// System: dishonest agents occasionally announce resources that are not there
pub fn spread_rumors(
    clock: Res<SimClock>,
    settings: Res<NavSettings>,
    cache: Res<FlowFieldCache>,
    mut rng: ResMut<SimRng>,
    mut pending: ResMut<PendingEvents>,
    mut stats: ResMut<NavStats>,
    query: Query<(&AgentId, &Position, &Honesty)>,
) {
    let chance = settings.0.simulation.rumor_chance.clamp(0.0, 1.0) as f64;
    if chance <= 0.0 {
        return;
    }
    let size = cache.generator().spec().world_size();
    let resources = ResourceType::all();

    for (id, position, honesty) in query.iter() {
        if !honesty.is_dishonest() || !rng.0.gen_bool(chance) {
            continue;
        }

        let resource = resources[rng.0.gen_range(0..resources.len())];
        let claimed = Vec2::new(
            rng.0.gen_range(0.0..size.x.max(1.0)),
            rng.0.gen_range(0.0..size.y.max(1.0)),
        );
        tracing::debug!(
            "{} spreads a rumor of {} at ({:.1}, {:.1})",
            id.0,
            resource,
            claimed.x,
            claimed.y
        );
        pending.push(
            clock.tick,
            id.as_str(),
            NavEvent::Discovery(DiscoveryBroadcast::describe(
                resource,
                position.0,
                claimed,
                Polarity::Discovery,
            )),
        );
        stats.rumors += 1;
    }
}
