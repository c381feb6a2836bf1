//! Telemetry
//!
//! Read-only queries over a running world, periodic JSON snapshots of every
//! agent's navigation state and run-wide counters.

use bevy_ecs::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use nav_events::{generate_snapshot_id, AgentNavSnapshot, NavEvent, NavSnapshot, Polarity, ResourceType};

use crate::components::{AgentId, Position, SimClock, Velocity};
use crate::field::FlowFieldCache;
use crate::orchestrator::{NavAgent, NavDecision, NavNotice};
use crate::social::{GradientRecord, SocialGradientStore, TrustLedger};

/// Resource to track snapshot generation
#[derive(Resource, Debug)]
pub struct SnapshotGenerator {
    next_snapshot_id: u64,
    snapshot_interval: u64,
    last_snapshot_tick: Option<u64>,
}

impl SnapshotGenerator {
    pub fn new(snapshot_interval: u64) -> Self {
        Self {
            next_snapshot_id: 1,
            snapshot_interval,
            last_snapshot_tick: None,
        }
    }

    /// Tick 0 always; after that every `snapshot_interval` ticks (never when 0).
    pub fn should_snapshot(&self, current_tick: u64) -> bool {
        if self.last_snapshot_tick == Some(current_tick) {
            return false;
        }
        current_tick == 0 || (self.snapshot_interval > 0 && current_tick % self.snapshot_interval == 0)
    }

    pub fn next_id(&mut self) -> String {
        let id = generate_snapshot_id(self.next_snapshot_id);
        self.next_snapshot_id += 1;
        id
    }

    pub fn mark_snapshot(&mut self, tick: u64) {
        self.last_snapshot_tick = Some(tick);
    }

    pub fn snapshot_count(&self) -> u64 {
        self.next_snapshot_id - 1
    }
}

fn current_tick(world: &World) -> u64 {
    world.get_resource::<SimClock>().map_or(0, |clock| clock.tick)
}

/// Trust `observer` currently places in `subject`, or `None` if there is no
/// such observer.
pub fn get_trust(world: &mut World, observer: &str, subject: &str) -> Option<f32> {
    let mut query = world.query::<(&AgentId, &TrustLedger)>();
    query
        .iter(world)
        .find(|(id, _)| id.as_str() == observer)
        .map(|(_, ledger)| ledger.get(subject))
}

/// Records for `resource` in `agent`'s store that still contribute at the
/// current tick.
pub fn get_active_gradients(world: &mut World, agent: &str, resource: ResourceType) -> Vec<GradientRecord> {
    let now = current_tick(world);
    let mut query = world.query::<(&AgentId, &SocialGradientStore)>();
    query
        .iter(world)
        .find(|(id, _)| id.as_str() == agent)
        .map(|(_, store)| store.active(resource, now).into_iter().cloned().collect())
        .unwrap_or_default()
}

/// Capture every agent's navigation state, beliefs and the cached fields.
///
/// Takes the snapshot ID from the `SnapshotGenerator` when one is installed.
pub fn nav_snapshot(world: &mut World) -> NavSnapshot {
    let tick = current_tick(world);
    let snapshot_id = match world.get_resource_mut::<SnapshotGenerator>() {
        Some(mut generator) => {
            generator.mark_snapshot(tick);
            generator.next_id()
        }
        None => generate_snapshot_id(tick),
    };

    let mut query = world.query::<(
        &AgentId,
        &Position,
        &Velocity,
        &NavAgent,
        &SocialGradientStore,
        &TrustLedger,
    )>();
    let mut agents: Vec<AgentNavSnapshot> = query
        .iter(world)
        .map(|(id, position, velocity, nav, gradients, trust)| AgentNavSnapshot {
            agent_id: id.0.clone(),
            position: position.0,
            velocity: velocity.0,
            state: nav.state().as_str().to_string(),
            goal: nav.goal().map(|goal| goal.to_string()),
            target: nav.target(),
            gradients: gradients.snapshot(tick),
            trust: trust.snapshot(),
        })
        .collect();
    agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));

    let fields = world
        .get_resource::<FlowFieldCache>()
        .map(|cache| cache.snapshots())
        .unwrap_or_default();

    NavSnapshot {
        snapshot_id,
        tick,
        agents,
        fields,
    }
}

/// Write snapshot to file
pub fn write_snapshot(snapshot: &NavSnapshot, path: impl AsRef<Path>) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json)?;
    Ok(())
}

/// Write snapshot into `dir` as `snap_<tick>.json`, returning the path written.
pub fn write_snapshot_to_dir(snapshot: &NavSnapshot, dir: impl AsRef<Path>) -> std::io::Result<PathBuf> {
    let path = dir.as_ref().join(format!("snap_{:06}.json", snapshot.tick));
    write_snapshot(snapshot, &path)?;
    Ok(path)
}

/// Resource: run-wide navigation counters
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize)]
pub struct NavStats {
    pub ticks: u64,
    /// Transitions by the state entered
    pub transitions: BTreeMap<String, u64>,
    pub discoveries: u64,
    pub depletions: u64,
    pub confirmations: u64,
    /// Failed verifications by failure kind
    pub failures: BTreeMap<String, u64>,
    pub stuck_episodes: u64,
    pub goals_abandoned: u64,
    pub unreachable_fields: u64,
    pub planner_requests: u64,
    pub claims_delivered: u64,
    pub claims_rejected: u64,
    pub rumors: u64,
    pub harvests: u64,
}

impl NavStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one agent's tick into the counters.
    pub fn record_decision(&mut self, decision: &NavDecision) {
        for transition in &decision.transitions {
            *self.transitions.entry(transition.to.as_str().to_string()).or_default() += 1;
        }
        for notice in &decision.notices {
            match notice {
                NavNotice::Stuck { .. } => self.stuck_episodes += 1,
                NavNotice::GaveUp { .. } => self.goals_abandoned += 1,
                NavNotice::FieldUnreachable { .. } => self.unreachable_fields += 1,
                NavNotice::PlannerRequested { .. } => self.planner_requests += 1,
                NavNotice::SightingEmpty { .. } => {}
            }
        }
        for event in &decision.events {
            if let NavEvent::Discovery(broadcast) = event {
                match broadcast.polarity {
                    Polarity::Discovery => self.discoveries += 1,
                    Polarity::Depleted => self.depletions += 1,
                }
            }
        }
        if let Some(report) = &decision.verification {
            match report.failure() {
                None => self.confirmations += 1,
                Some(failure) => *self.failures.entry(failure.as_str().to_string()).or_default() += 1,
            }
        }
    }

    pub fn verifications(&self) -> u64 {
        self.confirmations + self.failures.values().sum::<u64>()
    }

    /// Share of verifications that confirmed the claim.
    pub fn confirmation_rate(&self) -> f64 {
        match self.verifications() {
            0 => 0.0,
            n => self.confirmations as f64 / n as f64,
        }
    }

    pub fn write(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::NavAgentBundle;
    use crate::config::NavConfig;
    use crate::social::TrustOutcome;
    use crate::verification::{VerificationFailure, VerificationReport};
    use nav_events::{SpatialClaim, Vec2};

    fn spawn_pair(world: &mut World) {
        let config = NavConfig::default();
        let mut trust = TrustLedger::from_config("agent_0001", &config.trust);
        trust.apply("agent_0002", 0.2, 3, TrustOutcome::Confirmed);

        let mut gradients = SocialGradientStore::from_config(&config.social);
        let claim = SpatialClaim::discovery("agent_0002", ResourceType::Water, 90.0, 12.0, 0);
        let record = crate::social::SpatialClaimParser::default()
            .parse(&claim, Vec2::ZERO, 0)
            .unwrap();
        gradients.insert(record, 0);

        world.spawn(NavAgentBundle::new(AgentId::numbered(1), Vec2::ZERO, gradients, trust));
        world.spawn(NavAgentBundle::new(
            AgentId::numbered(2),
            Vec2::new(5.0, 5.0),
            SocialGradientStore::from_config(&config.social),
            TrustLedger::from_config("agent_0002", &config.trust),
        ));
    }

    #[test]
    fn test_snapshot_generator_interval() {
        let mut generator = SnapshotGenerator::new(100);
        assert!(generator.should_snapshot(0));
        assert!(!generator.should_snapshot(50));
        assert!(generator.should_snapshot(200));

        generator.mark_snapshot(200);
        assert!(!generator.should_snapshot(200));

        assert_eq!(generator.next_id(), "snap_000001");
        assert_eq!(generator.snapshot_count(), 1);

        let never = SnapshotGenerator::new(0);
        assert!(!never.should_snapshot(10));
    }

    #[test]
    fn test_trust_query() {
        let mut world = World::new();
        world.insert_resource(SimClock { tick: 5 });
        spawn_pair(&mut world);

        let trust = get_trust(&mut world, "agent_0001", "agent_0002").unwrap();
        assert!((trust - 0.7).abs() < 1e-6);
        // Never verified: neutral.
        assert_eq!(get_trust(&mut world, "agent_0002", "agent_0001"), Some(0.5));
        assert_eq!(get_trust(&mut world, "agent_0099", "agent_0001"), None);
    }

    #[test]
    fn test_active_gradients_query() {
        let mut world = World::new();
        world.insert_resource(SimClock { tick: 10 });
        spawn_pair(&mut world);

        let active = get_active_gradients(&mut world, "agent_0001", ResourceType::Water);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].source_id, "agent_0002");
        assert!(get_active_gradients(&mut world, "agent_0001", ResourceType::Wood).is_empty());

        // Past the horizon nothing is active.
        world.insert_resource(SimClock { tick: 10_000 });
        assert!(get_active_gradients(&mut world, "agent_0001", ResourceType::Water).is_empty());
    }

    #[test]
    fn test_nav_snapshot() {
        let mut world = World::new();
        world.insert_resource(SimClock { tick: 7 });
        world.insert_resource(SnapshotGenerator::new(10));
        spawn_pair(&mut world);

        let snapshot = nav_snapshot(&mut world);
        assert_eq!(snapshot.snapshot_id, "snap_000001");
        assert_eq!(snapshot.tick, 7);
        assert_eq!(snapshot.agents.len(), 2);

        let first = snapshot.agent("agent_0001").unwrap();
        assert_eq!(first.state, "idle");
        assert_eq!(first.gradients.len(), 1);
        assert_eq!(first.trust.len(), 1);
        assert!(snapshot.mean_trust_received("agent_0002").is_some());

        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot_to_dir(&snapshot, dir.path()).unwrap();
        let parsed: NavSnapshot = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.agents.len(), 2);
    }

    #[test]
    fn test_stats_record_decision() {
        let mut stats = NavStats::new();
        let decision = NavDecision {
            notices: vec![NavNotice::Stuck { episode: 1 }],
            verification: Some(VerificationReport {
                observer_id: "agent_0001".to_string(),
                source_id: "agent_0002".to_string(),
                resource: ResourceType::Wood,
                record_id: 1,
                outcome: TrustOutcome::Failed(VerificationFailure::FalseReport),
                trust_before: 0.5,
                trust_after: 0.35,
            }),
            ..Default::default()
        };
        stats.record_decision(&decision);

        assert_eq!(stats.stuck_episodes, 1);
        assert_eq!(stats.failures.get("false_report"), Some(&1));
        assert_eq!(stats.verifications(), 1);
        assert_eq!(stats.confirmation_rate(), 0.0);
    }
}
