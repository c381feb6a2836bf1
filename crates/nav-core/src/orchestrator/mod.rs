//! Navigation Orchestrator
//!
//! Per-tick, per-agent entry point. Composes flow field samples, the
//! trust-weighted social gradient, steering and verification into one
//! velocity command, driven by an explicit state machine:
//!
//! ```text
//! idle -> seeking(goal) -> arriving -> verifying -> idle | exploring
//!              \______________ stuck (from any moving state) ____/
//! ```
//!
//! Nothing here returns an error. Unreachable fields, stuck agents and
//! failed verifications surface as notices, transitions and events.

pub mod state;

pub use state::{NavAgent, NavGoal, NavNotice, NavState, NavTransition, SeekGoal, StuckDetector};

use bevy_ecs::prelude::*;
use rand::Rng;

use nav_events::{DiscoveryBroadcast, NavEvent, Polarity, ResourceType, Vec2};

use crate::components::{GroundTruth, Obstacle, ResourceSighting};
use crate::config::{BlendConfig, NavConfig, SocialConfig, StuckConfig};
use crate::field::{FieldKind, FlowFieldCache};
use crate::social::{SocialGradientStore, TrustLedger};
use crate::steering::SteeringController;
use crate::verification::{VerificationReport, VerificationService};

/// Upper bound on state changes within one tick
const MAX_STEPS_PER_TICK: usize = 4;

/// Mutable per-agent state the orchestrator works on
pub struct AgentNavMut<'a> {
    pub id: &'a str,
    pub nav: &'a mut NavAgent,
    pub gradients: &'a mut SocialGradientStore,
    pub trust: &'a mut TrustLedger,
}

/// Read-only world state for one agent's tick
pub struct NavContext<'a> {
    pub tick: u64,
    pub position: Vec2,
    pub velocity: Vec2,
    pub home: Vec2,
    pub obstacles: &'a [Obstacle],
    pub fields: &'a FlowFieldCache,
    pub ground_truth: &'a dyn GroundTruth,
}

/// Everything one tick produced for one agent
#[derive(Debug, Clone, Default)]
pub struct NavDecision {
    pub velocity: Vec2,
    pub events: Vec<NavEvent>,
    /// Ground truth perceived this tick, for sighting aggregation
    pub sightings: Vec<ResourceSighting>,
    pub transitions: Vec<NavTransition>,
    pub notices: Vec<NavNotice>,
    pub verification: Option<VerificationReport>,
}

enum Step {
    Move(Vec2),
    Goto(NavState),
}

/// Resource: the shared, stateless navigation logic
#[derive(Resource, Debug, Clone)]
pub struct NavigationOrchestrator {
    steering: SteeringController,
    verifier: VerificationService,
    blend: BlendConfig,
    social: SocialConfig,
    stuck: StuckConfig,
    arrival_radius: f32,
    verify_radius: f32,
    perception_radius: f32,
}

impl NavigationOrchestrator {
    pub fn new(config: &NavConfig) -> Self {
        Self {
            steering: SteeringController::new(&config.steering),
            verifier: VerificationService::new(config.trust.clone()),
            blend: config.blend.clone(),
            social: config.social.clone(),
            stuck: config.stuck.clone(),
            arrival_radius: config.steering.arrival_radius,
            verify_radius: config.steering.verify_radius,
            perception_radius: config.perception.radius,
        }
    }

    pub fn steering(&self) -> &SteeringController {
        &self.steering
    }

    /// Replace the current goal. Gradients gathered for a superseded search,
    /// the old target and all steering memory are dropped immediately. The
    /// caller zeroes the agent's carried velocity.
    pub fn set_goal(&self, agent: AgentNavMut<'_>, goal: NavGoal) -> Option<NavTransition> {
        if let Some(NavGoal::SearchFor(old)) = agent.nav.goal {
            if goal != NavGoal::SearchFor(old) {
                agent.gradients.clear_resource(old);
            }
        }
        tracing::debug!("{} goal set to {}", agent.id, goal);
        agent.nav.goal = Some(goal);
        agent.nav.reset_pursuit();
        Self::force_state(agent.id, agent.nav, NavState::Idle)
    }

    /// Drop the current goal and stop.
    pub fn cancel(&self, agent: AgentNavMut<'_>) -> Option<NavTransition> {
        if let Some(NavGoal::SearchFor(old)) = agent.nav.goal {
            agent.gradients.clear_resource(old);
        }
        agent.nav.goal = None;
        agent.nav.reset_pursuit();
        Self::force_state(agent.id, agent.nav, NavState::Idle)
    }

    fn force_state(id: &str, nav: &mut NavAgent, to: NavState) -> Option<NavTransition> {
        if nav.state == to {
            return None;
        }
        let transition = NavTransition { from: nav.state, to };
        tracing::debug!("{} {} -> {}", id, transition.from, transition.to);
        nav.state = to;
        Some(transition)
    }

    /// Run one tick for one agent.
    pub fn tick<R: Rng>(&self, agent: AgentNavMut<'_>, ctx: &NavContext<'_>, rng: &mut R) -> NavDecision {
        let AgentNavMut {
            id,
            nav,
            gradients,
            trust,
        } = agent;
        let mut decision = NavDecision::default();

        gradients.prune(ctx.tick);
        decision.sightings = ctx.ground_truth.resources_within(ctx.position, self.perception_radius);

        if nav.state.is_moving() {
            if nav.stuck.observe(ctx.position) {
                self.enter_stuck(id, nav, ctx, rng, &mut decision);
            } else if nav.stuck_episodes > 0 && nav.stuck.progressing() {
                // Only back-to-back stalls count toward giving up.
                tracing::debug!("{} recovered after {} stuck episode(s)", id, nav.stuck_episodes);
                nav.stuck_episodes = 0;
            }
        }

        let mut velocity = Vec2::ZERO;
        for _ in 0..MAX_STEPS_PER_TICK {
            let state = nav.state;
            let step = match state {
                NavState::Idle => self.step_idle(nav, gradients, trust, ctx),
                NavState::Seeking(seek) => self.step_seeking(seek, id, nav, gradients, trust, ctx, &mut decision),
                NavState::Arriving => self.step_arriving(id, nav, ctx),
                NavState::Verifying => self.step_verifying(nav, gradients, trust, ctx, &mut decision),
                NavState::Exploring => self.step_exploring(id, nav, gradients, trust, ctx, rng, &mut decision),
                NavState::Stuck => self.step_stuck(nav, ctx),
            };
            match step {
                Step::Move(v) => {
                    velocity = v;
                    break;
                }
                Step::Goto(next) => self.transition(id, nav, next, &mut decision),
            }
        }

        decision.velocity = self.steering.limit(velocity);
        tracing::trace!("{} {} v=({:.2}, {:.2})", id, nav.state, decision.velocity.x, decision.velocity.y);
        decision
    }

    fn transition(&self, id: &str, nav: &mut NavAgent, to: NavState, decision: &mut NavDecision) {
        if let Some(t) = Self::force_state(id, nav, to) {
            if matches!(to, NavState::Idle | NavState::Verifying) {
                nav.stuck.reset();
            }
            decision.transitions.push(t);
        }
    }

    fn step_idle(
        &self,
        nav: &mut NavAgent,
        gradients: &SocialGradientStore,
        trust: &TrustLedger,
        ctx: &NavContext<'_>,
    ) -> Step {
        if nav.goal.is_none() {
            // A strong enough social signal is a goal in itself.
            let lead = gradients
                .strongest(ctx.tick, trust, self.social.activation_threshold)
                .filter(|(resource, _)| gradients.best_lead(*resource, ctx.tick, trust).is_some());
            match lead {
                Some((resource, _)) => nav.goal = Some(NavGoal::SearchFor(resource)),
                None => return Step::Move(Vec2::ZERO),
            }
        }

        match nav.goal {
            Some(NavGoal::Target(position)) => {
                nav.target = Some(position);
                Step::Goto(NavState::Seeking(SeekGoal::Position))
            }
            Some(NavGoal::ReturnHome) => {
                nav.target = Some(ctx.home);
                Step::Goto(NavState::Seeking(SeekGoal::Home))
            }
            Some(NavGoal::SearchFor(resource)) => {
                if self.adopt_lead(nav, gradients, trust, resource, ctx.tick)
                    || self.resource_field_usable(resource, ctx)
                {
                    Step::Goto(NavState::Seeking(SeekGoal::Resource(resource)))
                } else {
                    Step::Goto(NavState::Exploring)
                }
            }
            Some(NavGoal::Explore) => Step::Goto(NavState::Exploring),
            None => Step::Move(Vec2::ZERO),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn step_seeking(
        &self,
        seek: SeekGoal,
        id: &str,
        nav: &mut NavAgent,
        gradients: &SocialGradientStore,
        trust: &TrustLedger,
        ctx: &NavContext<'_>,
        decision: &mut NavDecision,
    ) -> Step {
        let position = ctx.position;

        if let SeekGoal::Resource(resource) = seek {
            if nav.target.is_none() {
                if let Some(seen) = Self::nearest_sighting(&decision.sightings, resource, position) {
                    self.announce(nav, resource, position, seen.position, decision);
                    nav.target = Some(seen.position);
                } else if !self.adopt_lead(nav, gradients, trust, resource, ctx.tick) {
                    return self.follow_resource_field(id, resource, ctx, decision);
                }
            }
        }

        let Some(target) = nav.target else {
            return Step::Goto(NavState::Idle);
        };
        if position.distance(target) <= self.arrival_radius {
            return Step::Goto(NavState::Arriving);
        }

        let base = match seek.field_kind() {
            Some(kind) => self.field_toward(id, nav, kind, target, ctx, decision),
            None => None,
        }
        .unwrap_or_else(|| (target - position).normalize_or_zero());

        let social = match seek {
            SeekGoal::Resource(resource) => gradients.blend(resource, ctx.tick, trust).direction(),
            _ => Vec2::ZERO,
        };
        let avoid = self.avoidance(gradients, ctx);

        Step::Move(self.steering.blend(&[
            (base, self.blend.field),
            (social, self.blend.social),
            (avoid, self.blend.avoidance),
        ]))
    }

    /// Field direction toward `target`, or `None` to steer at it directly.
    fn field_toward(
        &self,
        id: &str,
        nav: &mut NavAgent,
        kind: FieldKind,
        target: Vec2,
        ctx: &NavContext<'_>,
        decision: &mut NavDecision,
    ) -> Option<Vec2> {
        let field = ctx.fields.get(kind)?;
        let target_cost = field
            .spec()
            .cell_at(target)
            .map_or(f32::INFINITY, |cell| field.cost(cell));

        if !target_cost.is_finite() || field.nearest_reachable(ctx.position).is_none() {
            if !nav.field_fallback {
                nav.field_fallback = true;
                tracing::debug!("{} cannot reach {} through the {} field", id, Self::fmt_pos(target), kind);
                decision.notices.push(NavNotice::FieldUnreachable { kind, target });
            }
            return None;
        }
        nav.field_fallback = false;

        // The field only leads to the target when the target is one of its goals.
        if target_cost > 0.0 {
            return None;
        }
        let v = field.sample(ctx.position);
        (!v.is_zero()).then_some(v)
    }

    /// Seeking a resource with no explicit target: ride its field until
    /// something is perceived, or fall back to exploring.
    fn follow_resource_field(
        &self,
        id: &str,
        resource: ResourceType,
        ctx: &NavContext<'_>,
        decision: &mut NavDecision,
    ) -> Step {
        let kind = FieldKind::Resource(resource);
        let on_goal = ctx.fields.get(kind).and_then(|field| {
            field
                .spec()
                .cell_at(ctx.position)
                .map(|cell| field.cost(cell) == 0.0)
        });
        if on_goal == Some(true) {
            tracing::debug!("{} found no {} at a reported sighting", id, resource);
            decision.notices.push(NavNotice::SightingEmpty {
                resource,
                position: ctx.position,
            });
            return Step::Goto(NavState::Exploring);
        }
        if !self.resource_field_usable(resource, ctx) {
            return Step::Goto(NavState::Exploring);
        }

        let field = ctx.fields.sample(kind, ctx.position);
        let avoid = self.steering.avoid(ctx.position, ctx.velocity, ctx.obstacles) / self.steering.max_speed.max(f32::EPSILON);
        Step::Move(self.steering.blend(&[(field, self.blend.field), (avoid, self.blend.avoidance)]))
    }

    fn step_arriving(&self, id: &str, nav: &mut NavAgent, ctx: &NavContext<'_>) -> Step {
        let Some(target) = nav.target else {
            return Step::Goto(NavState::Idle);
        };
        let distance = ctx.position.distance(target);

        if distance <= self.verify_radius || self.against_cover(ctx.position, target, ctx.obstacles) {
            if nav.pursued.is_some() {
                return Step::Goto(NavState::Verifying);
            }
            if let Some(goal) = nav.goal.take() {
                tracing::debug!("{} completed {}", id, goal);
            }
            nav.reset_pursuit();
            return Step::Goto(NavState::Idle);
        }

        // Pushed back out: resume seeking.
        if distance > self.arrival_radius * 1.5 {
            if let Some(seek) = nav.goal.and_then(SeekGoal::for_goal) {
                return Step::Goto(NavState::Seeking(seek));
            }
        }

        let arrive = self.steering.arrive(ctx.position, target);
        let avoid = self.steering.avoid(ctx.position, ctx.velocity, ctx.obstacles);
        Step::Move(arrive + avoid * (self.blend.avoidance * arrive.length() / self.steering.max_speed.max(f32::EPSILON)))
    }

    /// Pressed against an obstacle that covers `target`, close enough to
    /// perceive it. No free point lies within `verify_radius` of such a target.
    fn against_cover(&self, position: Vec2, target: Vec2, obstacles: &[Obstacle]) -> bool {
        position.distance(target) <= self.perception_radius
            && obstacles
                .iter()
                .any(|o| o.contains(target) && o.surface_distance(position) <= self.verify_radius)
    }

    fn step_verifying(
        &self,
        nav: &mut NavAgent,
        gradients: &mut SocialGradientStore,
        trust: &mut TrustLedger,
        ctx: &NavContext<'_>,
        decision: &mut NavDecision,
    ) -> Step {
        let record = nav.pursued.take().and_then(|id| gradients.remove(id));
        let Some(record) = record else {
            nav.target = None;
            return Step::Goto(self.after_failed_search(nav));
        };

        let observed: Vec<ResourceType> = decision.sightings.iter().map(|s| s.resource).collect();
        let report = self.verifier.verify(trust, &record, &observed, ctx.tick);
        decision.events.push(NavEvent::Verification(report.broadcast()));

        let next = if report.confirmed() {
            if !record.is_avoidance() {
                self.announce(nav, record.resource, ctx.position, record.target, decision);
            }
            nav.goal = None;
            nav.reset_pursuit();
            NavState::Idle
        } else {
            // Tell everyone within earshot there is nothing here.
            decision.events.push(NavEvent::Discovery(DiscoveryBroadcast::describe(
                record.resource,
                ctx.position,
                record.target,
                Polarity::Depleted,
            )));
            nav.target = None;
            self.after_failed_search(nav)
        };

        decision.verification = Some(report);
        Step::Goto(next)
    }

    fn after_failed_search(&self, nav: &NavAgent) -> NavState {
        match nav.goal {
            Some(NavGoal::SearchFor(_)) | Some(NavGoal::Explore) => NavState::Exploring,
            _ => NavState::Idle,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn step_exploring<R: Rng>(
        &self,
        id: &str,
        nav: &mut NavAgent,
        gradients: &SocialGradientStore,
        trust: &TrustLedger,
        ctx: &NavContext<'_>,
        rng: &mut R,
        decision: &mut NavDecision,
    ) -> Step {
        let position = ctx.position;
        let searching = match nav.goal {
            Some(NavGoal::SearchFor(resource)) => Some(resource),
            Some(NavGoal::Explore) => None,
            _ => return Step::Goto(NavState::Idle),
        };

        if let Some(resource) = searching {
            if let Some(seen) = Self::nearest_sighting(&decision.sightings, resource, position) {
                tracing::debug!("{} spotted {} while exploring", id, resource);
                self.announce(nav, resource, position, seen.position, decision);
                nav.target = Some(seen.position);
                nav.pursued = None;
                return Step::Goto(NavState::Seeking(SeekGoal::Resource(resource)));
            }
            if self.adopt_lead(nav, gradients, trust, resource, ctx.tick) {
                return Step::Goto(NavState::Seeking(SeekGoal::Resource(resource)));
            }
            if self.resource_field_usable(resource, ctx) {
                return Step::Goto(NavState::Seeking(SeekGoal::Resource(resource)));
            }
        }

        let exploration = ctx.fields.sample(FieldKind::Exploration, position);
        let dispersion = ctx.fields.sample(FieldKind::Dispersion, position);
        let wander = self.steering.wander(&mut nav.wander, position, rng) / self.steering.max_speed.max(f32::EPSILON);
        let social = searching.map_or(Vec2::ZERO, |r| gradients.blend(r, ctx.tick, trust).direction());
        let avoid = self.avoidance(gradients, ctx);

        Step::Move(self.steering.blend(&[
            (exploration, self.blend.exploration),
            (dispersion, self.blend.dispersion),
            (wander, self.blend.wander),
            (social, self.blend.social),
            (avoid, self.blend.avoidance),
        ]))
    }

    fn step_stuck(&self, nav: &mut NavAgent, ctx: &NavContext<'_>) -> Step {
        let resume = nav.resume.unwrap_or(NavState::Idle);
        let Some(detour) = nav.detour else {
            nav.resume = None;
            return Step::Goto(resume);
        };

        nav.detour_ticks += 1;
        let reached = ctx.position.distance(detour) <= self.verify_radius.max(self.steering.max_speed);
        if reached || nav.detour_ticks > nav.stuck.window() {
            nav.detour = None;
            nav.detour_ticks = 0;
            nav.resume = None;
            nav.stuck.reset();
            return Step::Goto(resume);
        }

        let seek = self.steering.seek(ctx.position, detour);
        let avoid = self.steering.avoid(ctx.position, ctx.velocity, ctx.obstacles);
        Step::Move(seek + avoid * self.blend.avoidance)
    }

    /// One stuck episode: detour and request help, or give up after too many.
    fn enter_stuck<R: Rng>(
        &self,
        id: &str,
        nav: &mut NavAgent,
        ctx: &NavContext<'_>,
        rng: &mut R,
        decision: &mut NavDecision,
    ) {
        nav.stuck_episodes += 1;
        let resume = nav.state;
        self.transition(id, nav, NavState::Stuck, decision);
        decision.notices.push(NavNotice::Stuck {
            episode: nav.stuck_episodes,
        });

        if nav.stuck_episodes > self.stuck.max_retries {
            let goal = nav.goal.take();
            tracing::info!(
                "{} gave up on {} after {} stuck episodes",
                id,
                goal.map_or_else(|| "wandering".to_string(), |g| g.to_string()),
                nav.stuck_episodes - 1
            );
            decision.notices.push(NavNotice::GaveUp { goal });
            nav.reset_pursuit();
            self.transition(id, nav, NavState::Idle, decision);
            return;
        }

        let angle = rng.gen_range(0.0..360.0);
        let reach = self.stuck.retarget_radius.max(0.0) * rng.gen_range(0.5..=1.0);
        let detour = ctx.position + Vec2::from_angle_degrees(angle) * reach;
        nav.detour = Some(detour);
        nav.detour_ticks = 0;
        nav.resume = Some(resume);

        decision.notices.push(NavNotice::PlannerRequested {
            from: ctx.position,
            to: nav.target.unwrap_or(detour),
        });
        tracing::debug!("{} stuck at {}, detouring to {}", id, Self::fmt_pos(ctx.position), Self::fmt_pos(detour));
    }

    /// Point the agent at the best trusted lead for `resource`, if there is one.
    fn adopt_lead(
        &self,
        nav: &mut NavAgent,
        gradients: &SocialGradientStore,
        trust: &TrustLedger,
        resource: ResourceType,
        now: u64,
    ) -> bool {
        match gradients.best_lead(resource, now, trust) {
            Some(lead) => {
                nav.target = Some(lead.target);
                nav.pursued = Some(lead.record_id);
                true
            }
            None => false,
        }
    }

    /// Whether the resource field leads somewhere from here.
    fn resource_field_usable(&self, resource: ResourceType, ctx: &NavContext<'_>) -> bool {
        ctx.fields.get(FieldKind::Resource(resource)).is_some_and(|field| {
            field
                .spec()
                .cell_at(ctx.position)
                .map(|cell| {
                    let cost = field.cost(cell);
                    cost.is_finite() && cost > 0.0
                })
                .unwrap_or(false)
        })
    }

    /// Obstacle push plus escape from avoidance zones, in units of max speed.
    fn avoidance(&self, gradients: &SocialGradientStore, ctx: &NavContext<'_>) -> Vec2 {
        let max_speed = self.steering.max_speed.max(f32::EPSILON);
        let mut push = self.steering.avoid(ctx.position, ctx.velocity, ctx.obstacles) / max_speed;
        for zone in gradients.zones(ctx.tick) {
            if zone.contains(ctx.position) {
                push += (ctx.position - zone.center).normalize_or_zero();
            }
        }
        push
    }

    fn announce(&self, nav: &mut NavAgent, resource: ResourceType, from: Vec2, at: Vec2, decision: &mut NavDecision) {
        if nav.announced {
            return;
        }
        nav.announced = true;
        decision.events.push(NavEvent::Discovery(DiscoveryBroadcast::describe(
            resource,
            from,
            at,
            Polarity::Discovery,
        )));
    }

    fn nearest_sighting(sightings: &[ResourceSighting], resource: ResourceType, from: Vec2) -> Option<ResourceSighting> {
        sightings
            .iter()
            .filter(|s| s.resource == resource)
            .min_by(|a, b| a.position.distance(from).total_cmp(&b.position.distance(from)))
            .copied()
    }

    fn fmt_pos(p: Vec2) -> String {
        format!("({:.1}, {:.1})", p.x, p.y)
    }
}

impl Default for NavigationOrchestrator {
    fn default() -> Self {
        Self::new(&NavConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ObstacleSet, ResourceDeposit, ResourceMap};
    use crate::field::{ExplorationMap, FieldInputs, FlowFieldGenerator, GridBounds, RegenerationPolicy, ResourceSightings};
    use crate::social::{GradientRecord, SpatialClaimParser};
    use nav_events::SpatialClaim;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    struct Harness {
        orchestrator: NavigationOrchestrator,
        nav: NavAgent,
        gradients: SocialGradientStore,
        trust: TrustLedger,
        fields: FlowFieldCache,
        world: ResourceMap,
        obstacles: ObstacleSet,
        position: Vec2,
        velocity: Vec2,
        tick: u64,
        rng: SmallRng,
    }

    impl Harness {
        fn new(world: ResourceMap) -> Self {
            let config = NavConfig::default();
            let generator = FlowFieldGenerator::new(GridBounds::new(16, 16), 4.0);
            let spec = generator.spec();
            let mut fields = FlowFieldCache::new(generator, RegenerationPolicy::from(&config.fields));
            let exploration = ExplorationMap::new(spec);
            let sightings = ResourceSightings::new(spec);
            fields.refresh(
                0,
                &FieldInputs {
                    exploration: &exploration,
                    sightings: &sightings,
                    home: Vec2::new(2.0, 2.0),
                    agent_positions: &[],
                },
            );

            Self {
                orchestrator: NavigationOrchestrator::new(&config),
                nav: NavAgent::new(&config),
                gradients: SocialGradientStore::from_config(&config.social),
                trust: TrustLedger::from_config("agent_0001", &config.trust),
                fields,
                world,
                obstacles: ObstacleSet::default(),
                position: Vec2::new(10.0, 10.0),
                velocity: Vec2::ZERO,
                tick: 0,
                rng: SmallRng::seed_from_u64(3),
            }
        }

        fn agent(&mut self) -> AgentNavMut<'_> {
            AgentNavMut {
                id: "agent_0001",
                nav: &mut self.nav,
                gradients: &mut self.gradients,
                trust: &mut self.trust,
            }
        }

        /// Tick once; `frozen` keeps the agent in place.
        fn step(&mut self, frozen: bool) -> NavDecision {
            let ctx = NavContext {
                tick: self.tick,
                position: self.position,
                velocity: self.velocity,
                home: Vec2::new(2.0, 2.0),
                obstacles: &self.obstacles.obstacles,
                fields: &self.fields,
                ground_truth: &self.world,
            };
            let decision = self.orchestrator.tick(
                AgentNavMut {
                    id: "agent_0001",
                    nav: &mut self.nav,
                    gradients: &mut self.gradients,
                    trust: &mut self.trust,
                },
                &ctx,
                &mut self.rng,
            );
            if !frozen {
                self.velocity = decision.velocity;
                self.position = self.obstacles.resolve(self.position + decision.velocity);
            }
            self.tick += 1;
            decision
        }

        fn hear(&mut self, claim: &SpatialClaim) -> Option<u64> {
            let record: GradientRecord = SpatialClaimParser::default().parse(claim, self.position, self.tick)?;
            self.gradients.insert(record, self.tick)
        }
    }

    fn wood_at(x: f32, y: f32) -> ResourceMap {
        ResourceMap::new(vec![ResourceDeposit {
            resource: ResourceType::Wood,
            position: Vec2::new(x, y),
            amount: 10,
        }])
    }

    #[test]
    fn test_idle_without_goal_holds_still() {
        let mut h = Harness::new(ResourceMap::default());
        let decision = h.step(false);
        assert_eq!(decision.velocity, Vec2::ZERO);
        assert_eq!(h.nav.state(), NavState::Idle);
    }

    #[test]
    fn test_target_goal_arrives_and_completes() {
        let mut h = Harness::new(ResourceMap::default());
        let orchestrator = h.orchestrator.clone();
        orchestrator.set_goal(h.agent(), NavGoal::Target(Vec2::new(30.0, 10.0)));

        let mut states = Vec::new();
        for _ in 0..200 {
            let decision = h.step(false);
            states.extend(decision.transitions.iter().map(|t| t.to.as_str()));
            if h.nav.goal().is_none() {
                break;
            }
        }

        assert!(h.nav.goal().is_none());
        assert_eq!(h.nav.state(), NavState::Idle);
        assert!(states.contains(&"seeking"));
        assert!(states.contains(&"arriving"));
        assert!(h.position.distance(Vec2::new(30.0, 10.0)) <= 1.0);
    }

    #[test]
    fn test_true_lead_is_verified_and_trusted() {
        let mut h = Harness::new(wood_at(30.0, 10.0));
        let claim = SpatialClaim::discovery("agent_0002", ResourceType::Wood, 0.0, 20.0, 0);
        h.hear(&claim).unwrap();

        let mut report = None;
        for _ in 0..300 {
            if let Some(r) = h.step(false).verification {
                report = Some(r);
                break;
            }
        }

        let report = report.expect("agent should reach the lead and verify it");
        assert!(report.confirmed());
        assert!(h.trust.get("agent_0002") > 0.5);
        assert_eq!(h.nav.state(), NavState::Idle);
    }

    #[test]
    fn test_false_lead_penalizes_source_and_keeps_searching() {
        let mut h = Harness::new(ResourceMap::default());
        let orchestrator = h.orchestrator.clone();
        orchestrator.set_goal(h.agent(), NavGoal::SearchFor(ResourceType::Stone));
        let claim = SpatialClaim::discovery("agent_0003", ResourceType::Stone, 90.0, 15.0, 0);
        h.hear(&claim).unwrap();

        let mut decision = None;
        for _ in 0..300 {
            let d = h.step(false);
            if d.verification.is_some() {
                decision = Some(d);
                break;
            }
        }

        let decision = decision.expect("agent should verify the false lead");
        let report = decision.verification.as_ref().unwrap();
        assert!(!report.confirmed());
        assert!(h.trust.get("agent_0003") < 0.5);
        assert!(decision
            .events
            .iter()
            .any(|e| matches!(e, NavEvent::Discovery(d) if d.polarity == Polarity::Depleted)));
        assert_eq!(h.nav.state(), NavState::Exploring);
        assert_eq!(h.nav.goal(), Some(NavGoal::SearchFor(ResourceType::Stone)));
    }

    #[test]
    fn test_verification_runs_once_per_arrival() {
        let mut h = Harness::new(wood_at(30.0, 10.0));
        h.hear(&SpatialClaim::discovery("agent_0002", ResourceType::Wood, 0.0, 20.0, 0));

        let verifications = (0..300).filter(|_| h.step(false).verification.is_some()).count();
        assert_eq!(verifications, 1);
    }

    #[test]
    fn test_strong_gradient_wakes_idle_agent() {
        let mut h = Harness::new(ResourceMap::default());
        h.hear(&SpatialClaim::discovery("agent_0002", ResourceType::Food, 180.0, 8.0, 0));

        let decision = h.step(false);
        assert_eq!(h.nav.goal(), Some(NavGoal::SearchFor(ResourceType::Food)));
        assert!(decision.velocity.x < 0.0);
    }

    #[test]
    fn test_cancel_drops_old_search() {
        let mut h = Harness::new(ResourceMap::default());
        let orchestrator = h.orchestrator.clone();
        orchestrator.set_goal(h.agent(), NavGoal::SearchFor(ResourceType::Wood));
        h.hear(&SpatialClaim::discovery("agent_0002", ResourceType::Wood, 0.0, 20.0, 0));
        h.step(false);
        assert!(h.nav.target().is_some());

        orchestrator.set_goal(h.agent(), NavGoal::ReturnHome);
        assert!(h.nav.target().is_none());
        assert!(h.nav.pursued_record().is_none());
        assert!(h.gradients.records(ResourceType::Wood).is_empty());
        assert_eq!(h.nav.state(), NavState::Idle);

        h.step(false);
        assert_eq!(h.nav.state(), NavState::Seeking(SeekGoal::Home));
    }

    #[test]
    fn test_stuck_once_per_episode_then_gives_up() {
        let mut h = Harness::new(ResourceMap::default());
        let orchestrator = h.orchestrator.clone();
        orchestrator.set_goal(h.agent(), NavGoal::Target(Vec2::new(60.0, 60.0)));
        let window = NavConfig::default().stuck.window;

        let mut stuck_entries = 0;
        let mut gave_up = false;
        for t in 0..(window * 20) {
            let decision = h.step(true);
            stuck_entries += decision
                .transitions
                .iter()
                .filter(|tr| tr.to == NavState::Stuck)
                .count();
            if t == window + 1 {
                assert_eq!(stuck_entries, 1);
            }
            if decision.notices.iter().any(|n| matches!(n, NavNotice::GaveUp { .. })) {
                gave_up = true;
            }
        }

        assert!(gave_up);
        assert_eq!(h.nav.state(), NavState::Idle);
        assert!(h.nav.goal().is_none());
        assert_eq!(stuck_entries as u32, NavConfig::default().stuck.max_retries + 1);
    }
    #[test]
    fn test_stalls_separated_by_progress_never_give_up() {
        let mut h = Harness::new(ResourceMap::default());
        let orchestrator = h.orchestrator.clone();
        let goal = NavGoal::Target(Vec2::new(2000.0, 10.0));
        orchestrator.set_goal(h.agent(), goal);

        // Pinned for 25 ticks, then free for 40, six times over.
        let mut episodes = Vec::new();
        for t in 0..(65 * 6) {
            let decision = h.step(t % 65 < 25);
            for notice in &decision.notices {
                match notice {
                    NavNotice::Stuck { episode } => episodes.push(*episode),
                    NavNotice::GaveUp { .. } => panic!("gave up at tick {} despite progress", t),
                    _ => {}
                }
            }
        }

        assert_eq!(episodes, vec![1; 6]);
        assert_eq!(h.nav.goal(), Some(goal));
        assert!(h.position.x > 60.0);
    }

    #[test]
    fn test_set_goal_resets_wander_heading() {
        let mut h = Harness::new(ResourceMap::default());
        h.nav = NavAgent::new(&NavConfig::default()).with_wander_heading(90.0);
        let orchestrator = h.orchestrator.clone();
        orchestrator.set_goal(h.agent(), NavGoal::Explore);
        for _ in 0..30 {
            h.step(false);
        }
        assert_ne!(h.nav.wander_heading(), 90.0);

        orchestrator.set_goal(h.agent(), NavGoal::ReturnHome);
        assert_eq!(h.nav.wander_heading(), 90.0);

        orchestrator.set_goal(h.agent(), NavGoal::Explore);
        for _ in 0..30 {
            h.step(false);
        }
        orchestrator.cancel(h.agent());
        assert_eq!(h.nav.wander_heading(), 90.0);
    }

    #[test]
    fn test_claim_inside_obstacle_is_verified_at_its_surface() {
        let mut h = Harness::new(wood_at(30.0, 10.0));
        h.obstacles = ObstacleSet::new(vec![Obstacle::new(Vec2::new(30.0, 10.0), 3.0)]);
        h.hear(&SpatialClaim::discovery("agent_0002", ResourceType::Wood, 0.0, 20.0, 0));

        let mut reports = Vec::new();
        for _ in 0..300 {
            let decision = h.step(false);
            assert!(!decision.notices.iter().any(|n| matches!(n, NavNotice::GaveUp { .. })));
            reports.extend(decision.verification);
        }

        assert_eq!(reports.len(), 1);
        assert!(reports[0].confirmed());
        assert!(h.position.distance(Vec2::new(30.0, 10.0)) > 3.0);
        assert!(h.nav.is_idle());
    }
}
