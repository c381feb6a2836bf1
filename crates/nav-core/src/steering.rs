//! Steering Behaviors
//!
//! Primitives that turn a target, a field sample or a set of weighted
//! vectors into a velocity command. Every primitive's output is bounded by
//! `max_speed`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use nav_events::Vec2;

use crate::components::Obstacle;
use crate::config::SteeringConfig;

/// Full speed straight at the target.
pub fn seek(position: Vec2, target: Vec2, max_speed: f32) -> Vec2 {
    (target - position).normalize_or_zero() * max_speed.max(0.0)
}

/// Like seek, but speed falls off linearly inside `slowing_radius`.
pub fn arrive(position: Vec2, target: Vec2, max_speed: f32, slowing_radius: f32) -> Vec2 {
    let offset = target - position;
    let distance = offset.length();
    let direction = offset.normalize_or_zero();
    if direction.is_zero() {
        return Vec2::ZERO;
    }

    let max_speed = max_speed.max(0.0);
    let speed = if slowing_radius > 0.0 && distance < slowing_radius {
        max_speed * (distance / slowing_radius)
    } else {
        max_speed
    };
    direction * speed
}

/// Obstacle avoidance tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvoidanceParams {
    /// How far ahead along the velocity to look
    pub look_ahead: f32,
    /// Obstacles whose surface is closer than this to the look-ahead point repel
    pub threat_radius: f32,
}

impl From<&SteeringConfig> for AvoidanceParams {
    fn from(config: &SteeringConfig) -> Self {
        Self {
            look_ahead: config.look_ahead,
            threat_radius: config.threat_radius,
        }
    }
}

/// Lateral push away from the nearest obstacle ahead, zero if none threatens.
///
/// The look-ahead point sits `look_ahead` units along the current velocity. The push is
/// perpendicular to the heading and scaled by `(threat - d) / threat`, where
/// `d` is that point's distance to the obstacle surface.
pub fn avoid_obstacles(
    position: Vec2,
    velocity: Vec2,
    params: &AvoidanceParams,
    obstacles: &[Obstacle],
    max_speed: f32,
) -> Vec2 {
    if params.threat_radius <= 0.0 {
        return Vec2::ZERO;
    }

    let heading = velocity.normalize_or_zero();
    let ahead = position + heading * params.look_ahead;

    let nearest = obstacles
        .iter()
        .map(|o| (o, o.surface_distance(ahead)))
        .filter(|(_, d)| *d < params.threat_radius)
        .min_by(|a, b| a.1.total_cmp(&b.1));

    let Some((obstacle, distance)) = nearest else {
        return Vec2::ZERO;
    };

    let away = (ahead - obstacle.center).normalize_or_zero();
    let lateral = if heading.is_zero() {
        away
    } else {
        match (away - heading * away.dot(heading)).normalize_or_zero() {
            // Dead ahead: pick a side.
            l if l.is_zero() => heading.perp(),
            l => l,
        }
    };

    let scale = ((params.threat_radius - distance) / params.threat_radius).clamp(0.0, 1.0);
    lateral * (max_speed.max(0.0) * scale)
}

/// Persistent wander heading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WanderState {
    /// Current heading in degrees
    pub heading: f32,
    /// Distance of the wander circle ahead of the agent
    pub distance: f32,
    pub radius: f32,
    /// Largest heading change per tick, in degrees
    pub jitter: f32,
}

impl WanderState {
    pub fn new(heading: f32, config: &SteeringConfig) -> Self {
        Self {
            heading,
            distance: config.wander_distance,
            radius: config.wander_radius,
            jitter: config.wander_jitter_degrees.abs(),
        }
    }

    pub fn reset(&mut self, heading: f32) {
        self.heading = heading.rem_euclid(360.0);
    }
}

impl Default for WanderState {
    fn default() -> Self {
        Self::new(0.0, &SteeringConfig::default())
    }
}

/// Drift the heading a little, then seek a random point on the circle ahead.
pub fn wander<R: Rng>(state: &mut WanderState, position: Vec2, max_speed: f32, rng: &mut R) -> Vec2 {
    if state.jitter > 0.0 {
        state.heading = (state.heading + rng.gen_range(-state.jitter..=state.jitter)).rem_euclid(360.0);
    }
    let center = position + Vec2::from_angle_degrees(state.heading) * state.distance;
    let on_circle = center + Vec2::from_angle_degrees(rng.gen_range(0.0..360.0)) * state.radius;
    seek(position, on_circle, max_speed)
}

/// Weighted sum renormalized to `max_speed`; zero on zero weight or a cancelled sum.
pub fn blend(samples: &[(Vec2, f32)], max_speed: f32) -> Vec2 {
    let mut total_weight = 0.0;
    let mut sum = Vec2::ZERO;
    for (vector, weight) in samples {
        if !weight.is_finite() || !vector.is_finite() {
            continue;
        }
        total_weight += weight.abs();
        sum += *vector * *weight;
    }

    if total_weight <= 0.0 {
        return Vec2::ZERO;
    }
    sum.normalize_or_zero() * max_speed.max(0.0)
}

/// Steering primitives bound to one agent's speed and avoidance tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringController {
    pub max_speed: f32,
    pub slowing_radius: f32,
    pub avoidance: AvoidanceParams,
}

impl SteeringController {
    pub fn new(config: &SteeringConfig) -> Self {
        Self {
            max_speed: config.max_speed,
            slowing_radius: config.slowing_radius,
            avoidance: AvoidanceParams::from(config),
        }
    }

    pub fn seek(&self, position: Vec2, target: Vec2) -> Vec2 {
        seek(position, target, self.max_speed)
    }

    pub fn arrive(&self, position: Vec2, target: Vec2) -> Vec2 {
        arrive(position, target, self.max_speed, self.slowing_radius)
    }

    pub fn avoid(&self, position: Vec2, velocity: Vec2, obstacles: &[Obstacle]) -> Vec2 {
        avoid_obstacles(position, velocity, &self.avoidance, obstacles, self.max_speed)
    }

    pub fn wander<R: Rng>(&self, state: &mut WanderState, position: Vec2, rng: &mut R) -> Vec2 {
        wander(state, position, self.max_speed, rng)
    }

    pub fn blend(&self, samples: &[(Vec2, f32)]) -> Vec2 {
        blend(samples, self.max_speed)
    }

    /// Bound any vector to this controller's speed.
    pub fn limit(&self, velocity: Vec2) -> Vec2 {
        velocity.clamp_length(self.max_speed)
    }
}

impl Default for SteeringController {
    fn default() -> Self {
        Self::new(&SteeringConfig::default())
    }
}
