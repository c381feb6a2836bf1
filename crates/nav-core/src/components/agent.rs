//! Agent Components
//!
//! Components for individual navigating agents.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use nav_events::Vec2;

use crate::orchestrator::NavAgent;
use crate::social::{SocialGradientStore, TrustLedger};

/// Unique identifier for an agent
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Zero-padded id in the form "agent_0007".
    pub fn numbered(n: usize) -> Self {
        AgentId(format!("agent_{:04}", n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Component: an agent's world position, owned by the movement subsystem
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position(pub Vec2);

/// Component: an agent's current velocity in world units per tick
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity(pub Vec2);

/// Component: how truthful an agent's broadcasts are, 0.0 (liar) to 1.0
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Honesty(pub f32);

impl Default for Honesty {
    fn default() -> Self {
        Honesty(1.0)
    }
}

impl Honesty {
    pub fn is_dishonest(&self) -> bool {
        self.0 < 0.5
    }
}

/// Everything an entity needs to take part in navigation
#[derive(Bundle)]
pub struct NavAgentBundle {
    pub id: AgentId,
    pub position: Position,
    pub velocity: Velocity,
    pub nav: NavAgent,
    pub gradients: SocialGradientStore,
    pub trust: TrustLedger,
    pub honesty: Honesty,
}

impl NavAgentBundle {
    pub fn new(id: AgentId, position: Vec2, gradients: SocialGradientStore, trust: TrustLedger) -> Self {
        Self {
            id,
            position: Position(position),
            velocity: Velocity::default(),
            nav: NavAgent::default(),
            gradients,
            trust,
            honesty: Honesty::default(),
        }
    }

    pub fn with_honesty(mut self, honesty: f32) -> Self {
        self.honesty = Honesty(honesty.clamp(0.0, 1.0));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_ids() {
        assert_eq!(AgentId::numbered(7).as_str(), "agent_0007");
        assert_eq!(AgentId::numbered(1234).0, "agent_1234");
    }

    #[test]
    fn test_honesty_threshold() {
        assert!(!Honesty::default().is_dishonest());
        assert!(Honesty(0.1).is_dishonest());
    }
}
