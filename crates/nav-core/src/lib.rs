//! Swarm Navigation Substrate
//!
//! Movement and coordination for many autonomous agents foraging in a
//! continuous 2D world: shared flow fields over a coarse grid, steering
//! primitives, per-agent social gradients and trust, verification of what
//! agents tell each other, and the state machine that composes them into
//! one velocity per agent per tick.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;

pub mod components;
pub mod config;
pub mod events;
pub mod field;
pub mod orchestrator;
pub mod setup;
pub mod social;
pub mod steering;
pub mod systems;
pub mod telemetry;
pub mod verification;

pub use components::*;
pub use config::{ConfigError, NavConfig, NavSettings};
pub use field::{FieldKind, FlowField, FlowFieldCache};
pub use orchestrator::{AgentNavMut, NavAgent, NavContext, NavDecision, NavGoal, NavNotice, NavState, NavigationOrchestrator};
pub use setup::create_world;
pub use social::{GradientRecord, SocialGradientStore, SpatialClaimParser, TrustLedger};
pub use steering::SteeringController;
pub use telemetry::{get_active_gradients, get_trust, nav_snapshot, NavStats, SnapshotGenerator};
pub use verification::{VerificationFailure, VerificationService};

/// Seeded random number generator resource
#[derive(Resource)]
pub struct SimRng(pub SmallRng);
