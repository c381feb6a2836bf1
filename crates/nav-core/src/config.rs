//! Configuration System
//!
//! Loads navigation tuning parameters from a TOML file so blend ratios,
//! penalties and horizons can be adjusted without recompiling. Every section
//! falls back to its defaults when omitted.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default tuning file path
pub const DEFAULT_TUNING_PATH: &str = "tuning.toml";

/// Complete navigation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub fields: FieldConfig,
    #[serde(default)]
    pub steering: SteeringConfig,
    #[serde(default)]
    pub blend: BlendConfig,
    #[serde(default)]
    pub social: SocialConfig,
    #[serde(default)]
    pub trust: TrustConfig,
    #[serde(default)]
    pub stuck: StuckConfig,
    #[serde(default)]
    pub perception: PerceptionConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl NavConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes the configuration as pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads configuration from `path`, or uses defaults if it cannot be read.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::from_file(path).unwrap_or_else(|e| {
            tracing::warn!("Could not load {}: {}. Using defaults.", path.display(), e);
            Self::default()
        })
    }
}

/// Coarse navigation grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Grid width in cells
    pub width: u32,
    /// Grid height in cells
    pub height: u32,
    /// World units per cell
    pub cell_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 48,
            height: 48,
            cell_size: 4.0,
        }
    }
}

/// Flow field regeneration policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Settlement centre must move this far before the home field is rebuilt
    pub home_move_threshold: f32,
    /// Ticks between dispersion field rebuilds
    pub dispersion_interval: u64,
    /// Most fields rebuilt in one scheduling slot
    pub max_regenerations_per_tick: usize,
    /// A cell is uncrowded when its 3x3 neighbourhood holds at most this many agents
    pub crowd_threshold: u32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            home_move_threshold: 8.0,
            dispersion_interval: 10,
            max_regenerations_per_tick: 2,
            crowd_threshold: 1,
        }
    }
}

/// Steering limits and radii.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    pub max_speed: f32,
    /// Distance inside which `arrive` decelerates
    pub slowing_radius: f32,
    /// Distance to an explicit target at which seeking hands over to arriving
    pub arrival_radius: f32,
    /// Distance at which an arrival counts as reached
    pub verify_radius: f32,
    /// How far ahead obstacle avoidance projects
    pub look_ahead: f32,
    /// Obstacles closer than this to the projected point repel
    pub threat_radius: f32,
    /// Distance of the wander circle ahead of the agent
    pub wander_distance: f32,
    pub wander_radius: f32,
    /// Largest heading change per tick while wandering, in degrees
    pub wander_jitter_degrees: f32,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            max_speed: 1.5,
            slowing_radius: 6.0,
            arrival_radius: 8.0,
            verify_radius: 1.0,
            look_ahead: 4.0,
            threat_radius: 3.0,
            wander_distance: 4.0,
            wander_radius: 2.0,
            wander_jitter_degrees: 15.0,
        }
    }
}

/// Weights used when composing a movement decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    /// Exploration field share while searching without a usable field
    pub exploration: f32,
    /// Dispersion field share while searching without a usable field
    pub dispersion: f32,
    /// Share of the combined field vector against the social gradient
    pub field: f32,
    /// Share of the blended social gradient
    pub social: f32,
    /// Weight of obstacle avoidance
    pub avoidance: f32,
    /// Weight of wandering while exploring
    pub wander: f32,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            exploration: 0.6,
            dispersion: 0.3,
            field: 0.7,
            social: 0.3,
            avoidance: 1.0,
            wander: 0.4,
        }
    }
}

/// Social gradient exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    /// Records kept per resource type
    pub capacity: usize,
    /// Age in ticks at which a record stops contributing
    pub horizon: u64,
    /// Magnitude of record strength (sign comes from polarity)
    pub base_strength: f32,
    /// Confidence multiplier for compass-direction claims
    pub cardinal_confidence_factor: f32,
    /// Blend magnitude at which an idle agent adopts a search
    pub activation_threshold: f32,
    /// Broadcasts reach agents within this distance
    pub hearing_radius: f32,
    /// Radius of avoidance zones derived from depletion reports
    pub avoidance_radius: f32,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            horizon: 200,
            base_strength: 1.0,
            cardinal_confidence_factor: 0.8,
            activation_threshold: 0.25,
            hearing_radius: 30.0,
            avoidance_radius: 6.0,
        }
    }
}

/// Trust ledger updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Score for an agent never verified
    pub neutral: f32,
    /// Increment for a confirmed claim
    pub success_delta: f32,
    pub stale_penalty: f32,
    pub misidentified_penalty: f32,
    pub false_report_penalty: f32,
    pub unreliable_penalty: f32,
    /// Claims older than this are judged stale rather than false
    pub freshness_threshold: u64,
    /// Prior false reports within the window that mark a source unreliable
    pub pattern_threshold: usize,
    pub pattern_window: u64,
    /// Outcomes remembered per subject
    pub history_len: usize,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            neutral: 0.5,
            success_delta: 0.1,
            stale_penalty: 0.02,
            misidentified_penalty: 0.08,
            false_report_penalty: 0.15,
            unreliable_penalty: 0.3,
            freshness_threshold: 120,
            pattern_threshold: 3,
            pattern_window: 1000,
            history_len: 16,
        }
    }
}

/// Stuck detection and recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StuckConfig {
    /// Ticks of insufficient progress before an agent counts as stuck
    pub window: u64,
    /// Displacement over the window that counts as progress
    pub min_displacement: f32,
    /// Consecutive stuck episodes before the goal is abandoned
    pub max_retries: u32,
    /// Detour targets are picked within this distance
    pub retarget_radius: f32,
}

impl Default for StuckConfig {
    fn default() -> Self {
        Self {
            window: 20,
            min_displacement: 1.0,
            max_retries: 3,
            retarget_radius: 10.0,
        }
    }
}

/// What an agent can see of the ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    pub radius: f32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self { radius: 6.0 }
    }
}

/// Demo simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub default_ticks: u64,
    pub snapshot_interval: u64,
    pub agents: usize,
    pub deposits_per_resource: usize,
    pub obstacles: usize,
    /// Fraction of agents that spread fabricated discoveries
    pub dishonest_fraction: f32,
    /// Chance per tick that a dishonest agent spreads a rumor
    pub rumor_chance: f32,
    /// Mean ticks an idle agent waits before the scripted decision layer gives it a goal
    pub idle_patience: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_ticks: 1000,
            snapshot_interval: 100,
            agents: 24,
            deposits_per_resource: 4,
            obstacles: 30,
            dishonest_fraction: 0.15,
            rumor_chance: 0.02,
            idle_patience: 15,
        }
    }
}

/// Resource: the configuration the running world was built from
#[derive(Resource, Debug, Clone, Default)]
pub struct NavSettings(pub NavConfig);

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
