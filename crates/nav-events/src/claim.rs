//! Structured Spatial Claims
//!
//! Directional claims about resources as handed over by the dialogue layer.
//! Free text never reaches the navigation substrate; a claim arrives already
//! split into fields, any of which may be missing when the speaker was vague.

use serde::{Deserialize, Serialize};

use crate::{ResourceType, Vec2};

/// Compass direction used in coarse claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinal {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Cardinal {
    /// Bearing in degrees, counter-clockwise from east.
    pub fn degrees(&self) -> f32 {
        match self {
            Cardinal::East => 0.0,
            Cardinal::NorthEast => 45.0,
            Cardinal::North => 90.0,
            Cardinal::NorthWest => 135.0,
            Cardinal::West => 180.0,
            Cardinal::SouthWest => 225.0,
            Cardinal::South => 270.0,
            Cardinal::SouthEast => 315.0,
        }
    }

    /// Nearest compass direction for a bearing in degrees.
    pub fn from_degrees(degrees: f32) -> Cardinal {
        let normalized = degrees.rem_euclid(360.0);
        let sector = ((normalized + 22.5) / 45.0).floor() as i32 % 8;
        match sector {
            0 => Cardinal::East,
            1 => Cardinal::NorthEast,
            2 => Cardinal::North,
            3 => Cardinal::NorthWest,
            4 => Cardinal::West,
            5 => Cardinal::SouthWest,
            6 => Cardinal::South,
            _ => Cardinal::SouthEast,
        }
    }
}

/// How the speaker expressed direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum ClaimBearing {
    /// Exact bearing in degrees
    Degrees(f32),
    /// Coarse compass direction
    Cardinal(Cardinal),
}

impl ClaimBearing {
    pub fn degrees(&self) -> f32 {
        match self {
            ClaimBearing::Degrees(d) => *d,
            ClaimBearing::Cardinal(c) => c.degrees(),
        }
    }
}

/// Whether the claim advertises or retracts a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// "There is wood to the north-east"
    Discovery,
    /// "The wood to the north-east is gone" / dead-end report
    Depleted,
}

/// A structured directional claim from one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialClaim {
    /// Agent making the claim
    pub source_id: String,
    pub resource: Option<ResourceType>,
    pub bearing: Option<ClaimBearing>,
    /// Distance estimate in world units
    pub distance: Option<f32>,
    pub polarity: Option<Polarity>,
    /// How sure the speaker sounded, 0.0 to 1.0
    #[serde(default = "default_certainty")]
    pub certainty: f32,
    /// Where the speaker stood; the listener's own position is assumed when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Vec2>,
    /// Tick at which the claim was heard
    pub tick: u64,
}

fn default_certainty() -> f32 {
    1.0
}

impl SpatialClaim {
    /// A fully specified claim with an exact bearing.
    pub fn discovery(
        source_id: impl Into<String>,
        resource: ResourceType,
        bearing_degrees: f32,
        distance: f32,
        tick: u64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            resource: Some(resource),
            bearing: Some(ClaimBearing::Degrees(bearing_degrees)),
            distance: Some(distance),
            polarity: Some(Polarity::Discovery),
            certainty: 1.0,
            origin: None,
            tick,
        }
    }

    /// A fully specified depletion report with an exact bearing.
    pub fn depleted(
        source_id: impl Into<String>,
        resource: ResourceType,
        bearing_degrees: f32,
        distance: f32,
        tick: u64,
    ) -> Self {
        Self {
            polarity: Some(Polarity::Depleted),
            ..Self::discovery(source_id, resource, bearing_degrees, distance, tick)
        }
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_certainty(mut self, certainty: f32) -> Self {
        self.certainty = certainty;
        self
    }

    pub fn with_bearing(mut self, bearing: ClaimBearing) -> Self {
        self.bearing = Some(bearing);
        self
    }
}
