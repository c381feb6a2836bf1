//! Sample claims for testing.
//!
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! ```ignore
//! // [dev-dependencies]
//! // nav-events = { path = "../nav-events", features = ["test-fixtures"] }
//!
//! use nav_events::fixtures;
//!
//! let claims = fixtures::sample_claims();
//! ```

use crate::{Cardinal, ClaimBearing, Polarity, ResourceType, SpatialClaim, Vec2};

/// A well-formed discovery: wood 30 units away at 45 degrees.
pub fn wood_discovery(tick: u64) -> SpatialClaim {
    SpatialClaim::discovery("agent_scout", ResourceType::Wood, 45.0, 30.0, tick)
}

/// A depletion report for the same location as [`wood_discovery`].
pub fn wood_depleted(tick: u64) -> SpatialClaim {
    SpatialClaim::depleted("agent_scout", ResourceType::Wood, 45.0, 30.0, tick)
}

/// A coarse, hedged claim using a compass direction.
pub fn hedged_water_claim(tick: u64) -> SpatialClaim {
    SpatialClaim::discovery("agent_herder", ResourceType::Water, 0.0, 12.0, tick)
        .with_bearing(ClaimBearing::Cardinal(Cardinal::North))
        .with_certainty(0.6)
        .with_origin(Vec2::new(5.0, 5.0))
}

/// Claims the parser must reject: each lacks one required field.
pub fn malformed_claims(tick: u64) -> Vec<SpatialClaim> {
    let base = wood_discovery(tick);
    vec![
        SpatialClaim { resource: None, ..base.clone() },
        SpatialClaim { bearing: None, ..base.clone() },
        SpatialClaim { distance: None, ..base.clone() },
        SpatialClaim { polarity: None, ..base.clone() },
        SpatialClaim { bearing: Some(ClaimBearing::Degrees(f32::NAN)), ..base.clone() },
        SpatialClaim { distance: Some(-4.0), ..base.clone() },
        SpatialClaim { certainty: f32::NAN, ..base },
    ]
}

/// A mixed batch of valid claims.
pub fn sample_claims() -> Vec<SpatialClaim> {
    vec![
        wood_discovery(10),
        hedged_water_claim(12),
        SpatialClaim::discovery("agent_forager", ResourceType::Food, 200.0, 18.0, 14),
        SpatialClaim {
            polarity: Some(Polarity::Depleted),
            ..SpatialClaim::discovery("agent_forager", ResourceType::Stone, 300.0, 9.0, 15)
        },
    ]
}
