//! Spatial Claim Parser
//!
//! Turns an already-structured claim into a gradient record relative to the
//! listener. Free text never reaches this module. Anything missing or
//! ambiguous is rejected rather than guessed at.

use thiserror::Error;

use nav_events::{ClaimBearing, Polarity, SpatialClaim, Vec2};

use super::gradient::GradientRecord;
use crate::config::SocialConfig;

/// Why a claim could not become a gradient record
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ClaimParseFailure {
    #[error("claim names no resource")]
    MissingResource,
    #[error("claim has no bearing")]
    MissingBearing,
    #[error("bearing {0} is not a finite angle")]
    InvalidBearing(f32),
    #[error("claim has no distance estimate")]
    MissingDistance,
    #[error("distance {0} is negative or not finite")]
    InvalidDistance(f32),
    #[error("claim has no polarity")]
    MissingPolarity,
    #[error("certainty {0} is not finite")]
    InvalidCertainty(f32),
    #[error("claim origin or listener position is not finite")]
    InvalidPosition,
}

/// Stateless claim-to-record conversion
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialClaimParser {
    base_strength: f32,
    cardinal_confidence_factor: f32,
}

impl SpatialClaimParser {
    pub fn new(config: &SocialConfig) -> Self {
        Self {
            base_strength: config.base_strength.abs(),
            cardinal_confidence_factor: config.cardinal_confidence_factor.clamp(0.0, 1.0),
        }
    }

    /// Parse a claim heard at `listener` on `tick`, reporting why it failed.
    ///
    /// The claimed location is `origin + bearing * distance`, with the
    /// listener standing in for a missing origin. The record's direction
    /// points from the listener to that location.
    pub fn try_parse(
        &self,
        claim: &SpatialClaim,
        listener: Vec2,
        tick: u64,
    ) -> Result<GradientRecord, ClaimParseFailure> {
        let resource = claim.resource.ok_or(ClaimParseFailure::MissingResource)?;

        let bearing = claim.bearing.ok_or(ClaimParseFailure::MissingBearing)?;
        let degrees = bearing.degrees();
        if !degrees.is_finite() {
            return Err(ClaimParseFailure::InvalidBearing(degrees));
        }

        let distance = claim.distance.ok_or(ClaimParseFailure::MissingDistance)?;
        if !distance.is_finite() || distance < 0.0 {
            return Err(ClaimParseFailure::InvalidDistance(distance));
        }

        let polarity = claim.polarity.ok_or(ClaimParseFailure::MissingPolarity)?;

        if !claim.certainty.is_finite() {
            return Err(ClaimParseFailure::InvalidCertainty(claim.certainty));
        }

        let from = claim.origin.unwrap_or(listener);
        if !from.is_finite() || !listener.is_finite() {
            return Err(ClaimParseFailure::InvalidPosition);
        }

        let bearing_direction = Vec2::from_angle_degrees(degrees);
        let target = from + bearing_direction * distance;
        let offset = target - listener;
        let direction = match offset.normalize_or_zero() {
            d if d.is_zero() => bearing_direction,
            d => d,
        };

        let strength = match polarity {
            Polarity::Discovery => self.base_strength,
            Polarity::Depleted => -self.base_strength,
        };

        let mut confidence = claim.certainty.clamp(0.0, 1.0);
        if matches!(bearing, ClaimBearing::Cardinal(_)) {
            confidence *= self.cardinal_confidence_factor;
        }

        Ok(GradientRecord::new(
            resource,
            claim.source_id.clone(),
            direction,
            strength,
            confidence,
            tick,
        )
        .located_at(target, offset.length()))
    }

    /// Parse a claim, or `None` when it is malformed.
    pub fn parse(&self, claim: &SpatialClaim, listener: Vec2, tick: u64) -> Option<GradientRecord> {
        match self.try_parse(claim, listener, tick) {
            Ok(record) => Some(record),
            Err(failure) => {
                tracing::trace!("Dropped claim from {}: {}", claim.source_id, failure);
                None
            }
        }
    }
}

impl Default for SpatialClaimParser {
    fn default() -> Self {
        Self::new(&SocialConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_events::{fixtures, Cardinal, ResourceType};

    const EPS: f32 = 1e-4;

    #[test]
    fn test_bearing_45_at_origin() {
        let parser = SpatialClaimParser::default();
        let record = parser.parse(&fixtures::wood_discovery(3), Vec2::ZERO, 3).unwrap();

        let expected = Vec2::from_angle_degrees(45.0);
        assert!((record.direction.x - expected.x).abs() < EPS);
        assert!((record.direction.y - expected.y).abs() < EPS);
        assert!(record.strength > 0.0);
        assert_eq!(record.resource, ResourceType::Wood);
        assert!((record.distance - 30.0).abs() < EPS);
        assert_eq!(record.learned_tick, 3);
    }

    #[test]
    fn test_depleted_is_negative() {
        let parser = SpatialClaimParser::default();
        let record = parser.parse(&fixtures::wood_depleted(3), Vec2::ZERO, 3).unwrap();
        assert!(record.strength < 0.0);
    }

    #[test]
    fn test_malformed_claims_yield_nothing() {
        let parser = SpatialClaimParser::default();
        for claim in fixtures::malformed_claims(0) {
            assert!(parser.parse(&claim, Vec2::ZERO, 0).is_none(), "accepted {:?}", claim);
        }
    }

    #[test]
    fn test_failure_reasons() {
        let parser = SpatialClaimParser::default();
        let malformed = fixtures::malformed_claims(0);

        assert_eq!(
            parser.try_parse(&malformed[0], Vec2::ZERO, 0),
            Err(ClaimParseFailure::MissingResource)
        );
        assert_eq!(
            parser.try_parse(&malformed[3], Vec2::ZERO, 0),
            Err(ClaimParseFailure::MissingPolarity)
        );
        assert!(matches!(
            parser.try_parse(&malformed[5], Vec2::ZERO, 0),
            Err(ClaimParseFailure::InvalidDistance(_))
        ));
    }

    #[test]
    fn test_origin_is_relative_to_speaker() {
        let parser = SpatialClaimParser::default();
        // Speaker at (10, 0) says "10 units north"; listener stands at the origin.
        let claim = SpatialClaim::discovery("agent_0001", ResourceType::Stone, 90.0, 10.0, 0)
            .with_origin(Vec2::new(10.0, 0.0));
        let record = parser.parse(&claim, Vec2::ZERO, 0).unwrap();

        assert!(record.target.distance(Vec2::new(10.0, 10.0)) < EPS);
        let expected = Vec2::new(1.0, 1.0).normalize_or_zero();
        assert!(record.direction.distance(expected) < EPS);
        assert!((record.distance - 200f32.sqrt()).abs() < EPS);
    }

    #[test]
    fn test_listener_on_target_keeps_bearing() {
        let parser = SpatialClaimParser::default();
        let claim = SpatialClaim::discovery("agent_0001", ResourceType::Food, 180.0, 0.0, 0);
        let record = parser.parse(&claim, Vec2::new(4.0, 4.0), 0).unwrap();
        assert!(record.direction.distance(Vec2::new(-1.0, 0.0)) < EPS);
    }

    #[test]
    fn test_cardinal_claims_are_less_certain() {
        let parser = SpatialClaimParser::default();
        let precise = SpatialClaim::discovery("agent_0001", ResourceType::Water, 90.0, 12.0, 0);
        let coarse = precise.clone().with_bearing(ClaimBearing::Cardinal(Cardinal::North));

        let precise = parser.parse(&precise, Vec2::ZERO, 0).unwrap();
        let coarse = parser.parse(&coarse, Vec2::ZERO, 0).unwrap();
        assert!(coarse.confidence() < precise.confidence());
        assert!(coarse.direction.distance(precise.direction) < EPS);
    }

    #[test]
    fn test_certainty_is_clamped() {
        let parser = SpatialClaimParser::default();
        let claim = fixtures::wood_discovery(0).with_certainty(4.0);
        assert_eq!(parser.parse(&claim, Vec2::ZERO, 0).unwrap().confidence(), 1.0);
    }
}
