//! Broadcast Events
//!
//! Events emitted by the navigation substrate for the dialogue layer and for
//! other agents' gradient stores.

use serde::{Deserialize, Serialize};

use crate::{ClaimBearing, Polarity, ResourceType, SpatialClaim, Vec2};

/// An agent announcing where a resource is (or no longer is)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryBroadcast {
    pub resource: ResourceType,
    /// Bearing from `origin` in degrees, counter-clockwise from east
    pub bearing_degrees: f32,
    pub distance: f32,
    pub polarity: Polarity,
    /// Where the speaker stood when broadcasting
    pub origin: Vec2,
}

impl DiscoveryBroadcast {
    /// Describe `location` as seen from `origin`.
    pub fn describe(resource: ResourceType, origin: Vec2, location: Vec2, polarity: Polarity) -> Self {
        let offset = location - origin;
        Self {
            resource,
            bearing_degrees: offset.angle_degrees(),
            distance: offset.length(),
            polarity,
            origin,
        }
    }

    /// Estimated world location of the resource.
    pub fn location(&self) -> Vec2 {
        self.origin + Vec2::from_angle_degrees(self.bearing_degrees) * self.distance
    }

    /// The structured claim a listener hears from this broadcast.
    pub fn to_claim(&self, speaker_id: impl Into<String>, tick: u64) -> SpatialClaim {
        SpatialClaim {
            source_id: speaker_id.into(),
            resource: Some(self.resource),
            bearing: Some(ClaimBearing::Degrees(self.bearing_degrees)),
            distance: Some(self.distance),
            polarity: Some(self.polarity),
            certainty: 1.0,
            origin: Some(self.origin),
            tick,
        }
    }
}

/// An agent announcing whether a claim it followed held up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationBroadcast {
    /// Agent whose claim was checked
    pub source_id: String,
    pub resource: ResourceType,
    pub confirmed: bool,
    /// Failure category when not confirmed (e.g. "false_report")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Emitted navigation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum NavEvent {
    Discovery(DiscoveryBroadcast),
    Verification(VerificationBroadcast),
}

/// A navigation event with its emitter and tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique identifier (e.g., "evt_00000042")
    pub event_id: String,
    pub tick: u64,
    /// Emitting agent
    pub agent_id: String,
    pub event: NavEvent,
}

impl EventRecord {
    pub fn new(event_id: impl Into<String>, tick: u64, agent_id: impl Into<String>, event: NavEvent) -> Self {
        Self {
            event_id: event_id.into(),
            tick,
            agent_id: agent_id.into(),
            event,
        }
    }

    /// Serializes the record to a JSON line (for JSONL format).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a record from a JSON line.
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Generates an event ID with the given sequence number.
pub fn generate_event_id(sequence: u64) -> String {
    format!("evt_{:08}", sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_and_locate() {
        let origin = Vec2::new(10.0, 10.0);
        let location = Vec2::new(13.0, 14.0);
        let broadcast = DiscoveryBroadcast::describe(ResourceType::Stone, origin, location, Polarity::Discovery);

        assert!((broadcast.distance - 5.0).abs() < 1e-5);
        assert!(broadcast.location().distance(location) < 1e-4);
    }

    #[test]
    fn test_to_claim_carries_origin() {
        let broadcast = DiscoveryBroadcast::describe(
            ResourceType::Wood,
            Vec2::new(1.0, 2.0),
            Vec2::new(1.0, 12.0),
            Polarity::Depleted,
        );
        let claim = broadcast.to_claim("agent_0003", 77);

        assert_eq!(claim.source_id, "agent_0003");
        assert_eq!(claim.origin, Some(Vec2::new(1.0, 2.0)));
        assert_eq!(claim.polarity, Some(Polarity::Depleted));
        assert_eq!(claim.tick, 77);
    }

    #[test]
    fn test_event_record_jsonl() {
        let record = EventRecord::new(
            generate_event_id(42),
            9,
            "agent_0001",
            NavEvent::Verification(VerificationBroadcast {
                source_id: "agent_0002".to_string(),
                resource: ResourceType::Food,
                confirmed: false,
                failure: Some("false_report".to_string()),
            }),
        );

        let line = record.to_jsonl().unwrap();
        assert!(line.contains(r#""event_type":"verification""#));
        assert_eq!(record.event_id, "evt_00000042");

        let parsed = EventRecord::from_jsonl(&line).unwrap();
        assert_eq!(parsed, record);
    }
}
