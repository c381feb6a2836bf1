//! Resource Types
//!
//! The closed set of resource kinds agents forage for.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A foraged resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Wood,
    Stone,
    Food,
    Water,
    Fiber,
}

impl ResourceType {
    /// Returns all resource variants.
    pub fn all() -> &'static [ResourceType] {
        &[
            ResourceType::Wood,
            ResourceType::Stone,
            ResourceType::Food,
            ResourceType::Water,
            ResourceType::Fiber,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Wood => "wood",
            ResourceType::Stone => "stone",
            ResourceType::Food => "food",
            ResourceType::Water => "water",
            ResourceType::Fiber => "fiber",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a resource name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownResource(pub String);

impl fmt::Display for UnknownResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown resource type: {}", self.0)
    }
}

impl std::error::Error for UnknownResource {}

impl FromStr for ResourceType {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::all()
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownResource(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_round_trip_names() {
        for resource in ResourceType::all() {
            assert_eq!(resource.as_str().parse::<ResourceType>().unwrap(), *resource);
        }
        assert_eq!(" Wood ".parse::<ResourceType>().unwrap(), ResourceType::Wood);
        assert!("gold".parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_resource_serialization() {
        assert_eq!(serde_json::to_string(&ResourceType::Fiber).unwrap(), r#""fiber""#);
        assert_eq!(
            serde_json::from_str::<ResourceType>(r#""water""#).unwrap(),
            ResourceType::Water
        );
    }
}
