//! World Components
//!
//! Obstacles, resource deposits and the settlement, as provided by the
//! physics and world collaborators. Navigation only reads them.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use nav_events::{ResourceType, Vec2};

/// A solid circular obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub center: Vec2,
    pub radius: f32,
}

impl Obstacle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.center.distance(point) <= self.radius
    }

    /// Distance from a point to the obstacle surface, zero when inside.
    pub fn surface_distance(&self, point: Vec2) -> f32 {
        (self.center.distance(point) - self.radius).max(0.0)
    }
}

/// Resource: every static obstacle in the world
#[derive(Resource, Debug, Clone, Default)]
pub struct ObstacleSet {
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleSet {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    /// Push a point out of any obstacle it ended up inside.
    pub fn resolve(&self, point: Vec2) -> Vec2 {
        let mut resolved = point;
        for obstacle in &self.obstacles {
            if obstacle.contains(resolved) {
                let away = (resolved - obstacle.center).normalize_or_zero();
                let away = if away.is_zero() { Vec2::new(1.0, 0.0) } else { away };
                resolved = obstacle.center + away * (obstacle.radius + 0.01);
            }
        }
        resolved
    }
}

/// A resource seen at a location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSighting {
    pub resource: ResourceType,
    pub position: Vec2,
}

/// Read access to what is actually in the world
pub trait GroundTruth {
    /// Resources within `radius` of `center`.
    fn resources_within(&self, center: Vec2, radius: f32) -> Vec<ResourceSighting>;
}

/// A harvestable deposit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceDeposit {
    pub resource: ResourceType,
    pub position: Vec2,
    pub amount: u32,
}

/// Resource: all deposits, the demo world's ground truth
#[derive(Resource, Debug, Clone, Default)]
pub struct ResourceMap {
    pub deposits: Vec<ResourceDeposit>,
}

impl ResourceMap {
    pub fn new(deposits: Vec<ResourceDeposit>) -> Self {
        Self { deposits }
    }

    /// Take one unit from the nearest non-empty deposit of `resource` within `radius`.
    pub fn harvest(&mut self, resource: ResourceType, near: Vec2, radius: f32) -> bool {
        let nearest = self
            .deposits
            .iter_mut()
            .filter(|d| d.resource == resource && d.amount > 0 && d.position.distance(near) <= radius)
            .min_by(|a, b| a.position.distance(near).total_cmp(&b.position.distance(near)));

        match nearest {
            Some(deposit) => {
                deposit.amount -= 1;
                true
            }
            None => false,
        }
    }
}

impl GroundTruth for ResourceMap {
    fn resources_within(&self, center: Vec2, radius: f32) -> Vec<ResourceSighting> {
        self.deposits
            .iter()
            .filter(|d| d.amount > 0 && d.position.distance(center) <= radius)
            .map(|d| ResourceSighting {
                resource: d.resource,
                position: d.position,
            })
            .collect()
    }
}

/// Resource: the settlement agents return home to
#[derive(Resource, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub center: Vec2,
}

/// Resource: the world tick counter
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimClock {
    pub tick: u64,
}

impl SimClock {
    pub fn advance(&mut self) {
        self.tick += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obstacle_geometry() {
        let rock = Obstacle::new(Vec2::new(0.0, 0.0), 2.0);
        assert!(rock.contains(Vec2::new(1.0, 1.0)));
        assert!(!rock.contains(Vec2::new(3.0, 0.0)));
        assert!((rock.surface_distance(Vec2::new(5.0, 0.0)) - 3.0).abs() < 1e-6);
        assert_eq!(rock.surface_distance(Vec2::new(0.5, 0.0)), 0.0);
    }

    #[test]
    fn test_resolve_pushes_out() {
        let set = ObstacleSet::new(vec![Obstacle::new(Vec2::new(0.0, 0.0), 2.0)]);
        let resolved = set.resolve(Vec2::new(1.0, 0.0));
        assert!(resolved.x > 2.0);
        assert_eq!(set.resolve(Vec2::new(5.0, 5.0)), Vec2::new(5.0, 5.0));
    }

    #[test]
    fn test_ground_truth_and_harvest() {
        let mut map = ResourceMap::new(vec![
            ResourceDeposit {
                resource: ResourceType::Wood,
                position: Vec2::new(10.0, 10.0),
                amount: 1,
            },
            ResourceDeposit {
                resource: ResourceType::Stone,
                position: Vec2::new(40.0, 40.0),
                amount: 5,
            },
        ]);

        let seen = map.resources_within(Vec2::new(9.0, 9.0), 3.0);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].resource, ResourceType::Wood);

        assert!(map.harvest(ResourceType::Wood, Vec2::new(9.0, 9.0), 3.0));
        assert!(!map.harvest(ResourceType::Wood, Vec2::new(9.0, 9.0), 3.0));
        assert!(map.resources_within(Vec2::new(9.0, 9.0), 3.0).is_empty());
    }
}
