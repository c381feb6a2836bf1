//! Social Gradient Store
//!
//! Per-agent beliefs about where resources are (or are not), learned from
//! other agents' claims. Records are immutable once stored: confidence is
//! fixed at creation and aging is computed from `learned_tick` at read time.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use nav_events::{GradientSnapshot, ResourceType, Vec2};

use super::trust::TrustLedger;
use crate::config::SocialConfig;

/// One agent's belief about a direction toward (or away from) a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientRecord {
    /// Assigned by the owning store on insertion
    pub record_id: u64,
    pub resource: ResourceType,
    /// Unit vector from the listener toward the claimed location
    pub direction: Vec2,
    /// Signed; negative means avoid
    pub strength: f32,
    /// Estimated distance from the listener to the claimed location
    pub distance: f32,
    confidence: f32,
    pub learned_tick: u64,
    /// Agent that made the claim
    pub source_id: String,
    /// Claimed world location
    pub target: Vec2,
}

impl GradientRecord {
    pub fn new(
        resource: ResourceType,
        source_id: impl Into<String>,
        direction: Vec2,
        strength: f32,
        confidence: f32,
        learned_tick: u64,
    ) -> Self {
        Self {
            record_id: 0,
            resource,
            direction: direction.normalize_or_zero(),
            strength,
            distance: 0.0,
            confidence: if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 },
            learned_tick,
            source_id: source_id.into(),
            target: Vec2::ZERO,
        }
    }

    pub fn located_at(mut self, target: Vec2, distance: f32) -> Self {
        self.target = target;
        self.distance = distance;
        self
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn is_avoidance(&self) -> bool {
        self.strength < 0.0
    }

    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.learned_tick)
    }
}

/// A short-lived region to stay away from, derived from a negative record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvoidanceZone {
    pub record_id: u64,
    pub resource: ResourceType,
    pub center: Vec2,
    pub radius: f32,
    pub learned_tick: u64,
    pub source_id: String,
}

impl AvoidanceZone {
    pub fn contains(&self, position: Vec2) -> bool {
        self.center.distance(position) <= self.radius
    }
}

/// Result of a trust-weighted read over one resource's records
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GradientBlend {
    /// Σ direction · weight, not normalized
    pub vector: Vec2,
    /// Records that took part (recency > 0)
    pub contributors: usize,
}

impl GradientBlend {
    pub fn direction(&self) -> Vec2 {
        self.vector.normalize_or_zero()
    }

    pub fn magnitude(&self) -> f32 {
        self.vector.length()
    }
}

/// Component: an agent's received gradient records
#[derive(Component, Debug, Clone, PartialEq)]
pub struct SocialGradientStore {
    capacity: usize,
    horizon: u64,
    avoidance_radius: f32,
    records: BTreeMap<ResourceType, Vec<GradientRecord>>,
    zones: Vec<AvoidanceZone>,
    next_record_id: u64,
}

impl SocialGradientStore {
    pub fn new(capacity: usize, horizon: u64, avoidance_radius: f32) -> Self {
        Self {
            capacity,
            horizon,
            avoidance_radius,
            records: BTreeMap::new(),
            zones: Vec::new(),
            next_record_id: 1,
        }
    }

    pub fn from_config(config: &SocialConfig) -> Self {
        Self::new(config.capacity, config.horizon, config.avoidance_radius)
    }

    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    /// `max(0, 1 - age / horizon)`; exactly zero once the horizon is reached.
    pub fn recency(&self, record: &GradientRecord, now: u64) -> f32 {
        if self.horizon == 0 {
            return 0.0;
        }
        let age = record.age(now);
        if age >= self.horizon {
            return 0.0;
        }
        (1.0 - age as f32 / self.horizon as f32).max(0.0)
    }

    /// Store a record, evicting the weakest one of the same resource when full.
    ///
    /// Returns the id assigned to the record, or `None` with zero capacity.
    pub fn insert(&mut self, mut record: GradientRecord, now: u64) -> Option<u64> {
        if self.capacity == 0 {
            return None;
        }

        record.record_id = self.next_record_id;
        self.next_record_id += 1;

        let len = self.records.get(&record.resource).map_or(0, Vec::len);
        if len >= self.capacity {
            self.evict_weakest(record.resource, now);
        }

        if record.is_avoidance() {
            self.zones.push(AvoidanceZone {
                record_id: record.record_id,
                resource: record.resource,
                center: record.target,
                radius: self.avoidance_radius,
                learned_tick: record.learned_tick,
                source_id: record.source_id.clone(),
            });
        }

        let id = record.record_id;
        self.records.entry(record.resource).or_default().push(record);
        Some(id)
    }

    fn evict_weakest(&mut self, resource: ResourceType, now: u64) {
        let Some(list) = self.records.get(&resource) else {
            return;
        };
        let weakest = list
            .iter()
            .enumerate()
            .map(|(i, r)| (i, r.confidence() * self.recency(r, now)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);

        if let Some(i) = weakest {
            if let Some(list) = self.records.get_mut(&resource) {
                let evicted = list.remove(i);
                self.zones.retain(|z| z.record_id != evicted.record_id);
                tracing::trace!("Evicted gradient {} from {}", evicted.record_id, evicted.source_id);
            }
        }
    }

    /// Drop every record and zone that has reached the horizon.
    pub fn prune(&mut self, now: u64) -> usize {
        let horizon = self.horizon;
        let live = |learned: u64| now.saturating_sub(learned) < horizon;

        let mut removed = 0;
        for list in self.records.values_mut() {
            let before = list.len();
            list.retain(|r| live(r.learned_tick));
            removed += before - list.len();
        }
        self.records.retain(|_, list| !list.is_empty());
        self.zones.retain(|z| live(z.learned_tick));
        removed
    }

    /// Every stored record of a resource, including aged-out ones not yet pruned.
    pub fn records(&self, resource: ResourceType) -> &[GradientRecord] {
        self.records.get(&resource).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Records of a resource that still carry weight.
    pub fn active(&self, resource: ResourceType, now: u64) -> Vec<&GradientRecord> {
        self.records(resource)
            .iter()
            .filter(|r| self.recency(r, now) > 0.0)
            .collect()
    }

    pub fn get(&self, record_id: u64) -> Option<&GradientRecord> {
        self.records
            .values()
            .flat_map(|list| list.iter())
            .find(|r| r.record_id == record_id)
    }

    /// Read-time weight: confidence · recency · trust(source) · strength.
    pub fn weight(&self, record: &GradientRecord, now: u64, trust: &TrustLedger) -> f32 {
        record.confidence() * self.recency(record, now) * trust.get(&record.source_id) * record.strength
    }

    /// Trust-weighted sum of a resource's active records.
    pub fn blend(&self, resource: ResourceType, now: u64, trust: &TrustLedger) -> GradientBlend {
        let mut blend = GradientBlend::default();
        for record in self.records(resource) {
            if self.recency(record, now) <= 0.0 {
                continue;
            }
            blend.vector += record.direction * self.weight(record, now, trust);
            blend.contributors += 1;
        }
        blend
    }

    /// The positive record with the greatest weight, if any.
    pub fn best_lead(&self, resource: ResourceType, now: u64, trust: &TrustLedger) -> Option<&GradientRecord> {
        self.records(resource)
            .iter()
            .filter(|r| r.strength > 0.0)
            .map(|r| (r, self.weight(r, now, trust)))
            .filter(|(_, w)| *w > 0.0)
            .fold(None, |best: Option<(&GradientRecord, f32)>, (r, w)| match best {
                Some((_, best_w)) if best_w >= w => best,
                _ => Some((r, w)),
            })
            .map(|(r, _)| r)
    }

    /// The resource whose blend is strongest, when it reaches `threshold`.
    pub fn strongest(&self, now: u64, trust: &TrustLedger, threshold: f32) -> Option<(ResourceType, GradientBlend)> {
        self.records
            .keys()
            .map(|resource| (*resource, self.blend(*resource, now, trust)))
            .filter(|(_, blend)| blend.magnitude() >= threshold && blend.magnitude() > 0.0)
            .fold(None, |best: Option<(ResourceType, GradientBlend)>, (r, b)| match best {
                Some((_, best_b)) if best_b.magnitude() >= b.magnitude() => best,
                _ => Some((r, b)),
            })
    }

    /// Drop one record and the avoidance zone it created, if any.
    pub fn remove(&mut self, record_id: u64) -> Option<GradientRecord> {
        let removed = self.records.values_mut().find_map(|list| {
            list.iter()
                .position(|r| r.record_id == record_id)
                .map(|i| list.remove(i))
        });
        if removed.is_some() {
            self.zones.retain(|z| z.record_id != record_id);
        }
        removed
    }

    /// Forget everything about one resource, zones included.
    pub fn clear_resource(&mut self, resource: ResourceType) -> usize {
        self.zones.retain(|z| z.resource != resource);
        self.records.remove(&resource).map_or(0, |list| list.len())
    }

    /// Live avoidance zones.
    pub fn zones(&self, now: u64) -> impl Iterator<Item = &AvoidanceZone> {
        let horizon = self.horizon;
        self.zones
            .iter()
            .filter(move |z| now.saturating_sub(z.learned_tick) < horizon)
    }

    /// Whether `position` lies in a live avoidance zone, for one resource or any.
    pub fn in_avoidance_zone(&self, position: Vec2, resource: Option<ResourceType>, now: u64) -> bool {
        self.zones(now)
            .any(|z| resource.map_or(true, |r| z.resource == r) && z.contains(position))
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self, now: u64) -> Vec<GradientSnapshot> {
        self.records
            .values()
            .flat_map(|list| list.iter())
            .filter(|r| self.recency(r, now) > 0.0)
            .map(|r| GradientSnapshot {
                record_id: r.record_id,
                resource: r.resource,
                source_id: r.source_id.clone(),
                direction: r.direction,
                strength: r.strength,
                distance: r.distance,
                confidence: r.confidence(),
                recency: self.recency(r, now),
                learned_tick: r.learned_tick,
            })
            .collect()
    }
}

impl Default for SocialGradientStore {
    fn default() -> Self {
        Self::from_config(&SocialConfig::default())
    }
}
