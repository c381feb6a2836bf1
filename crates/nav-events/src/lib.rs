//! Shared data types for the swarm navigation substrate.
//!
//! This crate contains pure data structures with no navigation logic:
//! geometry, resource kinds, structured claims, broadcast events and
//! telemetry snapshots. It is a dependency for all other crates in the
//! workspace.

pub mod claim;
pub mod event;
pub mod geometry;
pub mod resource;
pub mod snapshot;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

pub use claim::{Cardinal, ClaimBearing, Polarity, SpatialClaim};
pub use event::{generate_event_id, DiscoveryBroadcast, EventRecord, NavEvent, VerificationBroadcast};
pub use geometry::Vec2;
pub use resource::{ResourceType, UnknownResource};
pub use snapshot::{
    generate_snapshot_id, AgentNavSnapshot, FieldSnapshot, GradientSnapshot, NavSnapshot,
    TrustSnapshot,
};
