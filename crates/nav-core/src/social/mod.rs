//! Social Gradients
//!
//! The language-derived communication layer: structured claims become
//! gradient records in the listener's own store, weighted at read time by how
//! much the listener trusts whoever made the claim.

pub mod claim;
pub mod gradient;
pub mod trust;

pub use claim::{ClaimParseFailure, SpatialClaimParser};
pub use gradient::{AvoidanceZone, GradientBlend, GradientRecord, SocialGradientStore};
pub use trust::{TrustEntry, TrustLedger, TrustOutcome};
