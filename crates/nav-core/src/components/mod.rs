//! ECS Components
//!
//! Entity components for navigating agents and resources describing the
//! world they move through.

pub mod agent;
pub mod world;

pub use agent::*;
pub use world::*;
