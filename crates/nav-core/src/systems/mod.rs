//! ECS Systems
//!
//! Thin adapters that run the navigation substrate inside a `bevy_ecs`
//! schedule: clock, field upkeep, per-agent navigation, motion, broadcast
//! delivery and event logging, plus the scripted stand-ins for the decision
//! and dialogue layers used by the demo.

pub mod clock;
pub mod directives;
pub mod fields;
pub mod log;
pub mod navigation;
pub mod social;

pub use clock::advance_clock;
pub use directives::assign_directives;
pub use fields::{record_exploration, refresh_flow_fields};
pub use log::flush_event_log;
pub use navigation::{integrate_motion, navigate_agents};
pub use social::{deliver_broadcasts, spread_rumors};

use bevy_ecs::prelude::*;

/// The full per-tick schedule, in order.
///
/// Fields are regenerated before anyone samples them, every agent moves
/// before broadcasts are delivered, and the clock advances last.
pub fn build_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            record_exploration,
            refresh_flow_fields,
            assign_directives,
            navigate_agents,
            integrate_motion,
            spread_rumors,
            deliver_broadcasts,
            flush_event_log,
            advance_clock,
        )
            .chain(),
    );
    schedule
}
