//! Clock System
//!
//! Advances the world tick once every agent has finished the current one.

use bevy_ecs::prelude::*;

use crate::components::SimClock;
use crate::telemetry::NavStats;

/// System: end the tick
pub fn advance_clock(mut clock: ResMut<SimClock>, mut stats: ResMut<NavStats>) {
    clock.advance();
    stats.ticks = clock.tick;
}
