//! Event Log System
//!
//! Drains the broadcasts queued this tick into the JSONL event log.

use bevy_ecs::prelude::*;

use crate::events::{EventLogger, PendingEvents};

/// System: persist and clear this tick's broadcasts
///
/// Runs after delivery, so listeners have already heard everything drained here.
pub fn flush_event_log(mut pending: ResMut<PendingEvents>, mut logger: ResMut<EventLogger>) {
    if pending.is_empty() {
        return;
    }
    let records = pending.drain();
    if let Err(e) = logger.log_batch(&records) {
        tracing::warn!("Failed to write {} event(s) to the event log: {}", records.len(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_events::{NavEvent, ResourceType, VerificationBroadcast};

    #[test]
    fn test_flush_drains_pending() {
        let mut world = World::new();
        world.insert_resource(EventLogger::null());
        let mut pending = PendingEvents::new();
        for tick in 0..3 {
            pending.push(
                tick,
                "agent_0001",
                NavEvent::Verification(VerificationBroadcast {
                    source_id: "agent_0002".to_string(),
                    resource: ResourceType::Fiber,
                    confirmed: false,
                    failure: Some("stale".to_string()),
                }),
            );
        }
        world.insert_resource(pending);

        let mut schedule = Schedule::default();
        schedule.add_systems(flush_event_log);
        schedule.run(&mut world);

        assert!(world.resource::<PendingEvents>().is_empty());
        assert_eq!(world.resource::<EventLogger>().event_count(), 3);
    }
}
