//! Event Logger
//!
//! Append-only JSONL logging of navigation broadcasts.

use bevy_ecs::prelude::*;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use nav_events::{generate_event_id, EventRecord, NavEvent};

/// Resource for logging broadcast events to a JSONL file
#[derive(Resource)]
pub struct EventLogger {
    writer: Option<BufWriter<File>>,
    event_count: u64,
}

impl EventLogger {
    /// Create a new event logger writing to the specified path
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            event_count: 0,
        })
    }

    /// Create a logger that discards events (for testing)
    pub fn null() -> Self {
        Self {
            writer: None,
            event_count: 0,
        }
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn log(&mut self, record: &EventRecord) -> std::io::Result<()> {
        self.event_count += 1;
        if let Some(ref mut writer) = self.writer {
            let json = record.to_jsonl()?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    pub fn log_batch(&mut self, records: &[EventRecord]) -> std::io::Result<()> {
        for record in records {
            self.log(record)?;
        }
        Ok(())
    }

    /// Flush the buffer to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for EventLogger {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("Failed to flush event logger: {}", e);
        }
    }
}

/// Resource: broadcasts emitted this tick, awaiting delivery and logging
#[derive(Resource)]
pub struct PendingEvents {
    records: Vec<EventRecord>,
    next_event_id: u64,
}

impl PendingEvents {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_event_id: 1,
        }
    }

    /// Queue an event, assigning it the next event ID.
    pub fn push(&mut self, tick: u64, agent_id: impl Into<String>, event: NavEvent) -> &EventRecord {
        let id = generate_event_id(self.next_event_id);
        self.next_event_id += 1;
        self.records.push(EventRecord::new(id, tick, agent_id, event));
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl Default for PendingEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_events::{DiscoveryBroadcast, Polarity, ResourceType, Vec2, VerificationBroadcast};
    use std::io::BufRead;

    fn discovery() -> NavEvent {
        NavEvent::Discovery(DiscoveryBroadcast::describe(
            ResourceType::Wood,
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 4.0),
            Polarity::Discovery,
        ))
    }

    #[test]
    fn test_event_logging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let mut pending = PendingEvents::new();
        pending.push(5, "agent_0001", discovery());
        pending.push(
            5,
            "agent_0002",
            NavEvent::Verification(VerificationBroadcast {
                source_id: "agent_0001".to_string(),
                resource: ResourceType::Wood,
                confirmed: true,
                failure: None,
            }),
        );

        {
            let mut logger = EventLogger::new(&path).unwrap();
            logger.log_batch(&pending.drain()).unwrap();
            logger.flush().unwrap();
            assert_eq!(logger.event_count(), 2);
        }

        let file = File::open(&path).unwrap();
        let lines: Vec<String> = std::io::BufReader::new(file).lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);

        let first = EventRecord::from_jsonl(&lines[0]).unwrap();
        assert_eq!(first.event_id, "evt_00000001");
        assert_eq!(first.agent_id, "agent_0001");
        assert_eq!(first.tick, 5);
    }

    #[test]
    fn test_null_logger() {
        let mut logger = EventLogger::null();
        let record = EventRecord::new("evt_1", 1, "agent_0001", discovery());

        logger.log(&record).unwrap();
        assert_eq!(logger.event_count(), 1);
    }

    #[test]
    fn test_pending_ids_continue_across_drains() {
        let mut pending = PendingEvents::new();
        assert!(pending.is_empty());

        pending.push(1, "agent_0001", discovery());
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.drain().len(), 1);
        assert!(pending.is_empty());

        let record = pending.push(2, "agent_0001", discovery());
        assert_eq!(record.event_id, "evt_00000002");
    }
}
