//! Snapshot Types
//!
//! Serialization structs for navigation telemetry.
//!
//! Snapshots capture what each agent is doing and what it believes at a point
//! in time, for inspection by external UI and for offline analysis.

use serde::{Deserialize, Serialize};

use crate::{ResourceType, Vec2};

/// Generates a snapshot ID with the given sequence number.
pub fn generate_snapshot_id(sequence: u64) -> String {
    format!("snap_{:06}", sequence)
}

/// One active gradient record as seen at snapshot time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientSnapshot {
    pub record_id: u64,
    pub resource: ResourceType,
    pub source_id: String,
    pub direction: Vec2,
    pub strength: f32,
    pub distance: f32,
    pub confidence: f32,
    /// Read-time recency weight in [0, 1]
    pub recency: f32,
    pub learned_tick: u64,
}

/// One trust entry held by an observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustSnapshot {
    pub subject_id: String,
    pub score: f32,
    pub confirmations: u32,
    pub failures: u32,
}

/// Navigation state of a single agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentNavSnapshot {
    pub agent_id: String,
    pub position: Vec2,
    pub velocity: Vec2,
    /// State machine state name (e.g. "seeking", "stuck")
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Vec2>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gradients: Vec<GradientSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust: Vec<TrustSnapshot>,
}

/// Summary of one cached flow field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSnapshot {
    /// Field kind name (e.g. "exploration", "resource:wood")
    pub kind: String,
    pub generation: u64,
    pub last_updated_tick: u64,
    pub reachable_cells: usize,
}

/// Complete navigation snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavSnapshot {
    pub snapshot_id: String,
    pub tick: u64,
    pub agents: Vec<AgentNavSnapshot>,
    #[serde(default)]
    pub fields: Vec<FieldSnapshot>,
}

impl NavSnapshot {
    /// Returns the agent snapshot for the given ID.
    pub fn agent(&self, agent_id: &str) -> Option<&AgentNavSnapshot> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }

    /// Mean trust each subject receives across all observers.
    pub fn mean_trust_received(&self, subject_id: &str) -> Option<f32> {
        let scores: Vec<f32> = self
            .agents
            .iter()
            .flat_map(|a| a.trust.iter())
            .filter(|t| t.subject_id == subject_id)
            .map(|t| t.score)
            .collect();

        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f32>() / scores.len() as f32)
        }
    }
}
