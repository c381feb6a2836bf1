//! Trust Ledger
//!
//! Outgoing trust of one observer toward every agent it has verified.
//! Anyone may read an entry; only the verification path writes one.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use nav_events::TrustSnapshot;

use crate::config::TrustConfig;
use crate::verification::VerificationFailure;

/// How a verified claim turned out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustOutcome {
    Confirmed,
    Failed(VerificationFailure),
}

impl TrustOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, TrustOutcome::Confirmed)
    }

    /// A report of something that was not there, upgraded or not.
    pub fn is_false_report(&self) -> bool {
        matches!(
            self,
            TrustOutcome::Failed(VerificationFailure::FalseReport | VerificationFailure::UnreliablePattern)
        )
    }
}

/// Trust toward one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustEntry {
    /// In [0, 1]
    pub score: f32,
    pub confirmations: u32,
    pub failures: u32,
    /// Recent outcomes, oldest first
    history: VecDeque<(u64, TrustOutcome)>,
}

impl TrustEntry {
    fn new(score: f32) -> Self {
        Self {
            score,
            confirmations: 0,
            failures: 0,
            history: VecDeque::new(),
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &(u64, TrustOutcome)> {
        self.history.iter()
    }
}

/// Component: an observer's trust in other agents
#[derive(Component, Debug, Clone, PartialEq)]
pub struct TrustLedger {
    owner: String,
    neutral: f32,
    history_len: usize,
    entries: BTreeMap<String, TrustEntry>,
}

impl TrustLedger {
    pub fn new(owner: impl Into<String>, neutral: f32, history_len: usize) -> Self {
        Self {
            owner: owner.into(),
            neutral: neutral.clamp(0.0, 1.0),
            history_len,
            entries: BTreeMap::new(),
        }
    }

    pub fn from_config(owner: impl Into<String>, config: &TrustConfig) -> Self {
        Self::new(owner, config.neutral, config.history_len)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Trust in `subject`, neutral when never verified.
    pub fn get(&self, subject: &str) -> f32 {
        self.entries.get(subject).map_or(self.neutral, |e| e.score)
    }

    pub fn entry(&self, subject: &str) -> Option<&TrustEntry> {
        self.entries.get(subject)
    }

    /// Apply a bounded change and remember the outcome. Returns (before, after).
    pub(crate) fn apply(&mut self, subject: &str, delta: f32, tick: u64, outcome: TrustOutcome) -> (f32, f32) {
        let neutral = self.neutral;
        let entry = self
            .entries
            .entry(subject.to_string())
            .or_insert_with(|| TrustEntry::new(neutral));

        let before = entry.score;
        let delta = if delta.is_finite() { delta } else { 0.0 };
        entry.score = (entry.score + delta).clamp(0.0, 1.0);

        if outcome.is_confirmed() {
            entry.confirmations += 1;
        } else {
            entry.failures += 1;
        }

        entry.history.push_back((tick, outcome));
        while entry.history.len() > self.history_len {
            entry.history.pop_front();
        }

        (before, entry.score)
    }

    /// False reports by `subject` within `window` ticks before `now`.
    pub fn recent_false_reports(&self, subject: &str, now: u64, window: u64) -> usize {
        self.entries.get(subject).map_or(0, |entry| {
            entry
                .history
                .iter()
                .filter(|(tick, outcome)| outcome.is_false_report() && now.saturating_sub(*tick) <= window)
                .count()
        })
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Vec<TrustSnapshot> {
        self.entries
            .iter()
            .map(|(subject, entry)| TrustSnapshot {
                subject_id: subject.clone(),
                score: entry.score,
                confirmations: entry.confirmations,
                failures: entry.failures,
            })
            .collect()
    }
}
