//! Verification Service
//!
//! Compares a claim the agent acted on with what is actually there and
//! feeds the result into the observer's trust ledger. Failures are
//! classified by severity and always absorbed as a trust penalty.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use nav_events::{ResourceType, VerificationBroadcast};

use crate::config::TrustConfig;
use crate::social::{GradientRecord, TrustLedger, TrustOutcome};

/// Why a verified claim did not hold, mildest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum VerificationFailure {
    /// The claim was too old to hold the source to it
    #[error("claim aged past the freshness threshold")]
    Stale,
    /// Something was there, just not what was claimed
    #[error("a different resource was found at the claimed location")]
    Misidentified,
    #[error("nothing was found at the claimed location")]
    FalseReport,
    /// Repeated false reports from the same source
    #[error("source has a pattern of false reports")]
    UnreliablePattern,
}

impl VerificationFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationFailure::Stale => "stale",
            VerificationFailure::Misidentified => "misidentified",
            VerificationFailure::FalseReport => "false_report",
            VerificationFailure::UnreliablePattern => "unreliable_pattern",
        }
    }

    pub fn penalty(&self, config: &TrustConfig) -> f32 {
        match self {
            VerificationFailure::Stale => config.stale_penalty,
            VerificationFailure::Misidentified => config.misidentified_penalty,
            VerificationFailure::FalseReport => config.false_report_penalty,
            VerificationFailure::UnreliablePattern => config.unreliable_penalty,
        }
    }
}

/// Result of one verification
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub observer_id: String,
    pub source_id: String,
    pub resource: ResourceType,
    pub record_id: u64,
    pub outcome: TrustOutcome,
    pub trust_before: f32,
    pub trust_after: f32,
}

impl VerificationReport {
    pub fn confirmed(&self) -> bool {
        self.outcome.is_confirmed()
    }

    pub fn failure(&self) -> Option<VerificationFailure> {
        match self.outcome {
            TrustOutcome::Confirmed => None,
            TrustOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn broadcast(&self) -> VerificationBroadcast {
        VerificationBroadcast {
            source_id: self.source_id.clone(),
            resource: self.resource,
            confirmed: self.confirmed(),
            failure: self.failure().map(|f| f.as_str().to_string()),
        }
    }
}

/// The only writer of trust scores
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationService {
    config: TrustConfig,
}

impl VerificationService {
    pub fn new(config: TrustConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    /// Classify a claim against what the observer sees, without touching trust.
    pub fn classify(
        &self,
        ledger: &TrustLedger,
        record: &GradientRecord,
        observed: &[ResourceType],
        now: u64,
    ) -> TrustOutcome {
        let present = observed.contains(&record.resource);
        let confirmed = if record.is_avoidance() { !present } else { present };
        if confirmed {
            return TrustOutcome::Confirmed;
        }

        if record.age(now) > self.config.freshness_threshold {
            return TrustOutcome::Failed(VerificationFailure::Stale);
        }
        if !record.is_avoidance() && !observed.is_empty() {
            return TrustOutcome::Failed(VerificationFailure::Misidentified);
        }

        let prior = ledger.recent_false_reports(&record.source_id, now, self.config.pattern_window);
        if prior >= self.config.pattern_threshold {
            TrustOutcome::Failed(VerificationFailure::UnreliablePattern)
        } else {
            TrustOutcome::Failed(VerificationFailure::FalseReport)
        }
    }

    /// Verify a claim on arrival and update the observer's trust in its source.
    pub fn verify(
        &self,
        ledger: &mut TrustLedger,
        record: &GradientRecord,
        observed: &[ResourceType],
        now: u64,
    ) -> VerificationReport {
        let outcome = self.classify(ledger, record, observed, now);
        let delta = match outcome {
            TrustOutcome::Confirmed => self.config.success_delta.abs(),
            TrustOutcome::Failed(failure) => -failure.penalty(&self.config).abs(),
        };
        let (trust_before, trust_after) = ledger.apply(&record.source_id, delta, now, outcome);

        match outcome {
            TrustOutcome::Confirmed => tracing::info!(
                "{} confirmed {} from {} (trust {:.2} -> {:.2})",
                ledger.owner(),
                record.resource,
                record.source_id,
                trust_before,
                trust_after
            ),
            TrustOutcome::Failed(failure) => tracing::info!(
                "{} found {} claim from {} was {} (trust {:.2} -> {:.2})",
                ledger.owner(),
                record.resource,
                record.source_id,
                failure.as_str(),
                trust_before,
                trust_after
            ),
        }

        VerificationReport {
            observer_id: ledger.owner().to_string(),
            source_id: record.source_id.clone(),
            resource: record.resource,
            record_id: record.record_id,
            outcome,
            trust_before,
            trust_after,
        }
    }
}

impl Default for VerificationService {
    fn default() -> Self {
        Self::new(TrustConfig::default())
    }
}
