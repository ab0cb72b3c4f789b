//! Scoring snapshots kept in per-user history
//!
//! A snapshot is appended after every merge and never mutated afterwards.
//! The config fingerprint lets analytics avoid mixing snapshots produced
//! under different scoring definitions.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::types::{StageProbabilities, StageScores};

/// Immutable record of one scoring pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the merge happened
    pub timestamp: DateTime<Utc>,
    /// Questionnaire version at scoring time
    pub config_version: String,
    /// Questionnaire content fingerprint at scoring time
    #[serde(alias = "config_hash")]
    pub config_fingerprint: String,
    /// Fraction of questions answered
    pub coverage: f64,
    pub stage_probs: StageProbabilities,
    pub stage_scores: StageScores,
}

impl Snapshot {
    /// Was this snapshot produced under the given fingerprint?
    pub fn matches_fingerprint(&self, fingerprint: &str) -> bool {
        self.config_fingerprint == fingerprint
    }
}
