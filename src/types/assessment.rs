//! Scorer output structures

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::types::ConfidenceLabel;

/// Stage code → raw accumulated score (may be negative)
pub type StageScores = BTreeMap<String, f64>;

/// Stage code → probability in [0, 1]; sums to 1, or to 0 when no stage
/// received positive mass
pub type StageProbabilities = BTreeMap<String, f64>;

/// Result of scoring one signal map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageAssessment {
    pub stage_probs: StageProbabilities,
    /// Unclamped raw scores
    pub stage_scores: StageScores,
    /// Fraction of questions with a known signal
    pub coverage: f64,
    /// Highest stage probability (0 when nothing scored)
    pub dominance: f64,
    /// Blend of dominance and coverage
    pub confidence_score: f64,
    pub confidence: ConfidenceLabel,
    /// Stage codes in declaration order
    pub stages: Vec<String>,
}

impl StageAssessment {
    /// First stage (in declaration order) holding the peak probability
    ///
    /// `None` while no stage has received positive mass.
    pub fn dominant_stage(&self) -> Option<&str> {
        if self.dominance <= 0.0 {
            return None;
        }
        self.stages
            .iter()
            .find(|s| self.stage_probs.get(s.as_str()).copied() == Some(self.dominance))
            .map(String::as_str)
    }

    /// Probability for one stage (0 for unknown codes)
    pub fn probability(&self, stage: &str) -> f64 {
        self.stage_probs.get(stage).copied().unwrap_or(0.0)
    }

    /// Sum of all stage probabilities
    pub fn total_probability(&self) -> f64 {
        self.stage_probs.values().sum()
    }
}
