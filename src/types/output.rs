//! Per-turn output handed to presentation and analytics layers

use serde::{Deserialize, Serialize};
use colored::Colorize;
use crate::types::{ConfidenceLabel, SignalMap, StageProbabilities, TurnReason};

/// Caller-facing result of one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Distribution over the accumulated signal map
    pub stage_probs: StageProbabilities,
    pub confidence: ConfidenceLabel,
    pub coverage: f64,
    /// This turn's normalized signals (every declared question)
    pub signals: SignalMap,
    pub config_version: String,
    pub config_fingerprint: String,
    pub reason: TurnReason,
}

impl TurnOutcome {
    /// Stage probabilities in the given stage order, formatted "FS=0.25 HM=..."
    fn probs_line(&self, stages: &[String]) -> String {
        stages
            .iter()
            .map(|s| format!("{}={:.2}", s, self.stage_probs.get(s).copied().unwrap_or(0.0)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self, stages: &[String]) -> String {
        let line = format!(
            "{} | confidence={} | coverage={:.0}% | {}",
            self.probs_line(stages),
            self.confidence,
            self.coverage * 100.0,
            self.reason.code()
        );
        line.color(self.confidence.color()).to_string()
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self, stages: &[String]) -> String {
        format!(
            "{} | confidence={} | coverage={:.3} | reason={}",
            self.probs_line(stages),
            self.confidence,
            self.coverage,
            self.reason.code()
        )
    }
}
