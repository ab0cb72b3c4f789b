//! Stage Scorer: accumulated signals → stage distribution + confidence
//!
//! raw(s)   = Σ weight(q, s) · v   over questions with a known value v
//! prob(s)  = max(raw(s), 0) / Σ max(raw, 0)   (all 0 if that sum is 0)
//! coverage = known / total questions
//! score    = 0.6 · max(prob) + 0.4 · coverage
//!
//! Negative raw scores are clamped rather than shifted, which discards the
//! ordering among negative stages. That is the established behavior.

use crate::{
    CONFIDENCE_COVERAGE_WEIGHT, CONFIDENCE_DOMINANCE_WEIGHT,
    CONFIDENCE_HIGH_THRESHOLD, CONFIDENCE_MEDIUM_THRESHOLD,
};
use crate::types::{
    ConfidenceLabel, QuestionnaireConfig, SignalMap,
    StageAssessment, StageProbabilities, StageScores,
};

/// Blend weights and label thresholds for the confidence heuristic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidencePolicy {
    pub dominance_weight: f64,
    pub coverage_weight: f64,
    /// Inclusive lower bound for "high"
    pub high_threshold: f64,
    /// Inclusive lower bound for "medium"
    pub medium_threshold: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            dominance_weight: CONFIDENCE_DOMINANCE_WEIGHT,
            coverage_weight: CONFIDENCE_COVERAGE_WEIGHT,
            high_threshold: CONFIDENCE_HIGH_THRESHOLD,
            medium_threshold: CONFIDENCE_MEDIUM_THRESHOLD,
        }
    }
}

impl ConfidencePolicy {
    /// Blend dominance and coverage into a single score
    pub fn score(&self, dominance: f64, coverage: f64) -> f64 {
        self.dominance_weight * dominance + self.coverage_weight * coverage
    }

    /// Bucket a confidence score
    pub fn label_for(&self, score: f64) -> ConfidenceLabel {
        if score >= self.high_threshold {
            ConfidenceLabel::High
        } else if score >= self.medium_threshold {
            ConfidenceLabel::Medium
        } else {
            ConfidenceLabel::Low
        }
    }
}

/// Stage scorer
#[derive(Debug, Clone, Default)]
pub struct StageScorer {
    policy: ConfidencePolicy,
}

impl StageScorer {
    /// Scorer with the default confidence policy
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ConfidencePolicy) -> Self {
        Self { policy }
    }

    /// Score a signal map against the questionnaire
    ///
    /// Pure and total: ids the questionnaire does not declare are ignored.
    pub fn score(&self, cfg: &QuestionnaireConfig, signals: &SignalMap) -> StageAssessment {
        let raw = raw_scores(cfg, signals);
        let stage_probs = probabilities(cfg, &raw);

        let known = cfg
            .questions
            .iter()
            .filter(|q| matches!(signals.get(&q.id), Some(Some(_))))
            .count();
        let coverage = known as f64 / cfg.questions.len().max(1) as f64;

        let dominance = stage_probs.values().copied().fold(0.0, f64::max);
        let confidence_score = self.policy.score(dominance, coverage);

        StageAssessment {
            stage_probs,
            stage_scores: raw,
            coverage,
            dominance,
            confidence_score,
            confidence: self.policy.label_for(confidence_score),
            stages: cfg.stages.clone(),
        }
    }
}

/// Score with the default policy
pub fn score(cfg: &QuestionnaireConfig, signals: &SignalMap) -> StageAssessment {
    StageScorer::new().score(cfg, signals)
}

fn raw_scores(cfg: &QuestionnaireConfig, signals: &SignalMap) -> StageScores {
    let mut scores: StageScores = cfg.stages.iter().map(|s| (s.clone(), 0.0)).collect();

    for question in &cfg.questions {
        let Some(Some(value)) = signals.get(&question.id) else {
            continue;
        };
        let v = *value as f64;
        for stage in &cfg.stages {
            if let Some(total) = scores.get_mut(stage) {
                *total += question.weight(stage) * v;
            }
        }
    }
    scores
}

fn probabilities(cfg: &QuestionnaireConfig, raw: &StageScores) -> StageProbabilities {
    let clamped: Vec<f64> = cfg
        .stages
        .iter()
        .map(|s| raw.get(s).copied().unwrap_or(0.0).max(0.0))
        .collect();
    let total: f64 = clamped.iter().sum();

    cfg.stages
        .iter()
        .zip(clamped)
        .map(|(stage, mass)| {
            let p = if total > 0.0 { mass / total } else { 0.0 };
            (stage.clone(), p)
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::load;

    fn two_stage() -> QuestionnaireConfig {
        load(
            r#"{
            "version": "t",
            "stages": ["A", "B"],
            "questions": [
                {"id": "Q1", "text": "x", "weights": {"A": 1, "B": -1}},
                {"id": "Q2", "text": "y", "weights": {"A": 0, "B": 1}},
                {"id": "Q3", "text": "z", "weights": {"A": 1, "B": 1}},
                {"id": "Q4", "text": "w", "weights": {}}
            ]
        }"#,
        )
        .unwrap()
    }

    fn signals(pairs: &[(&str, Option<i64>)]) -> SignalMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_empty_signals_score_zero() {
        let a = score(&two_stage(), &SignalMap::new());
        assert_eq!(a.total_probability(), 0.0);
        assert_eq!(a.coverage, 0.0);
        assert_eq!(a.confidence_score, 0.0);
        assert_eq!(a.confidence, ConfidenceLabel::Low);
        assert_eq!(a.dominant_stage(), None);
    }

    #[test]
    fn test_negative_scores_clamped() {
        // Q1 = 2 → A: 2, B: -2
        let a = score(&two_stage(), &signals(&[("Q1", Some(2))]));
        assert_eq!(a.stage_scores["B"], -2.0);
        assert_eq!(a.probability("A"), 1.0);
        assert_eq!(a.probability("B"), 0.0);
        assert_eq!(a.dominant_stage(), Some("A"));
    }

    #[test]
    fn test_all_negative_gives_zero_distribution() {
        // Q3 = -2 → A: -2, B: -2
        let a = score(&two_stage(), &signals(&[("Q3", Some(-2))]));
        assert_eq!(a.total_probability(), 0.0);
        assert_eq!(a.coverage, 0.25);
        assert_eq!(a.dominance, 0.0);
    }

    #[test]
    fn test_probabilities_split() {
        // Q2 = 1, Q3 = 1 → A: 1, B: 2
        let a = score(&two_stage(), &signals(&[("Q2", Some(1)), ("Q3", Some(1))]));
        assert!((a.probability("A") - 1.0 / 3.0).abs() < 1e-12);
        assert!((a.probability("B") - 2.0 / 3.0).abs() < 1e-12);
        assert!((a.total_probability() - 1.0).abs() < 1e-12);
        assert_eq!(a.dominant_stage(), Some("B"));
    }

    #[test]
    fn test_null_and_unknown_ids_ignored() {
        let a = score(
            &two_stage(),
            &signals(&[("Q1", None), ("Q99", Some(2)), ("Q4", Some(0))]),
        );
        // Q4 known (value 0 counts toward coverage) but contributes nothing
        assert_eq!(a.coverage, 0.25);
        assert_eq!(a.total_probability(), 0.0);
    }

    #[test]
    fn test_label_boundaries() {
        let policy = ConfidencePolicy::default();
        assert_eq!(policy.label_for(0.75), ConfidenceLabel::High);
        assert_eq!(policy.label_for(0.749999), ConfidenceLabel::Medium);
        assert_eq!(policy.label_for(0.45), ConfidenceLabel::Medium);
        assert_eq!(policy.label_for(0.449999), ConfidenceLabel::Low);
    }

    #[test]
    fn test_custom_policy() {
        let scorer = StageScorer::with_policy(ConfidencePolicy {
            high_threshold: 0.5,
            ..ConfidencePolicy::default()
        });
        let a = scorer.score(&two_stage(), &signals(&[("Q1", Some(2))]));
        // 0.6 * 1 + 0.4 * 0.25 = 0.7
        assert!((a.confidence_score - 0.7).abs() < 1e-12);
        assert_eq!(a.confidence, ConfidenceLabel::High);
    }
}
