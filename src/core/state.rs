//! User State Manager: merge normalized signals, score, record a snapshot
//!
//! Merge is last-write-wins per question. Callers should skip turns that
//! carry no non-null signal (see [`crate::types::has_signal`]) so history
//! is not padded with no-op snapshots.
//!
//! There is no locking here. Two concurrent load → merge → store cycles
//! for the same user race; the caller serializes per user.

use std::sync::Arc;
use chrono::{DateTime, Utc};

use crate::core::config::fingerprint;
use crate::core::scorer::StageScorer;
use crate::types::{QuestionnaireConfig, SignalMap, Snapshot, StageAssessment, UserState};

/// Merges turns into per-user state under one questionnaire
#[derive(Debug, Clone)]
pub struct StateManager {
    config: Arc<QuestionnaireConfig>,
    fingerprint: String,
    scorer: StageScorer,
}

impl StateManager {
    /// Create a manager; the fingerprint is computed once here
    pub fn new(config: Arc<QuestionnaireConfig>) -> Self {
        Self::with_scorer(config, StageScorer::new())
    }

    pub fn with_scorer(config: Arc<QuestionnaireConfig>, scorer: StageScorer) -> Self {
        let fingerprint = fingerprint(&config);
        Self {
            config,
            fingerprint,
            scorer,
        }
    }

    pub fn config(&self) -> &QuestionnaireConfig {
        &self.config
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Score whatever signals a state currently holds
    pub fn assess(&self, signals: &SignalMap) -> StageAssessment {
        self.scorer.score(&self.config, signals)
    }

    /// Merge at the current wall-clock time
    pub fn merge_and_score(&self, state: Option<UserState>, normalized: &SignalMap) -> UserState {
        self.merge_and_score_at(state, normalized, Utc::now())
    }

    /// Merge with an explicit snapshot timestamp
    pub fn merge_and_score_at(
        &self,
        state: Option<UserState>,
        normalized: &SignalMap,
        timestamp: DateTime<Utc>,
    ) -> UserState {
        let mut state = state.unwrap_or_default();

        // Undeclared ids and off-scale values never reach the stored map
        for (qid, value) in normalized {
            if let Some(v) = value {
                if self.config.question(qid).is_some() && self.config.allows(*v) {
                    state.signals.insert(qid.clone(), Some(*v));
                }
            }
        }

        let assessment = self.assess(&state.signals);
        state.history.push(Snapshot {
            timestamp,
            config_version: self.config.version.clone(),
            config_fingerprint: self.fingerprint.clone(),
            coverage: assessment.coverage,
            stage_probs: assessment.stage_probs,
            stage_scores: assessment.stage_scores,
        });
        state
    }
}

/// One-shot merge without a long-lived manager
pub fn merge_and_score(
    cfg: &QuestionnaireConfig,
    state: Option<UserState>,
    normalized: &SignalMap,
) -> UserState {
    StateManager::new(Arc::new(cfg.clone())).merge_and_score(state, normalized)
}

// =============================================================================
// TESTS
// =============================================================================
