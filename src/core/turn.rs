//! Turn processing: one conversational turn end to end
//!
//! normalize → guard (skip when no signal) → merge + snapshot → assess

use std::sync::Arc;
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::normalizer::normalize;
use crate::core::state::StateManager;
use crate::types::{
    has_signal, known_count, QuestionnaireConfig, SignalMap,
    TurnOutcome, TurnReason, UserState,
};

/// Updated state plus what to report for the turn
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Hand this to the persistence layer
    pub state: UserState,
    pub outcome: TurnOutcome,
}

/// Applies raw per-turn signals to a user's state
#[derive(Debug, Clone)]
pub struct TurnProcessor {
    manager: StateManager,
}

impl TurnProcessor {
    pub fn new(config: Arc<QuestionnaireConfig>) -> Self {
        Self {
            manager: StateManager::new(config),
        }
    }

    pub fn manager(&self) -> &StateManager {
        &self.manager
    }

    pub fn config(&self) -> &QuestionnaireConfig {
        self.manager.config()
    }

    /// Process raw signals for one turn
    pub fn process(&self, state: Option<UserState>, raw: &Map<String, Value>) -> TurnResult {
        let normalized = normalize(self.config(), raw);
        self.process_normalized(state, normalized, TurnReason::T002_NO_SIGNALS)
    }

    /// Record a turn whose annotation failed; state is left untouched
    pub fn process_failed(&self, state: Option<UserState>) -> TurnResult {
        let normalized = normalize(self.config(), &Map::new());
        self.process_normalized(state, normalized, TurnReason::T003_ANNOTATION_FAILED)
    }

    fn process_normalized(
        &self,
        state: Option<UserState>,
        normalized: SignalMap,
        skip_reason: TurnReason,
    ) -> TurnResult {
        let (state, reason) = if has_signal(&normalized) {
            debug!(known = known_count(&normalized), "merging turn signals");
            (
                self.manager.merge_and_score(state, &normalized),
                TurnReason::T001_SIGNALS_MERGED,
            )
        } else {
            debug!(reason = skip_reason.code(), "turn skipped");
            (state.unwrap_or_default(), skip_reason)
        };

        let assessment = self.manager.assess(&state.signals);
        let outcome = TurnOutcome {
            stage_probs: assessment.stage_probs,
            confidence: assessment.confidence,
            coverage: assessment.coverage,
            signals: normalized,
            config_version: self.config().version.clone(),
            config_fingerprint: self.manager.fingerprint().to_string(),
            reason,
        };
        TurnResult { state, outcome }
    }
}

// =============================================================================
// TESTS
// =============================================================================
