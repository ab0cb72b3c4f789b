//! Questionnaire definition: stages, answer scale, weighted questions

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// One hidden question and its per-stage weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier (e.g. "Q11")
    pub id: String,
    /// Display text, only used for the annotator prompt
    pub text: String,
    /// Contribution per unit of signal, one entry per declared stage
    pub weights: BTreeMap<String, f64>,
}

impl Question {
    /// Weight for a stage (0.0 for stages this question does not mention)
    pub fn weight(&self, stage: &str) -> f64 {
        self.weights.get(stage).copied().unwrap_or(0.0)
    }
}

/// A loaded, validated questionnaire
///
/// Built once at startup and shared by reference into every scoring call.
/// Field names are the exchanged document schema and must stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireConfig {
    pub version: String,
    /// Ordered stage codes
    pub stages: Vec<String>,
    /// Allowed signal values, symmetric around 0
    pub answer_scale: Vec<i64>,
    pub questions: Vec<Question>,
}

impl QuestionnaireConfig {
    /// Look up a question by id
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Question ids in declaration order
    pub fn question_ids(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(|q| q.id.as_str())
    }

    /// Is `value` a member of the answer scale?
    pub fn allows(&self, value: i64) -> bool {
        self.answer_scale.contains(&value)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}
