//! Core types for journey stage inference

mod questionnaire;
mod signals;
mod confidence;
mod assessment;
mod snapshot;
mod state;
mod reason;
mod output;
mod turn;

pub use questionnaire::{Question, QuestionnaireConfig};
pub use signals::{SignalMap, known_count, has_signal};
pub use confidence::ConfidenceLabel;
pub use assessment::{StageAssessment, StageScores, StageProbabilities};
pub use snapshot::Snapshot;
pub use state::UserState;
pub use reason::TurnReason;
pub use output::TurnOutcome;
pub use turn::{ChatMessage, AnnotatorReply};
