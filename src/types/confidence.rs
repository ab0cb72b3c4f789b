//! Confidence labels for a stage distribution

use serde::{Deserialize, Serialize};

/// Coarse trust bucket for the current stage distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLabel {
    /// Too little signal or a flat distribution
    Low,
    Medium,
    /// One stage clearly dominates and coverage is broad
    High,
}

impl ConfidenceLabel {
    /// Lowercase label as exchanged with callers
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLabel::Low => "low",
            ConfidenceLabel::Medium => "medium",
            ConfidenceLabel::High => "high",
        }
    }

    /// Terminal color for CLI output
    pub fn color(&self) -> colored::Color {
        match self {
            ConfidenceLabel::Low => colored::Color::BrightBlack,
            ConfidenceLabel::Medium => colored::Color::Yellow,
            ConfidenceLabel::High => colored::Color::Green,
        }
    }
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
