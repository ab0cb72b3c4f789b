//! Reason codes for turn outcomes

use serde::{Deserialize, Serialize};

/// Why a turn did or did not change the user's state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum TurnReason {
    // =========================================================================
    // T001: Merge
    // =========================================================================
    /// At least one signal merged, snapshot appended
    T001_SIGNALS_MERGED,

    // =========================================================================
    // T002-T003: Skipped
    // =========================================================================
    /// Turn carried no usable signal, state untouched
    T002_NO_SIGNALS,
    /// Annotator failed, turn treated as carrying no signal
    T003_ANNOTATION_FAILED,
}

impl TurnReason {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::T001_SIGNALS_MERGED => "T001_SIGNALS_MERGED",
            Self::T002_NO_SIGNALS => "T002_NO_SIGNALS",
            Self::T003_ANNOTATION_FAILED => "T003_ANNOTATION_FAILED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::T001_SIGNALS_MERGED => "Signals merged, snapshot recorded",
            Self::T002_NO_SIGNALS => "No usable signals this turn",
            Self::T003_ANNOTATION_FAILED => "Annotation unavailable this turn",
        }
    }
}

impl std::fmt::Display for TurnReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
