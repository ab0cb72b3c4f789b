//! Journey stage inference
//!
//! Scores conversational signals against a weighted questionnaire to estimate
//! where a user sits on the culture-shock adaptation curve.
//!
//! Slice 1: questionnaire config + signal normalizer
//! Slice 2: stage scorer
//! Slice 3: user state manager + turn processing
//! Slice 4: annotator reply parsing
//! Slice 5: HTTP API

pub mod core;
pub mod types;
pub mod settings;
pub mod telemetry;

// =============================================================================
// CONFIDENCE [C] - blend and thresholds, fixed for compatibility
// =============================================================================

/// Weight of the peak stage probability in the confidence score
pub const CONFIDENCE_DOMINANCE_WEIGHT: f64 = 0.6;

/// Weight of question coverage in the confidence score
pub const CONFIDENCE_COVERAGE_WEIGHT: f64 = 0.4;

/// Score at or above which confidence is "high"
pub const CONFIDENCE_HIGH_THRESHOLD: f64 = 0.75;

/// Score at or above which confidence is "medium"
pub const CONFIDENCE_MEDIUM_THRESHOLD: f64 = 0.45;

// =============================================================================
// QUESTIONNAIRE DEFAULTS
// =============================================================================

/// Answer scale assumed when a definition omits `answer_scale`
pub const DEFAULT_ANSWER_SCALE: [i64; 5] = [-2, -1, 0, 1, 2];

/// Version recorded when a definition omits `version`
pub const DEFAULT_CONFIG_VERSION: &str = "unknown";

/// Hex characters kept from the SHA-256 config digest
pub const FINGERPRINT_LEN: usize = 12;

/// Built-in questionnaire definition
pub const DEFAULT_QUESTIONNAIRE_JSON: &str = include_str!("../assets/default_questionnaire.json");

// =============================================================================
// CONVERSATION + PERSISTENCE
// =============================================================================

/// Conversation messages forwarded to the annotator per turn
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

/// Rolling expiry for persisted user state (seconds)
pub const DEFAULT_STATE_TTL_SECS: u64 = 86_400;

/// Namespace for persisted user state keys
pub const STATE_KEY_PREFIX: &str = "journey:user:";

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
