//! Core modules for journey stage inference

pub mod config;
pub mod normalizer;
pub mod scorer;
pub mod state;
pub mod turn;
pub mod annotation;
pub mod store;
pub mod api;

pub use config::{ConfigError, fingerprint, load, load_path, load_value};
pub use normalizer::{coerce, normalize, normalize_value};
pub use scorer::{ConfidencePolicy, StageScorer, score};
pub use state::{StateManager, merge_and_score};
pub use turn::{TurnProcessor, TurnResult};
pub use annotation::{Annotator, AnnotatorError, EchoAnnotator, build_annotator_prompt, parse_annotator_reply, trim_history};
pub use store::{StateStore, InMemoryStore, FileStore, StoreError, spawn_expiry_sweep, state_key};
pub use api::{AppState, create_router, run_server};
