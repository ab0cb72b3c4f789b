//! Per-user accumulated state

use serde::{Deserialize, Serialize};
use crate::types::{SignalMap, Snapshot};

/// Everything persisted for one user
///
/// `signals` entries are only ever overwritten, never removed. `history`
/// is append-only; pruning is the persistence layer's call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    #[serde(default)]
    pub signals: SignalMap,
    #[serde(default)]
    pub history: Vec<Snapshot>,
}

impl UserState {
    /// Fresh state for a first-time user
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent snapshot
    pub fn latest(&self) -> Option<&Snapshot> {
        self.history.last()
    }

    /// Distinct fingerprints in history, oldest first
    ///
    /// More than one entry means the history spans scoring definitions.
    pub fn fingerprints(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for snap in &self.history {
            if !seen.contains(&snap.config_fingerprint.as_str()) {
                seen.push(&snap.config_fingerprint);
            }
        }
        seen
    }

    /// Snapshots produced under one fingerprint
    pub fn history_for<'a>(&'a self, fingerprint: &'a str) -> impl Iterator<Item = &'a Snapshot> {
        self.history.iter().filter(move |s| s.matches_fingerprint(fingerprint))
    }
}
