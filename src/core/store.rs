//! Persistence for per-user state
//!
//! The engine only produces `UserState` blobs; these stores keep them keyed
//! by `journey:user:<id>` with a rolling expiry. Expired entries are evicted
//! lazily on load and by [`spawn_expiry_sweep`]; an eviction re-checks age
//! under the write lock so it never removes a fresh save. Load → save cycles
//! for one user are serialized by the API layer, not here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::types::UserState;
use crate::STATE_KEY_PREFIX;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state blob could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage key for a user
pub fn state_key(user_id: &str) -> String {
    format!("{}{}", STATE_KEY_PREFIX, user_id)
}

/// Port for loading and saving user state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// `None` when the user has no (unexpired) state
    async fn load(&self, user_id: &str) -> Result<Option<UserState>, StoreError>;

    /// Replace the user's state and restart its expiry
    async fn save(&self, user_id: &str, state: &UserState) -> Result<(), StoreError>;

    /// Drop every expired entry, returning how many went
    async fn purge_expired(&self) -> Result<usize, StoreError>;
}

/// Periodically purge expired state in the background
pub fn spawn_expiry_sweep(store: Arc<dyn StateStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "expired user state purged"),
                Err(err) => warn!(error = %err, "expiry sweep failed"),
            }
        }
    })
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Process-local store with lazy expiry
#[derive(Debug)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, (UserState, Instant)>>,
    ttl: Duration,
}

impl InMemoryStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of stored (possibly expired) entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn load(&self, user_id: &str) -> Result<Option<UserState>, StoreError> {
        let key = state_key(user_id);
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                None => return Ok(None),
                Some((state, saved)) if saved.elapsed() < self.ttl => return Ok(Some(state.clone())),
                Some(_) => {}
            }
        }
        // A save may have landed between the two locks; only evict if still stale.
        let mut entries = self.entries.write().await;
        if matches!(entries.get(&key), Some((_, saved)) if saved.elapsed() >= self.ttl) {
            entries.remove(&key);
        }
        Ok(entries.get(&key).map(|(state, _)| state.clone()))
    }

    async fn save(&self, user_id: &str, state: &UserState) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(state_key(user_id), (state.clone(), Instant::now()));
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (_, saved)| saved.elapsed() < self.ttl);
        Ok(before - entries.len())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// One JSON file per user; expiry by file modification time
///
/// Writes and evictions share one lock so an eviction can never remove a
/// file that was just rewritten.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    ttl: Duration,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Creates the directory if needed
    pub fn new(dir: impl AsRef<Path>, ttl: Duration) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            ttl,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// File holding a user's state; the id is hashed so any string is a safe name
    pub fn path_for(&self, user_id: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(state_key(user_id).as_bytes());
        let digest = hasher.finalize();
        let name: String = digest[..16].iter().map(|b| format!("{:02x}", b)).collect();
        self.dir.join(format!("{}.json", name))
    }

    /// `None` when the file is gone
    async fn expired(&self, path: &Path) -> Result<Option<bool>, StoreError> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let age = SystemTime::now()
            .duration_since(metadata.modified()?)
            .unwrap_or_default();
        Ok(Some(age >= self.ttl))
    }

    /// Remove `path` if it is still expired; caller holds `write_lock`
    async fn evict_if_expired(&self, path: &Path) -> Result<bool, StoreError> {
        if self.expired(path).await? != Some(true) {
            return Ok(false);
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn load(&self, user_id: &str) -> Result<Option<UserState>, StoreError> {
        let path = self.path_for(user_id);
        match self.expired(&path).await? {
            None => return Ok(None),
            Some(false) => {}
            Some(true) => {
                let _guard = self.write_lock.lock().await;
                if self.evict_if_expired(&path).await? {
                    return Ok(None);
                }
            }
        }
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn save(&self, user_id: &str, state: &UserState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        let path = self.path_for(user_id);
        let tmp = path.with_extension("json.tmp");
        let _guard = self.write_lock.lock().await;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut purged = 0;
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if self.evict_if_expired(&path).await? {
                purged += 1;
            }
        }
        Ok(purged)
    }
}

// =============================================================================
// TESTS
// =============================================================================
