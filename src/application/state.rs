//! # Bot State
//!
//! Defines the persistent state of the application (`PersistentState`): poll cursors,
//! the identity cache, credential rotation data and the manager assignment ledger.
//! It handles serialization and deserialization to/from JSON.
//!
//! `StateStore` is the shared handle every component holds. All access goes through
//! one async mutex and every mutation is written to disk before the lock is released.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Persistent state of the bot.
/// Saved to `data/state.json` by default.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct PersistentState {
    /// Cursor of the official account.
    #[serde(default)]
    pub last_post_id: Option<String>,
    /// Cursor of the feed.
    #[serde(default)]
    pub last_feed_entry: Option<String>,
    /// Lower-cased username -> last seen post id.
    #[serde(default)]
    pub tracked_last_posts: HashMap<String, String>,
    /// Lower-cased username -> account id.
    #[serde(default)]
    pub tracked_user_ids: HashMap<String, String>,
    #[serde(default)]
    pub current_credential_index: usize,
    /// Credential index -> successful calls.
    #[serde(default)]
    pub credential_usage: BTreeMap<usize, u64>,
    /// Manager name -> notifications routed to them.
    #[serde(default)]
    pub assignment_counts: HashMap<String, u64>,
}

impl PersistentState {
    /// Loads the state from `path`. A missing file yields the default state,
    /// an unreadable one is logged and also yields the default state.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::error!("Error loading state from {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                tracing::error!("Error parsing state file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Overwrites the file at `path` with the full state.
    /// Writes a sibling temp file first so a crash never leaves a half-written record.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

/// Shared, persisted state handle.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Mutex<PersistentState>>,
    path: Arc<PathBuf>,
}

impl StateStore {
    /// Loads the state at `path` (or defaults) and keeps `path` for saves.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = PersistentState::load(&path);
        Self {
            inner: Arc::new(Mutex::new(state)),
            path: Arc::new(path),
        }
    }

    /// Runs `f` against the current state without modifying it.
    pub async fn read<R>(&self, f: impl FnOnce(&PersistentState) -> R) -> R {
        let guard = self.inner.lock().await;
        f(&guard)
    }

    /// Applies `f` and persists the result before releasing the lock.
    /// A failed save is logged; the in-memory change stays.
    pub async fn update<R>(&self, f: impl FnOnce(&mut PersistentState) -> R) -> R {
        let mut guard = self.inner.lock().await;
        let result = f(&mut guard);
        if let Err(e) = guard.save(&self.path) {
            tracing::error!("Error saving state: {:#}", e);
        }
        result
    }

    pub async fn snapshot(&self) -> PersistentState {
        self.inner.lock().await.clone()
    }
}
