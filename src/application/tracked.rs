//! # Tracked Accounts Monitor
//!
//! Watches the roster of tracked accounts for posts that mention the official
//! handle. Only the first `batch_cap` accounts of the roster are checked per run.
//! Accounts without a cached id are skipped until a roster reload resolves them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::application::roster;
use crate::application::social::SocialClient;
use crate::application::state::StateStore;
use crate::domain::traits::RosterSource;
use crate::domain::types::Post;
use crate::strings::logs;

/// Per-run limits.
#[derive(Debug, Clone)]
pub struct TrackedSettings {
    pub official_handle: String,
    pub batch_cap: usize,
    pub request_delay: Duration,
    pub page_size: u32,
}

pub struct TrackedAccountsMonitor {
    settings: TrackedSettings,
    social: Arc<SocialClient>,
    roster: Arc<dyn RosterSource>,
    state: StateStore,
    accounts: RwLock<Vec<String>>,
}

impl TrackedAccountsMonitor {
    pub fn new(
        settings: TrackedSettings,
        social: Arc<SocialClient>,
        roster: Arc<dyn RosterSource>,
        state: StateStore,
    ) -> Self {
        Self {
            settings,
            social,
            roster,
            state,
            accounts: RwLock::new(Vec::new()),
        }
    }

    pub async fn accounts(&self) -> Vec<String> {
        self.accounts.read().await.clone()
    }

    /// Replaces the tracked list with a fresh roster and batch-resolves the
    /// usernames that have no cached id yet. A failed fetch keeps the old list.
    ///
    /// Returns the size of the list now tracked.
    pub async fn reload(&self) -> usize {
        let rows = match self.roster.fetch_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("{}", logs::roster_fetch_failed(&format!("{:#}", e)));
                return self.accounts.read().await.len();
            }
        };

        let usernames = roster::parse_rows(&rows);
        tracing::info!("{}", logs::roster_loaded(usernames.len()));
        *self.accounts.write().await = usernames.clone();

        if self.social.has_credentials() {
            self.social.resolve_users(&usernames).await;
        }
        usernames.len()
    }

    /// New posts mentioning the official handle, in roster order then most recent
    /// first. Cursors of every checked account are saved once at the end.
    pub async fn check_for_new(&self) -> Vec<Post> {
        let batch: Vec<String> = {
            let accounts = self.accounts.read().await;
            accounts.iter().take(self.settings.batch_cap).cloned().collect()
        };
        if batch.is_empty() {
            return Vec::new();
        }
        tracing::info!("{}", logs::checking_tracked(batch.len()));

        let mut interesting = Vec::new();
        let mut cursors: HashMap<String, String> = HashMap::new();
        let mut requested = false;

        for username in &batch {
            let key = username.to_lowercase();
            let Some(user_id) = self.social.cached_id(&key).await else {
                continue;
            };

            if requested && !self.settings.request_delay.is_zero() {
                tokio::time::sleep(self.settings.request_delay).await;
            }
            requested = true;

            let since = self.state.read(|s| s.tracked_last_posts.get(&key).cloned()).await;
            let Some(posts) = self
                .social
                .user_posts(username, &user_id, since.as_deref(), self.settings.page_size)
                .await
            else {
                tracing::warn!("{}", logs::tracked_fetch_failed(username));
                continue;
            };

            if let Some(newest) = posts.first() {
                cursors.insert(key, newest.id.clone());
            }
            interesting.extend(
                posts
                    .into_iter()
                    .filter(|post| post.mentions(&self.settings.official_handle)),
            );
        }

        if !cursors.is_empty() {
            self.state.update(|s| s.tracked_last_posts.extend(cursors)).await;
        }
        if !interesting.is_empty() {
            tracing::info!(
                "{}",
                logs::tracked_mentions(interesting.len(), &self.settings.official_handle)
            );
        }
        interesting
    }
}
