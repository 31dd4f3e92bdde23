//! # Social Client
//!
//! Wraps the `SocialApi` with the credential pool and the identity cache.
//! Usernames are resolved to account ids once and cached forever; roster-wide
//! resolution is batched (up to 100 usernames per remote call) to save quota.

use std::sync::Arc;
use std::time::Duration;

use crate::application::credentials::CredentialPool;
use crate::application::state::StateStore;
use crate::domain::traits::SocialApi;
use crate::domain::types::Post;
use crate::strings::logs;

/// Upper bound imposed by the remote API on usernames per lookup.
pub const MAX_LOOKUP_BATCH: usize = 100;

pub struct SocialClient {
    pool: CredentialPool,
    api: Arc<dyn SocialApi>,
    state: StateStore,
    batch_size: usize,
    batch_delay: Duration,
}

impl SocialClient {
    pub fn new(pool: CredentialPool, api: Arc<dyn SocialApi>, state: StateStore) -> Self {
        Self {
            pool,
            api,
            state,
            batch_size: MAX_LOOKUP_BATCH,
            batch_delay: Duration::from_secs(1),
        }
    }

    /// Chunk size for batch resolution, clamped to `1..=100`.
    pub fn with_batch(mut self, size: usize, delay: Duration) -> Self {
        self.batch_size = size.clamp(1, MAX_LOOKUP_BATCH);
        self.batch_delay = delay;
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.pool.is_empty()
    }

    pub async fn cached_id(&self, username: &str) -> Option<String> {
        let key = username.to_lowercase();
        self.state
            .read(|s| s.tracked_user_ids.get(&key).cloned())
            .await
    }

    /// Returns the account id for `username`, resolving and caching it with one
    /// remote call when it is not cached yet.
    pub async fn resolve_user(&self, username: &str) -> Option<String> {
        if let Some(id) = self.cached_id(username).await {
            return Some(id);
        }

        let api = self.api.clone();
        let account = self
            .pool
            .execute("user_by_username", |credential| {
                let api = api.clone();
                let username = username.to_string();
                async move { api.user_by_username(&credential, &username).await }
            })
            .await?;

        if account.id.is_empty() {
            tracing::error!("{}", logs::user_not_found(username));
            return None;
        }

        let key = username.to_lowercase();
        let id = account.id.clone();
        self.state
            .update(|s| {
                s.tracked_user_ids.insert(key, id);
            })
            .await;
        Some(account.id)
    }

    /// Resolves every uncached username in chunks, persisting after each chunk.
    /// Usernames missing from a response are left uncached for a later attempt.
    ///
    /// Returns the number of newly cached usernames.
    pub async fn resolve_users(&self, usernames: &[String]) -> usize {
        let uncached: Vec<String> = self
            .state
            .read(|s| {
                usernames
                    .iter()
                    .map(|u| u.to_lowercase())
                    .filter(|u| !s.tracked_user_ids.contains_key(u))
                    .collect()
            })
            .await;

        if uncached.is_empty() {
            tracing::info!("{}", logs::IDS_ALL_CACHED);
            return 0;
        }
        tracing::info!("{}", logs::caching_ids(uncached.len()));

        let chunks: Vec<&[String]> = uncached.chunks(self.batch_size).collect();
        let mut cached = 0;

        for (number, chunk) in chunks.iter().enumerate() {
            let api = self.api.clone();
            let accounts = self
                .pool
                .execute("users_by_usernames", |credential| {
                    let api = api.clone();
                    let chunk = chunk.to_vec();
                    async move { api.users_by_usernames(&credential, &chunk).await }
                })
                .await
                .unwrap_or_default();

            let resolved = accounts.len();
            self.state
                .update(|s| {
                    for account in accounts {
                        s.tracked_user_ids
                            .insert(account.username.to_lowercase(), account.id);
                    }
                })
                .await;
            cached += resolved;
            tracing::info!("{}", logs::cached_ids(resolved, number + 1));

            if number + 1 < chunks.len() && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        cached
    }

    /// Fetches up to `max_results` posts newer than `since_id`, most recent first.
    /// `None` means every credential failed this cycle.
    pub async fn user_posts(
        &self,
        username: &str,
        user_id: &str,
        since_id: Option<&str>,
        max_results: u32,
    ) -> Option<Vec<Post>> {
        let api = self.api.clone();
        let posts = self
            .pool
            .execute("user_posts", |credential| {
                let api = api.clone();
                let user_id = user_id.to_string();
                let since_id = since_id.map(str::to_string);
                async move {
                    api.user_posts(&credential, &user_id, since_id.as_deref(), max_results)
                        .await
                }
            })
            .await?;

        Some(
            posts
                .into_iter()
                .map(|post| Post::from_api(post, username))
                .collect(),
        )
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory `SocialApi` used by the monitor tests.

    use super::*;
    use crate::domain::types::{Account, ApiError, ApiPost, Credential};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockSocialApi {
        /// Lower-cased username -> id. Unknown usernames do not resolve.
        pub accounts: HashMap<String, String>,
        /// User id -> scripted responses, consumed in order. Empty means no posts.
        pub timelines: Mutex<HashMap<String, Vec<Vec<ApiPost>>>>,
        pub batch_calls: Mutex<Vec<usize>>,
        pub single_calls: Mutex<usize>,
        pub since_ids: Mutex<Vec<Option<String>>>,
        pub fail_posts: bool,
    }

    impl MockSocialApi {
        pub fn with_accounts(names: &[(&str, &str)]) -> Self {
            Self {
                accounts: names
                    .iter()
                    .map(|(n, id)| (n.to_lowercase(), id.to_string()))
                    .collect(),
                ..Default::default()
            }
        }

        pub fn push_page(&self, user_id: &str, ids_and_texts: &[(&str, &str)]) {
            let page = ids_and_texts
                .iter()
                .map(|(id, text)| ApiPost {
                    id: id.to_string(),
                    text: text.to_string(),
                    created_at: None,
                })
                .collect();
            self.timelines
                .lock()
                .unwrap()
                .entry(user_id.to_string())
                .or_default()
                .push(page);
        }
    }

    #[async_trait]
    impl SocialApi for MockSocialApi {
        async fn user_by_username(
            &self,
            _credential: &Credential,
            username: &str,
        ) -> Result<Account, ApiError> {
            *self.single_calls.lock().unwrap() += 1;
            self.accounts
                .get(&username.to_lowercase())
                .map(|id| Account {
                    id: id.clone(),
                    username: username.to_string(),
                })
                .ok_or_else(|| ApiError::NotFound(username.to_string()))
        }

        async fn users_by_usernames(
            &self,
            _credential: &Credential,
            usernames: &[String],
        ) -> Result<Vec<Account>, ApiError> {
            self.batch_calls.lock().unwrap().push(usernames.len());
            Ok(usernames
                .iter()
                .take(MAX_LOOKUP_BATCH)
                .filter_map(|u| {
                    self.accounts.get(&u.to_lowercase()).map(|id| Account {
                        id: id.clone(),
                        username: u.to_uppercase(),
                    })
                })
                .collect())
        }

        async fn user_posts(
            &self,
            _credential: &Credential,
            user_id: &str,
            since_id: Option<&str>,
            _max_results: u32,
        ) -> Result<Vec<ApiPost>, ApiError> {
            self.since_ids
                .lock()
                .unwrap()
                .push(since_id.map(str::to_string));
            if self.fail_posts {
                return Err(ApiError::RateLimited);
            }
            let mut timelines = self.timelines.lock().unwrap();
            let pages = timelines.entry(user_id.to_string()).or_default();
            if pages.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(pages.remove(0))
            }
        }
    }
}
