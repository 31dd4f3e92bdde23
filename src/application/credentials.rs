//! Credential rotation for rate-limited APIs
//!
//! This module provides a pool of interchangeable bearer tokens that:
//! - Tries each credential at most once per call
//! - Starts at the credential that last succeeded (sticky start)
//! - Moves on past rate-limited (429) and failing credentials
//! - Records the winning credential and its usage count in the persisted state
//!
//! Exhausting the pool is not an error: the caller gets `None` and tries again
//! on its next cycle.

use std::future::Future;

use crate::application::state::StateStore;
use crate::domain::types::{ApiError, Credential};
use crate::strings::logs;

/// Ordered set of equivalent credentials
pub struct CredentialPool {
    credentials: Vec<Credential>,
    state: StateStore,
}

impl CredentialPool {
    /// Create a pool from tokens in their configured order
    pub fn new(tokens: Vec<String>, state: StateStore) -> Self {
        let credentials = tokens
            .into_iter()
            .enumerate()
            .map(|(index, token)| Credential::new(index, token))
            .collect();
        Self { credentials, state }
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Execute an operation against the pool
    ///
    /// # Arguments
    /// * `label` - Name of the operation for logging (e.g., "user_posts")
    /// * `operation` - Async call made with one credential; invoked at most once per credential
    ///
    /// # Returns
    /// The first successful result, or `None` when the pool is empty or every credential failed
    ///
    /// # Example
    /// ```ignore
    /// let posts = pool.execute("user_posts", |credential| {
    ///     let api = api.clone();
    ///     async move { api.user_posts(&credential, "1001", None, 5).await }
    /// }).await;
    /// ```
    pub async fn execute<T, F, Fut>(&self, label: &str, operation: F) -> Option<T>
    where
        F: Fn(Credential) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if self.credentials.is_empty() {
            tracing::error!("{}", logs::NO_CREDENTIALS);
            return None;
        }

        let size = self.credentials.len();
        // A persisted index can be stale if the pool shrank between runs.
        let start = self.state.read(|s| s.current_credential_index).await % size;
        let mut failures = Vec::with_capacity(size);

        for offset in 0..size {
            let candidate = (start + offset) % size;
            let credential = self.credentials[candidate].clone();
            let name = credential.label();

            match operation(credential).await {
                Ok(value) => {
                    self.state
                        .update(|s| {
                            s.current_credential_index = candidate;
                            *s.credential_usage.entry(candidate).or_insert(0) += 1;
                        })
                        .await;
                    tracing::info!("{}", logs::credential_success(label, &name));
                    return Some(value);
                }
                Err(error) if error.is_rate_limit() => {
                    tracing::warn!("{}", logs::credential_rate_limited(label, &name));
                    failures.push(format!("{}: rate limited", name));
                }
                Err(error) => {
                    tracing::error!("{}", logs::credential_failed(label, &name, &error));
                    failures.push(format!("{}: {}", name, error));
                }
            }
        }

        tracing::error!("{}", logs::all_credentials_failed(label, &failures));
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn pool_with(size: usize, dir: &TempDir) -> (CredentialPool, StateStore) {
        let store = StateStore::open(dir.path().join("state.json"));
        let tokens = (0..size).map(|i| format!("token-{}", i)).collect();
        (CredentialPool::new(tokens, store.clone()), store)
    }

    /// Runs one call where `outcome(index)` decides each credential's result and
    /// returns the visited indices.
    async fn run(
        pool: &CredentialPool,
        outcome: impl Fn(usize) -> Result<usize, ApiError>,
    ) -> (Option<usize>, Vec<usize>) {
        let visited = Arc::new(Mutex::new(Vec::new()));
        let result = pool
            .execute("test", |credential| {
                visited.lock().unwrap().push(credential.index);
                let result = outcome(credential.index);
                async move { result }
            })
            .await;
        let visited = visited.lock().unwrap().clone();
        (result, visited)
    }

    fn failure(i: usize) -> ApiError {
        if i % 2 == 0 {
            ApiError::RateLimited
        } else {
            ApiError::Http {
                status: 503,
                body: "unavailable".to_string(),
            }
        }
    }

    #[tokio::test]
    async fn test_empty_pool_yields_none() {
        let dir = TempDir::new().unwrap();
        let (pool, _) = pool_with(0, &dir);
        let (result, visited) = run(&pool, Ok).await;
        assert_eq!(result, None);
        assert!(visited.is_empty());
    }

    #[tokio::test]
    async fn test_each_credential_tried_at_most_once() {
        for size in 1..=6 {
            let dir = TempDir::new().unwrap();
            let (pool, store) = pool_with(size, &dir);
            store.update(|s| s.current_credential_index = size / 2).await;

            let (result, visited) = run(&pool, |i| Err(failure(i))).await;
            assert_eq!(result, None);
            assert_eq!(visited.len(), size);
            let mut unique = visited.clone();
            unique.sort_unstable();
            unique.dedup();
            assert_eq!(unique.len(), size, "repeated credential in {:?}", visited);
        }
    }

    #[tokio::test]
    async fn test_rotation_starts_at_stored_index() {
        let dir = TempDir::new().unwrap();
        let (pool, store) = pool_with(4, &dir);
        store.update(|s| s.current_credential_index = 2).await;

        let (_, visited) = run(&pool, |i| Err(failure(i))).await;
        assert_eq!(visited, vec![2, 3, 0, 1]);
    }

    #[tokio::test]
    async fn test_success_is_sticky() {
        let dir = TempDir::new().unwrap();
        let (pool, store) = pool_with(3, &dir);

        // 0 is rate limited, 1 succeeds.
        let (result, visited) = run(&pool, |i| if i == 0 { Err(ApiError::RateLimited) } else { Ok(i) }).await;
        assert_eq!(result, Some(1));
        assert_eq!(visited, vec![0, 1]);

        let state = store.snapshot().await;
        assert_eq!(state.current_credential_index, 1);
        assert_eq!(state.credential_usage.get(&1), Some(&1));
        assert_eq!(state.credential_usage.get(&0), None);

        // Next call starts at 1 again, not 2.
        let (result, visited) = run(&pool, Ok).await;
        assert_eq!(result, Some(1));
        assert_eq!(visited, vec![1]);
        assert_eq!(store.snapshot().await.credential_usage.get(&1), Some(&2));
    }

    #[tokio::test]
    async fn test_all_failures_leave_state_unchanged() {
        let dir = TempDir::new().unwrap();
        let (pool, store) = pool_with(3, &dir);
        store.update(|s| s.current_credential_index = 2).await;
        let before = store.snapshot().await;

        let (result, _) = run(&pool, |i| Err(failure(i))).await;
        assert_eq!(result, None);
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_single_credential_fails_immediately() {
        let dir = TempDir::new().unwrap();
        let (pool, _) = pool_with(1, &dir);
        let (result, visited) = run(&pool, |_| Err(ApiError::RateLimited)).await;
        assert_eq!(result, None);
        assert_eq!(visited, vec![0]);
    }

    #[tokio::test]
    async fn test_out_of_range_index_wraps() {
        let dir = TempDir::new().unwrap();
        let (pool, store) = pool_with(3, &dir);
        store.update(|s| s.current_credential_index = 7).await;

        let (result, visited) = run(&pool, Ok).await;
        assert_eq!(result, Some(1));
        assert_eq!(visited, vec![1]);
        assert_eq!(store.snapshot().await.current_credential_index, 1);
    }
}
