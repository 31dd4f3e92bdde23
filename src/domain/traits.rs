//! # Domain Traits
//!
//! Abstract interfaces for the external collaborators (chat transport, social API,
//! feed source, roster source). Allows for pluggable implementations in the
//! Infrastructure layer and mock implementations in tests.

use crate::domain::types::{Account, ApiError, ApiPost, Credential, FeedEntry};
use async_trait::async_trait;

/// Abstract interface for a chat transport (e.g., Matrix)
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a plain message to a recipient (room)
    async fn send(&self, recipient: &str, content: &str) -> Result<(), String>;
}

/// Read-only social API calls. Every call is made with an explicit credential
/// so the caller controls rotation.
#[async_trait]
pub trait SocialApi: Send + Sync {
    async fn user_by_username(
        &self,
        credential: &Credential,
        username: &str,
    ) -> Result<Account, ApiError>;

    /// Resolve up to 100 usernames at once. Unknown usernames are simply absent.
    async fn users_by_usernames(
        &self,
        credential: &Credential,
        usernames: &[String],
    ) -> Result<Vec<Account>, ApiError>;

    /// Posts newer than `since_id`, most recent first.
    async fn user_posts(
        &self,
        credential: &Credential,
        user_id: &str,
        since_id: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<ApiPost>, ApiError>;
}

/// A syndication feed, fetched and parsed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>, ApiError>;
}

/// Ordered rows of the tracked-account roster.
#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn fetch_rows(&self) -> anyhow::Result<Vec<String>>;
}
