//! # Domain Types
//!
//! Common data structures and enums used across the application logic.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// A bearer token identified by its position in the configured ordering.
#[derive(Clone)]
pub struct Credential {
    pub index: usize,
    token: Arc<str>,
}

impl Credential {
    pub fn new(index: usize, token: impl Into<Arc<str>>) -> Self {
        Self {
            index,
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// One-based label used in logs and stats.
    pub fn label(&self) -> String {
        format!("credential {}", self.index + 1)
    }
}

// Never print the token itself.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// A resolved social account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
}

/// A post as returned by the social API, before it is tied to a username.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiPost {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A post ready for notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub text: String,
    pub link: String,
    pub username: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn from_api(post: ApiPost, username: &str) -> Self {
        Self {
            link: format!("https://x.com/{}/status/{}", username, post.id),
            id: post.id,
            text: post.text,
            username: username.to_string(),
            created_at: post.created_at,
        }
    }

    /// Case-insensitive check for `@handle` in the text.
    pub fn mentions(&self, handle: &str) -> bool {
        let needle = format!("@{}", handle.trim_start_matches('@')).to_lowercase();
        self.text.to_lowercase().contains(&needle)
    }
}

/// One parsed feed entry, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published: Option<String>,
}

impl FeedEntry {
    /// Identity used as the feed cursor: the entry id, falling back to its link.
    pub fn key(&self) -> String {
        self.id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| self.link.clone())
            .unwrap_or_default()
    }
}

/// A new feed article ready for notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: String,
}

/// Failure of a remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// HTTP 429 or an explicit quota response.
    RateLimited,
    Http { status: u16, body: String },
    Transport(String),
    Malformed(String),
    NotFound(String),
}

impl ApiError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ApiError::RateLimited)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::RateLimited => write!(f, "rate limited"),
            ApiError::Http { status, body } => write!(f, "HTTP {}: {}", status, body),
            ApiError::Transport(e) => write!(f, "transport error: {}", e),
            ApiError::Malformed(e) => write!(f, "malformed response: {}", e),
            ApiError::NotFound(what) => write!(f, "not found: {}", what),
        }
    }
}

impl std::error::Error for ApiError {}
