//! # Official Account Monitor
//!
//! Detects new posts on the official account. The cursor is advanced and saved
//! before the posts are handed back for delivery, so a failed delivery can miss a
//! notification but never re-announce old posts.

use std::sync::Arc;

use crate::application::social::SocialClient;
use crate::application::state::StateStore;
use crate::domain::types::Post;
use crate::strings::logs;

/// Substrings (lower-case) that mark a post as a live audio event.
const LIVE_MARKERS: &[&str] = &["space", "spaces", "twitter.com/i/spaces", "x.com/i/spaces"];

pub struct OfficialAccountMonitor {
    handle: String,
    page_size: u32,
    social: Arc<SocialClient>,
    state: StateStore,
}

impl OfficialAccountMonitor {
    pub fn new(handle: &str, page_size: u32, social: Arc<SocialClient>, state: StateStore) -> Self {
        Self {
            handle: handle.trim_start_matches('@').to_string(),
            page_size,
            social,
            state,
        }
    }

    /// Posts newer than the stored cursor, most recent first. Any remote failure
    /// yields an empty list and leaves the cursor untouched.
    pub async fn check_for_new(&self) -> Vec<Post> {
        let Some(user_id) = self.social.resolve_user(&self.handle).await else {
            tracing::warn!("{}", logs::user_not_found(&self.handle));
            return Vec::new();
        };

        let since = self.state.read(|s| s.last_post_id.clone()).await;
        let Some(posts) = self
            .social
            .user_posts(&self.handle, &user_id, since.as_deref(), self.page_size)
            .await
        else {
            return Vec::new();
        };

        if let Some(newest) = posts.first() {
            let id = newest.id.clone();
            self.state.update(|s| s.last_post_id = Some(id)).await;
            tracing::info!("{}", logs::new_official_posts(posts.len(), &self.handle));
        }
        posts
    }

    /// Whether the post announces a live audio event.
    pub fn is_live_event(post: &Post) -> bool {
        let text = post.text.to_lowercase();
        LIVE_MARKERS.iter().any(|marker| text.contains(marker))
    }
}
