//! # Feed Monitor
//!
//! Detects new articles in a syndication feed. Entries are walked newest first
//! until the stored cursor is met or `max_entries` have been examined.

use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::application::state::StateStore;
use crate::domain::traits::FeedSource;
use crate::domain::types::{Article, FeedEntry};
use crate::strings::logs;

pub struct FeedMonitor {
    source: Arc<dyn FeedSource>,
    state: StateStore,
    max_entries: usize,
    summary_limit: usize,
}

impl FeedMonitor {
    pub fn new(
        source: Arc<dyn FeedSource>,
        state: StateStore,
        max_entries: usize,
        summary_limit: usize,
    ) -> Self {
        Self {
            source,
            state,
            max_entries,
            summary_limit,
        }
    }

    /// New articles, newest first. Fetch or parse failures yield an empty list.
    pub async fn check_for_new(&self) -> Vec<Article> {
        let entries = match self.source.fetch_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("{}", logs::feed_failed(&e));
                return Vec::new();
            }
        };
        let Some(newest) = entries.first().map(FeedEntry::key) else {
            return Vec::new();
        };

        let cursor = self.state.read(|s| s.last_feed_entry.clone()).await;
        let articles: Vec<Article> = entries
            .iter()
            .take(self.max_entries)
            .take_while(|entry| cursor.as_deref() != Some(entry.key().as_str()))
            .map(|entry| self.to_article(entry))
            .collect();

        if !articles.is_empty() {
            self.state.update(|s| s.last_feed_entry = Some(newest)).await;
            tracing::info!("{}", logs::new_articles(articles.len()));
        }
        articles
    }

    fn to_article(&self, entry: &FeedEntry) -> Article {
        let summary = entry
            .summary
            .as_deref()
            .map(|s| truncate(&strip_html(s), self.summary_limit))
            .unwrap_or_default();

        Article {
            id: entry.key(),
            title: entry
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Untitled".to_string()),
            link: entry.link.clone().unwrap_or_default(),
            summary,
            published: entry.published.clone().unwrap_or_default(),
        }
    }
}

fn html_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"))
}

/// Drops markup and collapses whitespace.
pub fn strip_html(text: &str) -> String {
    html_tag()
        .replace_all(text, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cuts `text` to `limit` characters, appending `...` when anything was cut.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ApiError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockFeed {
        entries: Mutex<Vec<FeedEntry>>,
        fail: bool,
    }

    impl MockFeed {
        fn set(&self, ids: &[&str]) {
            *self.entries.lock().unwrap() = ids
                .iter()
                .map(|id| FeedEntry {
                    id: Some(id.to_string()),
                    title: Some(format!("Title {}", id)),
                    link: Some(format!("https://blog.example/{}", id)),
                    summary: Some("<p>Short <b>summary</b></p>".to_string()),
                    published: None,
                })
                .collect();
        }
    }

    #[async_trait]
    impl FeedSource for MockFeed {
        async fn fetch_entries(&self) -> Result<Vec<FeedEntry>, ApiError> {
            if self.fail {
                return Err(ApiError::Http {
                    status: 502,
                    body: String::new(),
                });
            }
            Ok(self.entries.lock().unwrap().clone())
        }
    }

    fn monitor(feed: Arc<MockFeed>, dir: &TempDir) -> (FeedMonitor, StateStore) {
        let store = StateStore::open(dir.path().join("state.json"));
        (FeedMonitor::new(feed, store.clone(), 5, 200), store)
    }

    #[tokio::test]
    async fn test_first_check_caps_at_five() {
        let feed = Arc::new(MockFeed::default());
        feed.set(&["e7", "e6", "e5", "e4", "e3", "e2", "e1"]);
        let dir = TempDir::new().unwrap();
        let (monitor, store) = monitor(feed, &dir);

        let articles = monitor.check_for_new().await;
        assert_eq!(articles.len(), 5);
        assert_eq!(articles[0].title, "Title e7");
        assert_eq!(articles[0].summary, "Short summary");
        assert_eq!(store.snapshot().await.last_feed_entry.as_deref(), Some("e7"));
    }

    #[tokio::test]
    async fn test_stops_at_cursor_and_is_idempotent() {
        let feed = Arc::new(MockFeed::default());
        feed.set(&["e2", "e1"]);
        let dir = TempDir::new().unwrap();
        let (monitor, store) = monitor(feed.clone(), &dir);
        monitor.check_for_new().await;

        feed.set(&["e4", "e3", "e2", "e1"]);
        let articles = monitor.check_for_new().await;
        let ids: Vec<_> = articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["e4", "e3"]);

        assert!(monitor.check_for_new().await.is_empty());
        assert!(monitor.check_for_new().await.is_empty());
        assert_eq!(store.snapshot().await.last_feed_entry.as_deref(), Some("e4"));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_empty() {
        let feed = Arc::new(MockFeed {
            fail: true,
            ..Default::default()
        });
        let dir = TempDir::new().unwrap();
        let (monitor, store) = monitor(feed, &dir);
        store.update(|s| s.last_feed_entry = Some("e1".to_string())).await;

        assert!(monitor.check_for_new().await.is_empty());
        assert_eq!(store.snapshot().await.last_feed_entry.as_deref(), Some("e1"));
    }

    #[test]
    fn test_truncate_marks_cut_text() {
        assert_eq!(truncate("short", 200), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
        // Character boundaries, not bytes.
        assert_eq!(truncate("ééééé", 2), "éé...");
    }
}
