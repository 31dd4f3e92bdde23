//! # Templates
//!
//! Notification texts sent to recipients.

use crate::application::state::PersistentState;
use crate::domain::config::Recipient;
use crate::domain::types::{Article, Post};

pub const STATS_DENIED: &str = "This command is only available for managers.";

pub fn official_post(post: &Post) -> String {
    format!(
        "📢 New post from @{}\n\n{}\n\nLink: {}\n\nPlease like and repost to support!",
        post.username, post.text, post.link
    )
}

pub fn live_event(post: &Post) -> String {
    format!(
        "🔴 Space is LIVE!\n\n@{} started a Space:\n\n{}\n\nJoin: {}\n\nPlease join and support the team!",
        post.username, post.text, post.link
    )
}

pub fn article(article: &Article) -> String {
    let mut message = format!("📝 New article\n\nTitle: {}\n", article.title);
    if !article.published.is_empty() {
        message.push_str(&format!("Published: {}\n", article.published));
    }
    message.push('\n');
    if !article.summary.is_empty() {
        message.push_str(&format!("{}\n\n", article.summary));
    }
    message.push_str(&format!("Read: {}\n\nPlease read and clap to support!", article.link));
    message
}

pub fn tracked_post(post: &Post) -> String {
    let posted = post
        .created_at
        .map(|t| format!("Posted: {}\n", t.format("%Y-%m-%d %H:%M UTC")))
        .unwrap_or_default();
    format!(
        "🎯 Tracked account post from @{}\n\n{}\n\n{}Link: {}\n\nPlease engage: like, repost, comment from the official account.",
        post.username, post.text, posted, post.link
    )
}

pub fn channel_post(text: &str) -> String {
    format!("📣 New message from team channel\n\n{text}\n\nPlease check and engage if needed.")
}

/// Counter overview for managers.
pub fn stats(state: &PersistentState, tracked: Option<usize>, managers: &[Recipient]) -> String {
    let mut lines = vec!["📊 Bot Statistics".to_string(), String::new()];

    if let Some(count) = tracked {
        lines.push(format!("Tracked accounts: {count}"));
    }
    lines.push(format!("Cached account ids: {}", state.tracked_user_ids.len()));

    lines.push(String::new());
    lines.push("Manager assignments:".to_string());
    for manager in managers {
        let count = state.assignment_counts.get(&manager.name).copied().unwrap_or(0);
        lines.push(format!("  {}: {}", manager.name, count));
    }

    if !state.credential_usage.is_empty() {
        lines.push(String::new());
        lines.push("API credential usage:".to_string());
        for (index, count) in &state.credential_usage {
            lines.push(format!("  Credential {}: {} requests", index + 1, count));
        }
    }
    lines.join("\n")
}
