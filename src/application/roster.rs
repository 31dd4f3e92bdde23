//! # Roster Parsing
//!
//! Turns free-form roster rows (`@name`, profile URLs, bare names) into
//! lower-cased usernames.

use regex::Regex;
use std::sync::OnceLock;

/// Path segments that look like usernames in a profile URL but are not.
const RESERVED: &[&str] = &["i", "intent", "share", "search", "hashtag"];

fn profile_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:https?://)?(?:www\.)?(?:twitter\.com|x\.com)/([a-zA-Z0-9_]+)")
            .expect("valid profile URL pattern")
    })
}

fn bare_username() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-zA-Z0-9_]+)$").expect("valid username pattern"))
}

/// Extracts a username from one roster row.
pub fn extract_username(row: &str) -> Option<String> {
    let value = row.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(name) = value.strip_prefix('@') {
        let name = name.trim();
        return (!name.is_empty()).then(|| name.to_lowercase());
    }

    [profile_url(), bare_username()]
        .into_iter()
        .filter_map(|re| re.captures(value))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_lowercase()))
        .find(|name| !RESERVED.contains(&name.as_str()))
}

/// Parses all rows, keeping roster order and dropping rows without a username.
pub fn parse_rows(rows: &[String]) -> Vec<String> {
    rows.iter().filter_map(|row| extract_username(row)).collect()
}
