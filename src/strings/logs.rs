use std::time::Duration;

use crate::domain::types::ApiError;

pub const STARTING: &str = "Starting Lookout...";
pub const SHUTDOWN: &str = "Shutting down...";
pub const LOGIN_SUCCESS: &str = "Logged in successfully!";
pub const CONFIG_READ_ERROR: &str = "Failed to load configuration";
pub const NO_CREDENTIALS: &str = "No social API credentials configured";
pub const SOCIAL_DISABLED: &str =
    "No social API credentials configured - official and tracked account monitors are disabled";
pub const NO_MANAGERS: &str = "No managers configured - tracked posts are dropped";
pub const IDS_ALL_CACHED: &str = "All tracked account ids already cached";
pub const CHECKING_OFFICIAL: &str = "Checking official account...";
pub const CHECKING_FEED: &str = "Checking feed...";
pub const CHECKING_TRACKED: &str = "Checking tracked account posts...";
pub const RELOADING_ROSTER: &str = "Reloading tracked account roster...";

pub fn config_loaded(user: &str) -> String {
    format!("Loaded configuration for user: {user}")
}

pub fn setting_display_name(name: &str) -> String {
    format!("Setting display name to: {name}")
}

pub fn set_display_name_fail(err: &str) -> String {
    format!("Failed to set display name: {err}")
}

pub fn sync_loop_fail(err: &str) -> String {
    format!("Sync loop failed: {err}")
}

pub fn shutdown_fail(err: &str) -> String {
    format!("Unable to listen for shutdown signal: {err}")
}

pub fn startup_summary(credentials: usize, team: usize, managers: usize) -> String {
    format!(
        "Social API credentials: {credentials}, team members: {team}, managers: {managers}"
    )
}

pub fn credential_success(label: &str, credential: &str) -> String {
    format!("API call {label} succeeded with {credential}")
}

pub fn credential_rate_limited(label: &str, credential: &str) -> String {
    format!("Rate limit on {credential} during {label}, trying next...")
}

pub fn credential_failed(label: &str, credential: &str, err: &ApiError) -> String {
    format!("Error with {credential} during {label}: {err}")
}

pub fn all_credentials_failed(label: &str, failures: &[String]) -> String {
    format!("All credentials failed for {label}: [{}]", failures.join("; "))
}

pub fn user_not_found(username: &str) -> String {
    format!("Could not resolve account @{username}")
}

pub fn caching_ids(count: usize) -> String {
    format!("Caching account ids for {count} tracked accounts...")
}

pub fn cached_ids(count: usize, batch: usize) -> String {
    format!("Cached {count} account ids (batch {batch})")
}

pub fn new_official_posts(count: usize, handle: &str) -> String {
    format!("Found {count} new posts from @{handle}")
}

pub fn roster_loaded(count: usize) -> String {
    format!("Loaded {count} tracked accounts from roster")
}

pub fn roster_fetch_failed(err: &str) -> String {
    format!("Error loading tracked account roster: {err}")
}

pub fn checking_tracked(count: usize) -> String {
    format!("Checking {count} tracked accounts for new posts...")
}

pub fn tracked_fetch_failed(username: &str) -> String {
    format!("Skipping @{username} this run: no credential could fetch posts")
}

pub fn tracked_mentions(count: usize, handle: &str) -> String {
    format!("Found {count} new tracked posts mentioning @{handle}")
}

pub fn tracked_assigned(manager: &str) -> String {
    format!("Tracked post notification sent to {manager}")
}

pub fn feed_failed(err: &ApiError) -> String {
    format!("Error checking feed: {err}")
}

pub fn new_articles(count: usize) -> String {
    format!("Found {count} new feed articles")
}

pub fn delivery_failed(recipient: &str, err: &str) -> String {
    format!("Error sending notification to {recipient}: {err}")
}

pub fn job_scheduled(name: &str, period: Duration) -> String {
    format!("Job [{name}] scheduled every {} min", period.as_secs() / 60)
}

pub fn job_stopped(name: &str) -> String {
    format!("Job [{name}] stopped")
}

pub fn channel_post_received(channel: &str) -> String {
    format!("Forwarding post from source channel {channel}")
}
