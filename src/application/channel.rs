//! # Channel Filter
//!
//! Decides whether an inbound post comes from the designated source channel.
//! The configured id may carry a numeric prefix (e.g. `-100`) that some clients
//! omit, so both forms are accepted.

#[derive(Debug, Clone)]
pub struct ChannelFilter {
    channel_id: String,
    prefix: String,
}

impl ChannelFilter {
    pub fn new(channel_id: &str, prefix: &str) -> Self {
        Self {
            channel_id: channel_id.trim().to_string(),
            prefix: prefix.to_string(),
        }
    }

    pub fn matches(&self, incoming: &str) -> bool {
        if incoming == self.channel_id {
            return true;
        }
        !self.prefix.is_empty() && incoming == self.channel_id.replacen(&self.prefix, "", 1)
    }
}

/// The text worth forwarding from a post: the body, else the caption, when not blank.
pub fn forwardable_text<'a>(body: Option<&'a str>, caption: Option<&'a str>) -> Option<&'a str> {
    [body, caption]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|text| !text.is_empty())
}
