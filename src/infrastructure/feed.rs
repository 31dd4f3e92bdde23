//! # Feed Source
//!
//! Fetches a syndication feed over HTTP and parses RSS 2.0 or Atom documents
//! into `FeedEntry` values, keeping document order.

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use serde::Deserialize;
use std::borrow::Cow;
use std::ops::Range;
use std::time::Duration;

use crate::domain::traits::FeedSource;
use crate::domain::types::{ApiError, FeedEntry};

/// Text content of an element that may carry attributes.
#[derive(Debug, Default, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

impl Text {
    fn into_option(self) -> Option<String> {
        let value = self.value.trim().to_string();
        (!value.is_empty()).then_some(value)
    }
}

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: Option<Text>,
    #[serde(default)]
    link: Option<Text>,
    #[serde(default)]
    guid: Option<Text>,
    #[serde(default)]
    description: Option<Text>,
    // `<content:encoded>`; elements are matched by local name.
    #[serde(rename = "encoded", default)]
    content: Option<Text>,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<Text>,
}

impl From<RssItem> for FeedEntry {
    fn from(item: RssItem) -> Self {
        FeedEntry {
            id: item.guid.and_then(Text::into_option),
            title: item.title.and_then(Text::into_option),
            link: item.link.and_then(Text::into_option),
            summary: item
                .description
                .and_then(Text::into_option)
                .or_else(|| item.content.and_then(Text::into_option)),
            published: item.pub_date.and_then(Text::into_option),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    id: Option<Text>,
    #[serde(default)]
    title: Option<Text>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    #[serde(default)]
    summary: Option<Text>,
    #[serde(default)]
    content: Option<Text>,
    #[serde(default)]
    published: Option<Text>,
    #[serde(default)]
    updated: Option<Text>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
}

impl From<AtomEntry> for FeedEntry {
    fn from(entry: AtomEntry) -> Self {
        // Prefer the alternate link; a missing rel means alternate.
        let link = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref().is_none_or(|rel| rel == "alternate"))
            .or_else(|| entry.links.first())
            .map(|l| l.href.clone());

        FeedEntry {
            id: entry.id.and_then(Text::into_option),
            title: entry.title.and_then(Text::into_option),
            link,
            summary: entry
                .summary
                .and_then(Text::into_option)
                .or_else(|| entry.content.and_then(Text::into_option)),
            published: entry
                .published
                .and_then(Text::into_option)
                .or_else(|| entry.updated.and_then(Text::into_option)),
        }
    }
}

/// Parses an RSS 2.0 or Atom document.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, ApiError> {
    match root_element(xml)?.as_str() {
        "rss" => quick_xml::de::from_str::<RssDocument>(xml)
            .map(|doc| doc.channel.items.into_iter().map(FeedEntry::from).collect())
            .map_err(malformed),
        "feed" => {
            let xml = inline_xhtml(xml)?;
            quick_xml::de::from_str::<AtomFeed>(&xml)
                .map(|feed| feed.entries.into_iter().map(FeedEntry::from).collect())
                .map_err(malformed)
        }
        other => Err(ApiError::Malformed(format!("unsupported feed root <{}>", other))),
    }
}

fn malformed(e: impl std::fmt::Display) -> ApiError {
    ApiError::Malformed(e.to_string())
}

/// Local name of the first element, past the prolog, comments and doctype.
fn root_element(xml: &str) -> Result<String, ApiError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::Eof => return Err(ApiError::Malformed("no root element".into())),
            _ => {}
        }
    }
}

fn is_xhtml(start: &BytesStart) -> bool {
    matches!(start.local_name().as_ref(), b"summary" | b"content")
        && start
            .try_get_attribute("type")
            .ok()
            .flatten()
            .is_some_and(|attr| attr.value.as_ref() == b"xhtml")
}

/// Wraps the markup of `type="xhtml"` summaries and contents in CDATA so it
/// reads as text.
fn inline_xhtml(xml: &str) -> Result<Cow<'_, str>, ApiError> {
    let mut reader = Reader::from_str(xml);
    let mut spans: Vec<Range<usize>> = Vec::new();
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) if is_xhtml(&e) => {
                let span = reader.read_to_end(e.name()).map_err(malformed)?;
                spans.push(span.start as usize..span.end as usize);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if spans.is_empty() {
        return Ok(Cow::Borrowed(xml));
    }

    let mut out = String::with_capacity(xml.len() + spans.len() * 12);
    let mut last = 0;
    for span in spans {
        out.push_str(&xml[last..span.start]);
        out.push_str("<![CDATA[");
        out.push_str(&xml[span.clone()].replace("]]>", "]]&gt;"));
        out.push_str("]]>");
        last = span.end;
    }
    out.push_str(&xml[last..]);
    Ok(Cow::Owned(out))
}

pub struct HttpFeedSource {
    client: Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>, ApiError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        parse_feed(&body)
    }
}
