//! # Roster Sources
//!
//! The tracked-account roster is either a spreadsheet exported as CSV (first
//! column, header row skipped) or a list written directly into the config.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::domain::traits::RosterSource;

/// Roster published as a CSV export (e.g. a shared spreadsheet).
pub struct SheetRoster {
    client: Client,
    url: String,
}

impl SheetRoster {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build roster HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl RosterSource for SheetRoster {
    async fn fetch_rows(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Roster request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Roster request returned HTTP {}", status.as_u16());
        }

        let body = response.text().await.context("Failed to read roster body")?;
        Ok(first_column(&body))
    }
}

/// Roster listed inline in the configuration.
pub struct StaticRoster {
    rows: Vec<String>,
}

impl StaticRoster {
    pub fn new(rows: Vec<String>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl RosterSource for StaticRoster {
    async fn fetch_rows(&self) -> Result<Vec<String>> {
        Ok(self.rows.clone())
    }
}

/// First cell of every CSV line after the header.
pub fn first_column(csv: &str) -> Vec<String> {
    csv.lines()
        .skip(1)
        .map(first_cell)
        .filter(|cell| !cell.trim().is_empty())
        .collect()
}

fn first_cell(line: &str) -> String {
    let line = line.trim_end_matches('\r');
    let Some(quoted) = line.strip_prefix('"') else {
        return line.split(',').next().unwrap_or_default().to_string();
    };

    // Quoted cell: commas are literal and "" is an escaped quote.
    let mut cell = String::new();
    let mut chars = quoted.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                cell.push('"');
                chars.next();
            } else {
                break;
            }
        } else {
            cell.push(c);
        }
    }
    cell
}
