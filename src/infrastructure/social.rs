//! X API v2 provider
//!
//! Implements `SocialApi` over plain HTTP with bearer authentication. Responses are
//! decoded into typed structs; a response without the expected `data` is a failure.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::domain::traits::SocialApi;
use crate::domain::types::{Account, ApiError, ApiPost, Credential};

/// Envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<ApiProblem>,
}

#[derive(Debug, Deserialize)]
struct ApiProblem {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl ApiProblem {
    fn describe(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

pub struct XApiClient {
    client: Client,
    base_url: String,
}

impl XApiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Envelope<T>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(credential.token())
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        decode(status, &body)
    }
}

/// Maps an HTTP response onto the envelope or the matching error.
fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<Envelope<T>, ApiError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ApiError::RateLimited);
    }
    if !status.is_success() {
        return Err(ApiError::Http {
            status: status.as_u16(),
            body: body.chars().take(300).collect(),
        });
    }
    serde_json::from_str(body).map_err(|e| ApiError::Malformed(e.to_string()))
}

#[async_trait]
impl SocialApi for XApiClient {
    async fn user_by_username(
        &self,
        credential: &Credential,
        username: &str,
    ) -> Result<Account, ApiError> {
        let path = format!("/users/by/username/{}", username);
        let envelope: Envelope<Account> = self.get(credential, &path, &[]).await?;
        match envelope.data {
            Some(account) => Ok(account),
            None => Err(ApiError::NotFound(
                envelope
                    .errors
                    .first()
                    .map(ApiProblem::describe)
                    .unwrap_or_else(|| username.to_string()),
            )),
        }
    }

    async fn users_by_usernames(
        &self,
        credential: &Credential,
        usernames: &[String],
    ) -> Result<Vec<Account>, ApiError> {
        if usernames.is_empty() {
            return Ok(Vec::new());
        }
        let query = [("usernames", usernames.join(","))];
        let envelope: Envelope<Vec<Account>> = self.get(credential, "/users/by", &query).await?;
        // Unknown usernames only show up in `errors`.
        Ok(envelope.data.unwrap_or_default())
    }

    async fn user_posts(
        &self,
        credential: &Credential,
        user_id: &str,
        since_id: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<ApiPost>, ApiError> {
        let path = format!("/users/{}/tweets", user_id);
        let mut query = vec![
            // The endpoint accepts 5..=100.
            ("max_results", max_results.clamp(5, 100).to_string()),
            ("tweet.fields", "created_at,text".to_string()),
        ];
        if let Some(since) = since_id {
            query.push(("since_id", since.to_string()));
        }

        let envelope: Envelope<Vec<ApiPost>> = self.get(credential, &path, &query).await?;
        match envelope.data {
            Some(posts) => Ok(posts),
            None if envelope.errors.is_empty() => Ok(Vec::new()),
            None => Err(ApiError::Malformed(envelope.errors[0].describe())),
        }
    }
}
