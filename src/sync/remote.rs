//! HTTP remote
//!
//! Reads a JSON array of posts and treats each post's `title` as quote text.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::storage::settings::AppSettings;
use crate::sync::{RemoteSource, SyncError};
use crate::types::{validate, Quote};

pub struct HttpRemote {
    client: reqwest::Client,
    fetch_url: String,
    push_url: String,
    server_category: String,
    fetch_limit: usize,
}

impl HttpRemote {
    pub fn new(settings: &AppSettings) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(concat!("quotebook/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, settings))
    }

    pub fn with_client(client: reqwest::Client, settings: &AppSettings) -> Self {
        Self {
            client,
            fetch_url: settings.fetch_url.clone(),
            push_url: settings.push_url.clone(),
            server_category: settings.server_category.clone(),
            fetch_limit: settings.fetch_limit,
        }
    }
}

#[async_trait]
impl RemoteSource for HttpRemote {
    async fn fetch_quotes(&self) -> Result<Vec<Quote>, SyncError> {
        let response = self.client.get(&self.fetch_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                status: status.as_u16(),
                url: self.fetch_url.clone(),
            });
        }

        let body = response.text().await?;
        let posts: Value =
            serde_json::from_str(&body).map_err(|e| SyncError::MalformedBody(e.to_string()))?;
        let posts = posts
            .as_array()
            .ok_or_else(|| SyncError::MalformedBody("expected a JSON array".into()))?;

        let quotes = posts_to_quotes(posts, &self.server_category, self.fetch_limit);
        tracing::debug!("Fetched {} server quotes from {}", quotes.len(), self.fetch_url);
        Ok(quotes)
    }

    async fn push_quotes(&self, quotes: &[Quote]) -> Result<(), SyncError> {
        let response = self.client.post(&self.push_url).json(quotes).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                status: status.as_u16(),
                url: self.push_url.clone(),
            });
        }

        tracing::debug!("Pushed {} quotes to {}", quotes.len(), self.push_url);
        Ok(())
    }
}

/// Map server posts to quotes, skipping posts without a usable title
fn posts_to_quotes(posts: &[Value], category: &str, limit: usize) -> Vec<Quote> {
    posts
        .iter()
        .filter_map(|post| post.get("title").and_then(Value::as_str))
        .filter_map(|title| validate(title, category).ok())
        .take(limit)
        .collect()
}
