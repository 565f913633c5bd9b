//! HTTP Conversation Adapter
//!
//! Information Hiding:
//! - REST endpoint layout and query encoding hidden
//! - Timeout handling delegated to the reqwest client
//! - Backend error bodies folded into the returned error

use super::{ConversationAdapter, MessagePage, PageRequest};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tokio::time::Duration;

/// Adapter backed by the chat backend's REST API
///
/// `GET {base_url}/conversations/{key}/messages?pageSize=N&cursor=C`
pub struct HttpAdapter {
    key: String,
    endpoint: Url,
    client: Client,
}

impl HttpAdapter {
    pub fn new(base_url: &str, key: impl Into<String>, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;
        Self::with_client(client, base_url, key)
    }

    pub fn with_client(client: Client, base_url: &str, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let mut endpoint =
            Url::parse(base_url).context(format!("Invalid backend URL: {}", base_url))?;

        endpoint
            .path_segments_mut()
            .map_err(|_| anyhow!("Backend URL cannot be a base: {}", base_url))?
            .pop_if_empty()
            .extend(["conversations", key.as_str(), "messages"]);

        Ok(Self { key, endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn encode_cursor(cursor: &Value) -> String {
        match cursor {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl ConversationAdapter for HttpAdapter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn list_messages(&self, request: PageRequest) -> Result<MessagePage> {
        let mut query = vec![("pageSize", request.page_size.to_string())];
        if let Some(cursor) = &request.cursor {
            query.push(("cursor", Self::encode_cursor(cursor.as_value())));
        }

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&query)
            .send()
            .await
            .context(format!("HTTP request failed for conversation '{}'", self.key))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                "[HttpAdapter] Backend returned error status {} for '{}': {}",
                status,
                self.key,
                error_text
            );
            return Err(anyhow!("Backend error {}: {}", status, error_text));
        }

        let page = response
            .json::<MessagePage>()
            .await
            .context("Failed to decode message page")?;

        tracing::debug!(
            "[HttpAdapter] Received {} messages for '{}' (has_more: {})",
            page.items.len(),
            self.key,
            page.has_more
        );
        Ok(page)
    }
}
