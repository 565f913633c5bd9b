//! In-Memory Conversation Adapter
//!
//! Information Hiding:
//! - Vec storage and index cursors hidden from callers
//! - Thread-safe access via RwLock hidden behind async interface
//! - Suitable for testing, demos and local-only conversations

use super::{paginate_backward, ConversationAdapter, MessagePage, PageRequest};
use crate::core::UnifiedMessage;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory history for a single conversation
/// Data is lost when process terminates
pub struct InMemoryAdapter {
    key: String,
    messages: Arc<RwLock<Vec<UnifiedMessage>>>,
    fetches: AtomicUsize,
}

impl InMemoryAdapter {
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_messages(key, Vec::new())
    }

    pub fn with_messages(key: impl Into<String>, messages: Vec<UnifiedMessage>) -> Self {
        Self {
            key: key.into(),
            messages: Arc::new(RwLock::new(messages)),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Append a message as if the backend had persisted it
    pub async fn push(&self, message: UnifiedMessage) {
        let mut messages = self.messages.write().await;
        messages.push(message);
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Number of `list_messages` calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversationAdapter for InMemoryAdapter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn list_messages(&self, request: PageRequest) -> Result<MessagePage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let messages = self.messages.read().await;
        let page = paginate_backward(&messages, &request)?;
        tracing::debug!(
            "[InMemoryAdapter] Served {} messages for '{}' (has_more: {})",
            page.items.len(),
            self.key,
            page.has_more
        );
        Ok(page)
    }
}
