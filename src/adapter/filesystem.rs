//! File System Conversation Adapter
//!
//! Information Hiding:
//! - File paths and JSON serialization format hidden from users
//! - Paging over the stored history hidden behind the adapter trait

use super::{paginate_backward, ConversationAdapter, MessagePage, PageRequest};
use crate::core::UnifiedMessage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File system adapter - each conversation is a JSON array file
/// Files are read from {base_path}/{key}.json
pub struct FileSystemAdapter {
    key: String,
    path: PathBuf,
}

impl FileSystemAdapter {
    pub fn new(base_path: impl AsRef<Path>, key: impl Into<String>) -> Self {
        let key = key.into();
        let path = Self::conversation_path(base_path.as_ref(), &key);
        Self { key, path }
    }

    pub fn conversation_path(base_path: &Path, key: &str) -> PathBuf {
        base_path.join(format!("{}.json", key))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a full history to disk, creating the directory if needed
    pub async fn save(base_path: impl AsRef<Path>, key: &str, messages: &[UnifiedMessage]) -> Result<()> {
        let base_path = base_path.as_ref();
        fs::create_dir_all(base_path)
            .await
            .context("Failed to create conversation directory")?;

        let path = Self::conversation_path(base_path, key);
        let json = serde_json::to_string_pretty(messages)
            .context("Failed to serialize conversation history")?;

        fs::write(&path, json)
            .await
            .context(format!("Failed to write conversation file: {:?}", path))?;

        tracing::debug!(
            "[FileSystemAdapter] Saved {} messages for '{}' to {:?}",
            messages.len(),
            key,
            path
        );
        Ok(())
    }

    async fn load(&self) -> Result<Vec<UnifiedMessage>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            tracing::debug!("[FileSystemAdapter] Conversation '{}' does not exist", self.key);
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&self.path)
            .await
            .context(format!("Failed to read conversation file: {:?}", self.path))?;

        serde_json::from_str(&json).context("Failed to deserialize conversation history")
    }
}

#[async_trait]
impl ConversationAdapter for FileSystemAdapter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn list_messages(&self, request: PageRequest) -> Result<MessagePage> {
        let messages = self.load().await?;
        let page = paginate_backward(&messages, &request)?;

        tracing::debug!(
            "[FileSystemAdapter] Served {} of {} messages for '{}' from {:?}",
            page.items.len(),
            messages.len(),
            self.key,
            self.path
        );
        Ok(page)
    }
}
