//! Application-level entry points
//!
//! A `ConversationHub` is created once at startup and owns the cache store
//! shared by every engine it hands out.

use crate::adapter::{
    filesystem::FileSystemAdapter, http::HttpAdapter, memory::InMemoryAdapter, ConversationAdapter,
};
use crate::cache::CacheStore;
use crate::config::Settings;
use crate::core::UnifiedMessage;
use crate::engine::{ConversationEngine, ConversationOptions};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Backend to read a conversation from
#[derive(Debug, Clone)]
pub enum SourceType {
    /// Fixed in-memory history (demos and tests)
    Memory(Vec<UnifiedMessage>),
    /// `{dir}/{key}.json` files
    FileSystem(PathBuf),
    /// REST backend at the given base URL
    Http(String),
}

pub struct ConversationHub {
    store: CacheStore,
    options: ConversationOptions,
    http_timeout_ms: u64,
}

impl ConversationHub {
    pub fn new(options: ConversationOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            store: CacheStore::new(),
            options,
            http_timeout_ms: 10_000,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut hub = Self::new(settings.conversation_options())?;
        hub.http_timeout_ms = settings.http.timeout_ms;
        Ok(hub)
    }

    /// # Example
    /// ```no_run
    /// use convcache::api::{ConversationHub, SourceType};
    /// use convcache::ConversationOptions;
    /// use std::path::PathBuf;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let hub = ConversationHub::new(ConversationOptions::default())?;
    ///     let engine = hub.engine()?;
    ///
    ///     let adapter = hub.open(SourceType::FileSystem(PathBuf::from("./conversations")), "chat-1")?;
    ///     engine.bind(adapter).await;
    ///     engine.load_more_before().await;
    ///
    ///     println!("{} messages", engine.messages().len());
    ///     Ok(())
    /// }
    /// ```
    pub fn engine(&self) -> Result<ConversationEngine> {
        Ok(ConversationEngine::new(self.store.clone(), self.options)?)
    }

    pub fn open(&self, source: SourceType, key: impl Into<String>) -> Result<Arc<dyn ConversationAdapter>> {
        let adapter: Arc<dyn ConversationAdapter> = match source {
            SourceType::Memory(messages) => Arc::new(InMemoryAdapter::with_messages(key, messages)),
            SourceType::FileSystem(path) => Arc::new(FileSystemAdapter::new(path, key)),
            SourceType::Http(base_url) => {
                Arc::new(HttpAdapter::new(&base_url, key, self.http_timeout_ms)?)
            }
        };
        Ok(adapter)
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn options(&self) -> &ConversationOptions {
        &self.options
    }
}
