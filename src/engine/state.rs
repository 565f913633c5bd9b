use crate::adapter::ConversationAdapter;
use crate::core::{Cursor, UnifiedMessage};
use crate::error::{ConversationError, ConversationResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: usize = 30;
pub const DEFAULT_CACHE_SIZE: usize = 20;

/// Tuning knobs for a [`ConversationEngine`](super::ConversationEngine)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationOptions {
    /// Items requested per page
    pub page_size: usize,
    /// When false the cache is neither read nor written
    pub enable_cache: bool,
    /// Maximum number of conversations kept in the shared cache
    pub cache_size: usize,
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            enable_cache: true,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl ConversationOptions {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_cache(mut self, enable_cache: bool) -> Self {
        self.enable_cache = enable_cache;
        self
    }

    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn validate(&self) -> ConversationResult<()> {
        if self.page_size == 0 {
            return Err(ConversationError::InvalidOptions(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.cache_size == 0 {
            return Err(ConversationError::InvalidOptions(
                "cache_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Observable state of one engine, published on every change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationSnapshot {
    /// Bound conversation, `None` while unbound
    pub key: Option<String>,
    pub messages: Vec<UnifiedMessage>,
    pub has_more_before: bool,
    pub is_loading: bool,
    pub error: Option<ConversationError>,
}

/// Argument to `set_messages`: a new list or a function of the current one
pub enum MessagesUpdate {
    Replace(Vec<UnifiedMessage>),
    Update(Box<dyn FnOnce(&[UnifiedMessage]) -> Vec<UnifiedMessage> + Send>),
}

impl MessagesUpdate {
    pub fn update<F>(f: F) -> Self
    where
        F: FnOnce(&[UnifiedMessage]) -> Vec<UnifiedMessage> + Send + 'static,
    {
        Self::Update(Box::new(f))
    }

    pub(crate) fn apply(self, current: &[UnifiedMessage]) -> Vec<UnifiedMessage> {
        match self {
            Self::Replace(messages) => messages,
            Self::Update(f) => f(current),
        }
    }
}

impl From<Vec<UnifiedMessage>> for MessagesUpdate {
    fn from(messages: Vec<UnifiedMessage>) -> Self {
        Self::Replace(messages)
    }
}

impl fmt::Debug for MessagesUpdate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace(messages) => formatter
                .debug_tuple("Replace")
                .field(&messages.len())
                .finish(),
            Self::Update(_) => formatter.write_str("Update(..)"),
        }
    }
}

/// Internal mutable state behind the engine's lock
#[derive(Default)]
pub(crate) struct EngineState {
    pub(crate) adapter: Option<Arc<dyn ConversationAdapter>>,
    pub(crate) current_key: Option<String>,
    pub(crate) messages: Vec<UnifiedMessage>,
    pub(crate) next_cursor: Option<Cursor>,
    pub(crate) has_more: bool,
    pub(crate) is_loading: bool,
    pub(crate) error: Option<ConversationError>,
    /// Bumped on bind, unbind and reset; loads started under an older
    /// generation are discarded
    pub(crate) generation: u64,
}

impl EngineState {
    pub(crate) fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            key: self.current_key.clone(),
            messages: self.messages.clone(),
            has_more_before: self.has_more,
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }

    /// Drop conversation data but keep the binding
    pub(crate) fn clear(&mut self) {
        self.messages.clear();
        self.next_cursor = None;
        self.has_more = false;
        self.is_loading = false;
        self.error = None;
    }

    pub(crate) fn is_bound_to(&self, key: &str) -> bool {
        self.current_key.as_deref() == Some(key)
    }

    pub(crate) fn next_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub(crate) fn is_current(&self, key: &str, generation: u64) -> bool {
        self.generation == generation && self.is_bound_to(key)
    }
}
