//! Conversation State Engine
//!
//! Information Hiding:
//! - Cache hydration and write-through hidden behind the mutation operations
//! - Pagination cursors never leave the engine
//! - Observers only see immutable snapshots published on a watch channel
//!
//! The engine is bound to at most one adapter at a time. Every async load
//! remembers the key and generation it started under and drops its result
//! if the engine has been rebound, unbound or reset in the meantime.

pub mod state;

pub use state::{ConversationOptions, ConversationSnapshot, MessagesUpdate};

use crate::adapter::{ConversationAdapter, PageRequest};
use crate::cache::{CacheEntry, CacheStore};
use crate::core::{dedupe_owned, UnifiedMessage};
use crate::error::{ConversationError, ConversationResult};
use serde_json::{Map, Value};
use state::EngineState;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

struct EngineInner {
    state: Mutex<EngineState>,
    store: CacheStore,
    options: ConversationOptions,
    updates: watch::Sender<ConversationSnapshot>,
}

/// Cached, paginated view over one conversation at a time.
///
/// Cloning the engine yields another handle to the same state, so a UI task
/// can rebind while another task is still awaiting a page.
#[derive(Clone)]
pub struct ConversationEngine {
    inner: Arc<EngineInner>,
}

impl ConversationEngine {
    pub fn new(store: CacheStore, options: ConversationOptions) -> ConversationResult<Self> {
        options.validate()?;
        let (updates, _) = watch::channel(ConversationSnapshot::default());

        Ok(Self {
            inner: Arc::new(EngineInner {
                state: Mutex::new(EngineState::default()),
                store,
                options,
                updates,
            }),
        })
    }

    pub fn options(&self) -> &ConversationOptions {
        &self.inner.options
    }

    pub fn store(&self) -> &CacheStore {
        &self.inner.store
    }

    /// Receive a fresh snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.inner.updates.subscribe()
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.lock().snapshot()
    }

    pub fn current_key(&self) -> Option<String> {
        self.lock().current_key.clone()
    }

    pub fn messages(&self) -> Vec<UnifiedMessage> {
        self.lock().messages.clone()
    }

    pub fn has_more_before(&self) -> bool {
        self.lock().has_more
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading
    }

    pub fn error(&self) -> Option<ConversationError> {
        self.lock().error.clone()
    }

    /// Bind to `adapter`'s conversation.
    ///
    /// Rebinding to the key already bound is a no-op. A cached conversation
    /// is hydrated without touching the adapter; anything else is loaded.
    pub async fn bind(&self, adapter: Arc<dyn ConversationAdapter>) {
        let key = adapter.key().to_string();

        let hydrated = {
            let mut state = self.lock();
            if state.is_bound_to(&key) {
                return;
            }

            tracing::debug!(
                "[ConversationEngine] Binding '{}' (previous: {:?})",
                key,
                state.current_key
            );
            state.adapter = Some(adapter);
            state.current_key = Some(key.clone());
            state.next_generation();
            state.clear();

            let hydrated = self.hydrate_from_cache(&mut state, &key);
            self.publish(&state);
            hydrated
        };

        if !hydrated {
            self.load_initial(true).await;
        }
    }

    /// Drop the adapter and all local state. The cache is left intact.
    pub fn unbind(&self) {
        let mut state = self.lock();
        if let Some(key) = state.current_key.take() {
            tracing::debug!("[ConversationEngine] Unbound '{}'", key);
        }
        state.adapter = None;
        state.next_generation();
        state.clear();
        self.publish(&state);
    }

    /// Load the newest page, replacing the current list.
    ///
    /// Without `force` a cached entry is used instead of the adapter.
    /// Failures land in the snapshot's `error`; loaded messages are kept.
    pub async fn load_initial(&self, force: bool) {
        let (adapter, key, generation) = {
            let mut state = self.lock();
            let Some(adapter) = state.adapter.clone() else {
                return;
            };
            let key = adapter.key().to_string();

            if !force && self.hydrate_from_cache(&mut state, &key) {
                self.publish(&state);
                return;
            }

            state.is_loading = true;
            state.error = None;
            self.publish(&state);
            (adapter, key, state.generation)
        };

        let request = PageRequest {
            cursor: None,
            page_size: self.inner.options.page_size,
        };
        let result = adapter.list_messages(request).await;

        let mut state = self.lock();
        if !state.is_current(&key, generation) {
            tracing::debug!(
                "[ConversationEngine] Discarding initial page for '{}': engine rebound or reset",
                key
            );
            return;
        }

        match result {
            Ok(page) => {
                tracing::debug!(
                    "[ConversationEngine] Loaded {} messages for '{}' (has_more: {})",
                    page.items.len(),
                    key,
                    page.has_more
                );
                state.messages = dedupe_owned(page.items);
                state.next_cursor = page.next_cursor;
                state.has_more = page.has_more;
                self.write_through(&state);
            }
            Err(e) => {
                tracing::warn!("[ConversationEngine] Initial load failed for '{}': {:#}", key, e);
                state.error = Some(ConversationError::fetch_failed(&key, &e));
            }
        }

        state.is_loading = false;
        self.publish(&state);
    }

    /// Fetch the page before the oldest loaded message and prepend it.
    ///
    /// No-op when unbound or when there is nothing older to fetch.
    pub async fn load_more_before(&self) {
        let (adapter, key, generation, cursor) = {
            let mut state = self.lock();
            let Some(adapter) = state.adapter.clone() else {
                return;
            };
            if !state.has_more {
                return;
            }
            let Some(cursor) = state.next_cursor.clone() else {
                return;
            };
            let key = adapter.key().to_string();

            state.is_loading = true;
            state.error = None;
            self.publish(&state);
            (adapter, key, state.generation, cursor)
        };

        let request = PageRequest {
            cursor: Some(cursor),
            page_size: self.inner.options.page_size,
        };
        let result = adapter.list_messages(request).await;

        let mut state = self.lock();
        if !state.is_current(&key, generation) {
            tracing::debug!(
                "[ConversationEngine] Discarding older page for '{}': engine rebound or reset",
                key
            );
            return;
        }

        match result {
            Ok(page) => {
                tracing::debug!(
                    "[ConversationEngine] Prepending {} older messages to '{}' (has_more: {})",
                    page.items.len(),
                    key,
                    page.has_more
                );
                let mut combined = dedupe_owned(page.items);
                combined.append(&mut state.messages);
                state.messages = dedupe_owned(combined);
                state.next_cursor = page.next_cursor;
                state.has_more = page.has_more;
                self.write_through(&state);
            }
            Err(e) => {
                tracing::warn!(
                    "[ConversationEngine] Loading older messages failed for '{}': {:#}",
                    key,
                    e
                );
                state.error = Some(ConversationError::fetch_failed(&key, &e));
            }
        }

        state.is_loading = false;
        self.publish(&state);
    }

    /// Optimistically add a message at the end. An id that is already
    /// present keeps its existing entry.
    pub fn append_message(&self, message: UnifiedMessage) {
        let mut state = self.lock();
        if !message.has_id() || state.messages.iter().any(|m| m.id == message.id) {
            tracing::debug!(
                "[ConversationEngine] Ignoring append of duplicate or anonymous message '{}'",
                message.id
            );
            return;
        }

        state.messages.push(message);
        self.write_through(&state);
        self.publish(&state);
    }

    /// Replace the list, or derive a new one from it. The result is deduplicated.
    ///
    /// An `Update` closure runs under the engine lock and must not call back
    /// into the engine.
    pub fn set_messages(&self, update: impl Into<MessagesUpdate>) {
        let mut state = self.lock();
        let next = update.into().apply(&state.messages);
        state.messages = dedupe_owned(next);
        self.write_through(&state);
        self.publish(&state);
    }

    pub fn update_messages<F>(&self, f: F)
    where
        F: FnOnce(&[UnifiedMessage]) -> Vec<UnifiedMessage> + Send + 'static,
    {
        self.set_messages(MessagesUpdate::update(f));
    }

    /// Shallow-merge `patch` into the message with `id`. Unknown ids are ignored.
    pub fn replace_message(&self, id: &str, patch: Map<String, Value>) {
        let mut state = self.lock();
        let Some(message) = state.messages.iter_mut().find(|m| m.id == id) else {
            return;
        };

        message.apply_patch(&patch);
        self.write_through(&state);
        self.publish(&state);
    }

    /// Swap an optimistic message for the server-confirmed one.
    ///
    /// If `final_message`'s id is already in the list the temporary entry is
    /// dropped instead. If `temp_id` is gone the final message is appended.
    /// A final message without an id only removes the temporary entry.
    pub fn finalize_message(&self, temp_id: &str, final_message: UnifiedMessage) {
        let mut state = self.lock();

        if temp_id == final_message.id {
            if let Some(existing) = state.messages.iter_mut().find(|m| m.id == temp_id) {
                *existing = final_message;
            }
        } else if state.messages.iter().any(|m| m.id == final_message.id) {
            state.messages.retain(|m| m.id != temp_id);
        } else if let Some(position) = state.messages.iter().position(|m| m.id == temp_id) {
            if final_message.has_id() {
                state.messages[position] = final_message;
            } else {
                state.messages.remove(position);
            }
        } else if final_message.has_id() {
            state.messages.push(final_message);
        }

        self.write_through(&state);
        self.publish(&state);
    }

    /// Forget the bound conversation locally and in the cache.
    ///
    /// Loads still in flight for it are discarded when they complete.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.next_generation();
        state.clear();
        if let Some(key) = state.current_key.as_deref() {
            self.inner.store.delete(key);
            tracing::debug!("[ConversationEngine] Reset '{}'", key);
        }
        self.publish(&state);
    }

    fn hydrate_from_cache(&self, state: &mut EngineState, key: &str) -> bool {
        if !self.inner.options.enable_cache {
            return false;
        }

        match self.inner.store.get(key) {
            Some(entry) => {
                tracing::debug!(
                    "[ConversationEngine] Cache hit for '{}' ({} messages)",
                    key,
                    entry.messages.len()
                );
                state.messages = entry.messages;
                state.next_cursor = entry.next_cursor;
                state.has_more = entry.has_more;
                state.error = None;
                state.is_loading = false;
                true
            }
            None => {
                tracing::debug!("[ConversationEngine] Cache miss for '{}'", key);
                false
            }
        }
    }

    fn write_through(&self, state: &EngineState) {
        if !self.inner.options.enable_cache {
            return;
        }
        let Some(key) = state.current_key.as_deref() else {
            return;
        };

        let entry = CacheEntry::new(
            state.messages.clone(),
            state.next_cursor.clone(),
            state.has_more,
        );
        self.inner.store.set(key, entry, self.inner.options.cache_size);
    }

    fn publish(&self, state: &EngineState) {
        self.inner.updates.send_replace(state.snapshot());
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
