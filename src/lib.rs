//! Convcache - cached, paginated conversation state for chat front-ends
//!
//! This library keeps per-conversation message lists in a shared LRU cache,
//! pages backwards through history via pluggable adapters, and publishes
//! observable snapshots for any UI layer to render.

pub mod adapter;
pub mod cache;
mod config;
pub mod core;
pub mod engine;
mod error;

pub mod api;
pub mod cli;
pub mod utils;

pub use crate::adapter::{ConversationAdapter, MessagePage, PageRequest};
pub use crate::api::{ConversationHub, SourceType};
pub use crate::cache::{CacheEntry, CacheStore, LruStore};
pub use crate::config::{ConversationConfig, HttpConfig, LoggingConfig, Settings};
pub use crate::core::{dedupe, Cursor, UnifiedMessage};
pub use crate::engine::{ConversationEngine, ConversationOptions, ConversationSnapshot, MessagesUpdate};
pub use crate::error::{ConversationError, ConversationResult};
