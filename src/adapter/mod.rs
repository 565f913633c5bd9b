//! Conversation Adapter Abstraction
//!
//! Information Hiding:
//! - Backend transport (memory, file, HTTP) hidden behind one paging call
//! - Cursor encoding is private to each adapter
//! - The engine only ever sees pages of `UnifiedMessage`

use crate::core::{Cursor, UnifiedMessage};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod filesystem;
pub mod http;
pub mod memory;

/// Request for one page of history, walking backwards from `cursor`
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// `None` starts from the newest end of the conversation
    pub cursor: Option<Cursor>,
    pub page_size: usize,
}

/// One page of messages, oldest to newest
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    #[serde(default)]
    pub items: Vec<UnifiedMessage>,
    #[serde(default)]
    pub next_cursor: Option<Cursor>,
    #[serde(default)]
    pub has_more: bool,
}

/// Trait defining the paged message source for one conversation
/// Implementations talk to the real backend; the engine owns no transport
#[async_trait]
pub trait ConversationAdapter: Send + Sync {
    /// Stable identity of the conversation this adapter serves
    fn key(&self) -> &str;

    /// Fetch the page that ends just before `request.cursor`
    async fn list_messages(&self, request: PageRequest) -> Result<MessagePage>;
}

/// Page backwards through an oldest-to-newest slice.
///
/// The cursor is the index of the oldest message already delivered, so the
/// next page ends right before it.
pub fn paginate_backward(messages: &[UnifiedMessage], request: &PageRequest) -> Result<MessagePage> {
    let end = match &request.cursor {
        None => messages.len(),
        Some(cursor) => {
            let index = cursor
                .as_u64()
                .ok_or_else(|| anyhow!("Unsupported cursor '{}': expected a message index", cursor))?;
            usize::try_from(index)?.min(messages.len())
        }
    };

    let page_size = request.page_size.max(1);
    let start = end.saturating_sub(page_size);
    let has_more = start > 0;

    Ok(MessagePage {
        items: messages[start..end].to_vec(),
        next_cursor: has_more.then(|| Cursor::from(start as u64)),
        has_more,
    })
}
