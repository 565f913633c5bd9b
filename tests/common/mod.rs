//! Shared test adapter with scripted responses

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use convcache::{ConversationAdapter, Cursor, MessagePage, PageRequest, UnifiedMessage};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Adapter that replays queued pages and records every request
pub struct ScriptedAdapter {
    key: String,
    responses: Mutex<VecDeque<Result<MessagePage, String>>>,
    requests: Mutex<Vec<PageRequest>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedAdapter {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Hold every response until `gate` is notified
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn respond(self, page: MessagePage) -> Self {
        self.responses.lock().unwrap().push_back(Ok(page));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ConversationAdapter for ScriptedAdapter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn list_messages(&self, request: PageRequest) -> Result<MessagePage> {
        self.requests.lock().unwrap().push(request);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted response left for '{}'", self.key)),
        }
    }
}

pub fn msg(id: &str) -> UnifiedMessage {
    UnifiedMessage::new(id).with_field("content", format!("content of {}", id))
}

pub fn page(ids: &[&str], next_cursor: Option<&str>, has_more: bool) -> MessagePage {
    MessagePage {
        items: ids.iter().map(|id| msg(id)).collect(),
        next_cursor: next_cursor.map(Cursor::from),
        has_more,
    }
}

pub fn ids(messages: &[UnifiedMessage]) -> Vec<String> {
    messages.iter().map(|m| m.id.clone()).collect()
}
