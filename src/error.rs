use thiserror::Error;

/// Errors surfaced by the conversation engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    /// The adapter failed to return a page; the full error chain is kept as text
    #[error("failed to fetch messages for conversation '{key}': {message}")]
    FetchFailed { key: String, message: String },

    #[error("invalid conversation options: {0}")]
    InvalidOptions(String),
}

impl ConversationError {
    pub fn fetch_failed(key: &str, source: &anyhow::Error) -> Self {
        Self::FetchFailed {
            key: key.to_string(),
            message: format!("{:#}", source),
        }
    }
}

pub type ConversationResult<T> = Result<T, ConversationError>;
