use async_trait::async_trait;
use anyhow::Result;
use serde::Deserialize;
use thiserror::Error;

/// One request to the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u16,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the candidate texts, best first.
    async fn complete(&self, request: &CompletionRequest) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

#[derive(Error, Debug)]
pub enum MessagingError {
    /// The service answered but refused the call, e.g. `channel_not_found`.
    #[error("messaging service error: {code}")]
    Api { code: String },
    #[error("messaging transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("messaging error: {0}")]
    Unexpected(String),
}

impl MessagingError {
    pub fn api(code: impl Into<String>) -> Self {
        MessagingError::Api { code: code.into() }
    }
}

#[async_trait]
pub trait MessagingService: Send + Sync {
    /// Every channel visible to the caller.
    async fn list_channels(&self) -> Result<Vec<Channel>, MessagingError>;

    /// Posts `text` to the channel and returns the message timestamp.
    async fn post_message(&self, channel_id: &str, text: &str) -> Result<String, MessagingError>;
}

/// A pre-bound delivery URL; the destination channel is fixed by the URL itself.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), MessagingError>;
}
