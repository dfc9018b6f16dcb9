//! AI module for the parking ticket assistant
//!
//! All model traffic goes through a server-side relay that holds the provider
//! credential; this crate never talks to a model provider directly.
//!
//! # Architecture
//!
//! - `client` - `ChatClient`: rate limiting, system prompt, upload note
//! - `relay` - `RelayBackend`: HTTP transport to the relay's `/chat` and
//!   `/analyze-ticket` functions
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use parking_assistant::ai::{ChatClient, RelayBackend};
//! use parking_assistant::rate_limit::RateLimiter;
//! use parking_assistant::storage::FileStore;
//! use parking_assistant::types::ChatMessage;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let backend = RelayBackend::new("http://localhost:54321/functions/v1", None, None)?;
//! let limiter = RateLimiter::new(Arc::new(FileStore::default_location()));
//! let client = ChatClient::new(Arc::new(backend), Arc::new(limiter));
//! let _reply = client.send(&[ChatMessage::user("I got a ticket")], None).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod relay;

use crate::storage::StorageError;
use crate::types::ChatMessage;
use async_trait::async_trait;
use serde::Serialize;

pub use client::{
    ChatClient, DEFAULT_ANALYSIS_PROMPT, SYSTEM_PROMPT, UPLOAD_NOTE, rate_limit_message,
};
pub use relay::{RelayBackend, parse_error_message};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Failed to reach relay: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Relay error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response from relay: {0}")]
    MalformedResponse(String),

    #[error("Failed to persist rate limit: {0}")]
    Storage(#[from] StorageError),
}

impl ChatError {
    /// Whether the failure came from the remote call rather than local state.
    pub fn is_transport(&self) -> bool {
        !matches!(self, ChatError::Storage(_))
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Body of a `/chat` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(rename = "ticketImage", skip_serializing_if = "Option::is_none")]
    pub ticket_image: Option<String>,
}

/// Body of an `/analyze-ticket` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    #[serde(rename = "imageBase64")]
    pub image_base64: String,
    pub prompt: String,
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> ChatResult<String>;

    async fn analyze(&self, request: &AnalysisRequest) -> ChatResult<String>;
}
