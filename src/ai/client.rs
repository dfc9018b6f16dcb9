use super::{AnalysisRequest, ChatResult, CompletionBackend, CompletionRequest};
use crate::rate_limit::{RateDecision, RateLimiter, Remaining};
use crate::types::ChatMessage;
use std::sync::Arc;
use tracing::{debug, info};

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant specializing in helping users contest parking tickets. \
Provide information about parking laws, the contestation process, and help craft effective appeal letters. \
Ask clarifying questions to understand the specific situation. \
Avoid giving legal advice, but suggest common defenses backed by facts. \
Be empathetic, clear, and detail-oriented.";

/// Appended to the outbound messages when a ticket photo rides along.
pub const UPLOAD_NOTE: &str = "I've uploaded a photo of my parking ticket for analysis.";

pub const DEFAULT_ANALYSIS_PROMPT: &str = "Analyze this parking ticket and extract all relevant information including: \
ticket number, date/time issued, location, violation type, fine amount, and any other details that might help contest it.";

pub fn rate_limit_message(quota: u32) -> String {
    format!("You've reached the limit of {quota} messages per hour. Please try again later.")
}

fn preview(content: &str) -> String {
    content.chars().take(50).collect()
}

/// Sends conversation turns and ticket photos to the relay, subject to the
/// hourly quota.
#[derive(Clone)]
pub struct ChatClient {
    backend: Arc<dyn CompletionBackend>,
    limiter: Arc<RateLimiter>,
}

impl ChatClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, limiter: Arc<RateLimiter>) -> Self {
        Self { backend, limiter }
    }

    pub fn remaining(&self) -> Remaining {
        self.limiter.remaining()
    }

    /// Returns `Some(canned reply)` when the quota is used up.
    fn check_quota(&self) -> ChatResult<Option<String>> {
        match self.limiter.check()? {
            RateDecision::Allowed { remaining } => {
                debug!(remaining, "request permitted");
                Ok(None)
            }
            RateDecision::Denied { minutes_remaining } => {
                info!(minutes_remaining, "request blocked by rate limit");
                Ok(Some(rate_limit_message(self.limiter.quota())))
            }
        }
    }

    /// Build the outbound request: system prompt, then `history`, then the
    /// upload note when an attachment is present.
    pub fn build_request(history: &[ChatMessage], attachment: Option<&str>) -> CompletionRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        messages.extend(history.iter().cloned());
        if attachment.is_some() {
            messages.push(ChatMessage::user(UPLOAD_NOTE));
        }
        CompletionRequest {
            messages,
            ticket_image: attachment.map(str::to_string),
        }
    }

    /// One attempt, no retry. `history` is expected to be already trimmed.
    pub async fn send(
        &self,
        history: &[ChatMessage],
        attachment: Option<&str>,
    ) -> ChatResult<String> {
        if let Some(canned) = self.check_quota()? {
            return Ok(canned);
        }

        let request = Self::build_request(history, attachment);
        debug!(
            previews = ?request
                .messages
                .iter()
                .map(|m| preview(&m.content))
                .collect::<Vec<_>>(),
            "sending messages"
        );
        let content = self.backend.complete(&request).await?;
        debug!(preview = %preview(&content), "received reply");
        Ok(content)
    }

    pub async fn analyze_ticket(&self, image: &str, prompt: Option<&str>) -> ChatResult<String> {
        if let Some(canned) = self.check_quota()? {
            return Ok(canned);
        }

        let request = AnalysisRequest {
            image_base64: image.to_string(),
            prompt: prompt.unwrap_or(DEFAULT_ANALYSIS_PROMPT).to_string(),
        };
        self.backend.analyze(&request).await
    }
}
