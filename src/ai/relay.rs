use super::{AnalysisRequest, ChatError, ChatResult, CompletionBackend, CompletionRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

const CHAT_PATH: &str = "chat";
const ANALYZE_PATH: &str = "analyze-ticket";
const CHAT_FALLBACK_ERROR: &str = "Failed to get response";
const ANALYZE_FALLBACK_ERROR: &str = "Failed to analyze ticket";

/// HTTP client for the relay that forwards requests to the model provider
pub struct RelayBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

#[derive(Deserialize)]
struct AnalysisReply {
    analysis: String,
}

impl RelayBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> ChatResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B, fallback: &str) -> ChatResult<R>
    where
        B: serde::Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = parse_error_message(&text, fallback);
            error!(%url, status = status.as_u16(), %message, "relay returned an error");
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|err| ChatError::MalformedResponse(err.to_string()))
    }
}

#[async_trait]
impl CompletionBackend for RelayBackend {
    async fn complete(&self, request: &CompletionRequest) -> ChatResult<String> {
        debug!(
            messages = request.messages.len(),
            has_image = request.ticket_image.is_some(),
            "sending chat request"
        );
        let reply: ChatReply = self.post(CHAT_PATH, request, CHAT_FALLBACK_ERROR).await?;
        Ok(reply.content)
    }

    async fn analyze(&self, request: &AnalysisRequest) -> ChatResult<String> {
        debug!("sending ticket analysis request");
        let reply: AnalysisReply = self
            .post(ANALYZE_PATH, request, ANALYZE_FALLBACK_ERROR)
            .await?;
        Ok(reply.analysis)
    }
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{message}`, `{error: {message}}` and `{error: "..."}`; anything
/// else yields `fallback`.
pub fn parse_error_message(body: &str, fallback: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return fallback.to_string();
    };

    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return message.to_string();
    }

    match value.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(err) => err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string()),
        None => fallback.to_string(),
    }
}
